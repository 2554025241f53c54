use std::ops::Range;
use tracing::debug;

use super::{page_count, parse_page_input, PageState, Paginator};

/// Pagination over data whose length is known: the filtered row count.
///
/// The page index never points past the last page. Whenever the length
/// shrinks the index is clamped before any window is produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientPaginator {
    state: PageState,
    length: usize,
}

impl ClientPaginator {
    pub fn new(page_size: usize, page_size_options: Vec<usize>) -> Self {
        Self {
            state: PageState::new(page_size, page_size_options),
            length: 0,
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Update the known length and clamp the page index into range
    pub fn set_length(&mut self, length: usize) {
        self.length = length;
        self.clamp();
    }

    fn last_index(&self) -> usize {
        page_count(self.length, self.state.page_size()).saturating_sub(1)
    }

    fn clamp(&mut self) {
        let last = self.last_index();
        if self.state.page_index > last {
            debug!(
                target: "pagination",
                "Clamping page {} to {} ({} rows)",
                self.state.page_index,
                last,
                self.length
            );
            self.state.page_index = last;
        }
    }

    /// Row range of the current page within the known length
    pub fn window_range(&self) -> Range<usize> {
        let start = self.state.offset().min(self.length);
        let end = (start + self.state.page_size()).min(self.length);
        start..end
    }

    /// The slice of `data` on the current page. `data.len()` becomes the
    /// known length.
    pub fn current_window<'a, T>(&mut self, data: &'a [T]) -> &'a [T] {
        self.set_length(data.len());
        &data[self.window_range()]
    }
}

impl Paginator for ClientPaginator {
    type Effect = ();

    fn state(&self) -> &PageState {
        &self.state
    }

    fn paginate(&mut self, target_page: usize) {
        self.state.page_index = target_page;
        self.clamp();
    }

    fn change_page_size(&mut self, new_size: usize) {
        self.state.page_index = 0;
        self.state.set_page_size(new_size);
        debug!(target: "pagination", "Page size now {}", self.state.page_size());
    }

    fn go_to_page(&mut self, input: &str) {
        let total = page_count(self.length, self.state.page_size());
        let page = parse_page_input(input, self.state.page_index, total);
        self.paginate(page);
    }

    fn total_pages(&self) -> Option<usize> {
        Some(page_count(self.length, self.state.page_size()))
    }

    fn has_next(&self) -> bool {
        self.state.page_index + 1 < page_count(self.length, self.state.page_size())
    }

    fn range_label(&self) -> String {
        let range = self.window_range();
        if range.is_empty() {
            return format!("0 of {}", self.length);
        }
        format!("{}–{} of {}", range.start + 1, range.end, self.length)
    }
}
