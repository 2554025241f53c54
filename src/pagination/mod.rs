//! Pagination controllers
//!
//! Two controllers share the [`Paginator`] interface:
//! - [`ClientPaginator`] slices a dataset whose length is always known
//! - [`ServerPaginator`] asks a remote provider for pages and discovers
//!   the total length when a short page comes back

pub mod client;
pub mod server;

pub use client::ClientPaginator;
pub use server::{PageRequest, PageResponse, ServerPaginator};

use tracing::debug;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Page position and size shared by both controllers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    pub page_index: usize,
    page_size: usize,
    page_size_options: Vec<usize>,
}

impl PageState {
    pub fn new(page_size: usize, page_size_options: Vec<usize>) -> Self {
        let mut state = Self {
            page_index: 0,
            page_size: 0,
            page_size_options: page_size_options.into_iter().filter(|&o| o > 0).collect(),
        };
        state.set_page_size(page_size);
        state
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_size_options(&self) -> &[usize] {
        &self.page_size_options
    }

    /// A zero size falls back to the first option, or the default size
    pub fn set_page_size(&mut self, size: usize) {
        self.page_size = if size > 0 {
            size
        } else {
            self.page_size_options
                .first()
                .copied()
                .unwrap_or(DEFAULT_PAGE_SIZE)
        };
    }

    /// Options offered to the user: the configured ones plus the current
    /// size, ascending and without duplicates
    pub fn displayed_page_size_options(&self) -> Vec<usize> {
        let mut options = self.page_size_options.clone();
        options.push(self.page_size);
        options.sort_unstable();
        options.dedup();
        options
    }

    /// First row index of the current page
    pub fn offset(&self) -> usize {
        self.page_index * self.page_size
    }

    /// 1-based row number of a row on the current page
    pub fn row_number(&self, index_on_page: usize) -> usize {
        self.offset() + index_on_page + 1
    }
}

impl Default for PageState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, Vec::new())
    }
}

/// Number of pages needed for `length` rows
pub fn page_count(length: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        length.div_ceil(page_size)
    }
}

/// Turn "go to page" text (1-based) into a page index.
///
/// The leading integer is used, so "3.5" and "3rd" both mean page 3.
/// Numbers are clamped into `1..=max_pages`; text without a leading
/// number keeps the current page.
pub fn parse_page_input(input: &str, current: usize, max_pages: usize) -> usize {
    let trimmed = input.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let digits = &unsigned[..end];
    if digits.is_empty() {
        debug!(target: "pagination", "Ignoring page input '{}'", input);
        return current;
    }

    let max = max_pages.max(1);
    if negative {
        return 0;
    }
    match digits.parse::<usize>() {
        Ok(page) => page.clamp(1, max) - 1,
        // more digits than fit: past any last page
        Err(_) => max - 1,
    }
}

/// Shared interface of the pagination controllers.
///
/// `Effect` is what navigation produces: nothing for the client
/// controller, a page request for the server controller.
pub trait Paginator {
    type Effect;

    fn state(&self) -> &PageState;

    fn paginate(&mut self, target_page: usize) -> Self::Effect;

    fn change_page_size(&mut self, new_size: usize) -> Self::Effect;

    /// Navigate from 1-based user input
    fn go_to_page(&mut self, input: &str) -> Self::Effect;

    /// Total pages, when known
    fn total_pages(&self) -> Option<usize>;

    fn has_next(&self) -> bool;

    /// "1–10 of 34" style label
    fn range_label(&self) -> String;

    fn page_index(&self) -> usize {
        self.state().page_index
    }

    fn page_size(&self) -> usize {
        self.state().page_size()
    }

    fn has_previous(&self) -> bool {
        self.page_index() > 0
    }

    fn first_page(&mut self) -> Self::Effect {
        self.paginate(0)
    }

    fn next_page(&mut self) -> Option<Self::Effect> {
        if self.has_next() {
            let target = self.page_index() + 1;
            Some(self.paginate(target))
        } else {
            None
        }
    }

    fn previous_page(&mut self) -> Option<Self::Effect> {
        if self.has_previous() {
            let target = self.page_index() - 1;
            Some(self.paginate(target))
        } else {
            None
        }
    }

    fn last_page(&mut self) -> Option<Self::Effect> {
        let total = self.total_pages()?;
        Some(self.paginate(total.saturating_sub(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_page_size_falls_back() {
        assert_eq!(PageState::new(0, vec![15, 25]).page_size(), 15);
        assert_eq!(PageState::new(0, vec![]).page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_displayed_options_include_current_size() {
        let state = PageState::new(12, vec![25, 10, 15]);
        assert_eq!(state.displayed_page_size_options(), vec![10, 12, 15, 25]);
        let state = PageState::new(10, vec![10, 20]);
        assert_eq!(state.displayed_page_size_options(), vec![10, 20]);
    }

    #[test]
    fn test_page_input_parsing() {
        assert_eq!(parse_page_input("3", 0, 5), 2);
        assert_eq!(parse_page_input(" 9 ", 0, 5), 4);
        assert_eq!(parse_page_input("0", 2, 5), 0);
        assert_eq!(parse_page_input("-4", 2, 5), 0);
        assert_eq!(parse_page_input("abc", 2, 5), 2);
        assert_eq!(parse_page_input("", 1, 5), 1);
    }

    #[test]
    fn test_page_input_uses_leading_integer() {
        assert_eq!(parse_page_input("3.5", 0, 5), 2);
        assert_eq!(parse_page_input("2nd", 4, 5), 1);
        assert_eq!(parse_page_input("+4", 0, 5), 3);
        assert_eq!(parse_page_input("-", 3, 5), 3);
        assert_eq!(parse_page_input(".5", 3, 5), 3);
        assert_eq!(parse_page_input("99999999999999999999999", 0, 5), 4);
    }

    #[test]
    fn test_row_numbers() {
        let mut state = PageState::new(10, vec![]);
        state.page_index = 2;
        assert_eq!(state.row_number(0), 21);
        assert_eq!(page_count(25, 10), 3);
        assert_eq!(page_count(0, 10), 0);
    }
}
