use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{page_count, parse_page_input, PageState, Paginator};

/// A page the remote provider is asked for. `seq` identifies the request
/// so a late answer to an older request can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub seq: u64,
    pub page_index: usize,
    pub page_size: usize,
}

/// What the controller made of a provider answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageResponse {
    /// Answer to a superseded request; ignore its rows
    Stale,
    Accepted,
    /// The requested page turned out to lie past the end. The index was
    /// clamped to the last page and that page must be fetched.
    Refetch(PageRequest),
}

/// Pagination against a provider whose total length is not known up front.
///
/// The total is learned from the first short page (fewer rows than the
/// page size). Until then the controller only claims pages the provider
/// has confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPaginator {
    state: PageState,
    known_length: Option<usize>,
    /// Highest page index confirmed to hold rows, plus one
    known_pages: usize,
    /// Whether the last answer for the current page was a full page
    last_page_full: Option<bool>,
    seq: u64,
    in_flight: Option<PageRequest>,
}

impl ServerPaginator {
    pub fn new(page_size: usize, page_size_options: Vec<usize>) -> Self {
        Self {
            state: PageState::new(page_size, page_size_options),
            known_length: None,
            known_pages: 1,
            last_page_full: None,
            seq: 0,
            in_flight: None,
        }
    }

    pub fn known_length(&self) -> Option<usize> {
        self.known_length
    }

    pub fn known_pages(&self) -> usize {
        self.known_pages
    }

    pub fn is_length_known(&self) -> bool {
        self.known_length.is_some()
    }

    pub fn in_flight(&self) -> Option<PageRequest> {
        self.in_flight
    }

    /// Issue a request for the current page, superseding any outstanding one
    pub fn request(&mut self) -> PageRequest {
        self.seq += 1;
        let request = PageRequest {
            seq: self.seq,
            page_index: self.state.page_index,
            page_size: self.state.page_size(),
        };
        if let Some(previous) = self.in_flight.replace(request) {
            debug!(target: "pagination", "Request {} superseded by {}", previous.seq, request.seq);
        }
        request
    }

    /// Forget the discovered length, go back to the first page and request it.
    /// Used when the page boundaries shift (page size, filters, sort).
    pub fn reset_discovery(&mut self) -> PageRequest {
        self.state.page_index = 0;
        self.known_length = None;
        self.known_pages = 1;
        self.last_page_full = None;
        self.request()
    }

    /// Record how many rows the provider returned for request `seq`
    pub fn receive(&mut self, seq: u64, returned: usize) -> PageResponse {
        match self.in_flight {
            Some(request) if request.seq == seq => {}
            _ => {
                debug!(target: "pagination", "Discarding stale response {}", seq);
                return PageResponse::Stale;
            }
        }
        self.in_flight = None;

        let page_size = self.state.page_size();
        let page_index = self.state.page_index;
        let full = returned >= page_size;
        self.last_page_full = Some(full);

        if returned > 0 {
            self.known_pages = self.known_pages.max(page_index + 1);
        }

        if !full && self.known_length.is_none() {
            let length = page_index * page_size + returned;
            info!(
                target: "pagination",
                "Short page {} ({} rows), total length is {}",
                page_index,
                returned,
                length
            );
            self.known_length = Some(length);

            let total = page_count(length, page_size);
            if returned == 0 && page_index > 0 && page_index >= total {
                self.state.page_index = total.saturating_sub(1);
                self.last_page_full = None;
                return PageResponse::Refetch(self.request());
            }
        }

        PageResponse::Accepted
    }

    /// The provider failed for request `seq`. Nothing is learned about the
    /// length; the view shows an empty page.
    pub fn receive_failure(&mut self, seq: u64) -> PageResponse {
        match self.in_flight {
            Some(request) if request.seq == seq => {
                self.in_flight = None;
                self.last_page_full = None;
                PageResponse::Accepted
            }
            _ => PageResponse::Stale,
        }
    }

    /// True only when the total is known and a later page exists
    pub fn has_last(&self) -> bool {
        match self.total_pages() {
            Some(total) => self.state.page_index + 1 < total,
            None => false,
        }
    }

    /// Pages that may be navigated to right now, by buttons or typed input
    fn reachable_pages(&self) -> usize {
        match self.total_pages() {
            Some(total) => total,
            // One past the highest confirmed page is reachable once the
            // current page came back full
            None if self.last_page_full == Some(true) => {
                self.known_pages.max(self.state.page_index + 2)
            }
            None => self.known_pages.max(self.state.page_index + 1),
        }
    }
}

impl Default for ServerPaginator {
    fn default() -> Self {
        let state = PageState::default();
        Self::new(state.page_size(), Vec::new())
    }
}

impl Paginator for ServerPaginator {
    type Effect = PageRequest;

    fn state(&self) -> &PageState {
        &self.state
    }

    fn paginate(&mut self, target_page: usize) -> PageRequest {
        let last = self.reachable_pages().saturating_sub(1);
        let target = target_page.min(last);
        if target != target_page {
            debug!(target: "pagination", "Page {} not reachable, using {}", target_page, target);
        }
        if target != self.state.page_index {
            self.last_page_full = None;
        }
        self.state.page_index = target;
        self.request()
    }

    fn change_page_size(&mut self, new_size: usize) -> PageRequest {
        self.state.set_page_size(new_size);
        debug!(target: "pagination", "Page size now {}, length unknown again", self.state.page_size());
        self.reset_discovery()
    }

    fn go_to_page(&mut self, input: &str) -> PageRequest {
        let max = self.reachable_pages();
        let page = parse_page_input(input, self.state.page_index, max);
        self.paginate(page)
    }

    fn total_pages(&self) -> Option<usize> {
        self.known_length
            .map(|length| page_count(length, self.state.page_size()))
    }

    fn has_next(&self) -> bool {
        match self.total_pages() {
            Some(total) => self.state.page_index + 1 < total,
            None => self.last_page_full == Some(true),
        }
    }

    fn range_label(&self) -> String {
        let page_size = self.state.page_size();
        let start = self.state.offset() + 1;
        match self.known_length {
            None => format!("{}–{} of many", start, self.state.offset() + page_size),
            Some(0) => "0 of 0".to_string(),
            Some(total) => {
                let end = (self.state.offset() + page_size).min(total);
                format!("{}–{} of {}", start, end, total)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Walk forward with full pages up to `page`
    fn walk_to(paginator: &mut ServerPaginator, page: usize) -> PageRequest {
        let mut request = paginator.request();
        for _ in 0..page {
            assert_eq!(paginator.receive(request.seq, paginator.page_size()), PageResponse::Accepted);
            request = paginator.next_page().expect("full page allows next");
        }
        request
    }

    #[test]
    fn test_unknown_length_until_short_page() {
        let mut paginator = ServerPaginator::new(10, vec![]);
        let request = paginator.request();
        assert!(!paginator.has_next());
        assert_eq!(paginator.range_label(), "1–10 of many");

        paginator.receive(request.seq, 10);
        assert!(paginator.has_next());
        assert_eq!(paginator.total_pages(), None);
        assert!(!paginator.has_last());
    }

    #[test]
    fn test_short_page_fixes_the_length() {
        let mut paginator = ServerPaginator::new(10, vec![]);
        let request = walk_to(&mut paginator, 3);
        assert_eq!(request.page_index, 3);

        assert_eq!(paginator.receive(request.seq, 4), PageResponse::Accepted);
        assert_eq!(paginator.known_length(), Some(34));
        assert_eq!(paginator.total_pages(), Some(4));
        assert!(!paginator.has_next());
        assert_eq!(paginator.range_label(), "31–34 of 34");

        // later short pages do not move the total
        let request = paginator.paginate(1);
        paginator.receive(request.seq, 3);
        assert_eq!(paginator.total_pages(), Some(4));
        assert!(paginator.has_last());
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut paginator = ServerPaginator::new(10, vec![]);
        let first = paginator.request();
        let second = paginator.request();
        assert_eq!(paginator.receive(first.seq, 3), PageResponse::Stale);
        assert_eq!(paginator.known_length(), None);
        assert_eq!(paginator.receive(second.seq, 10), PageResponse::Accepted);
    }

    #[test]
    fn test_empty_page_past_the_end_refetches_last_page() {
        let mut paginator = ServerPaginator::new(10, vec![]);
        let request = walk_to(&mut paginator, 2);
        match paginator.receive(request.seq, 0) {
            PageResponse::Refetch(refetch) => {
                assert_eq!(refetch.page_index, 1);
                assert_eq!(paginator.total_pages(), Some(2));
            }
            other => panic!("expected refetch, got {:?}", other),
        }
    }

    #[test]
    fn test_page_size_change_forgets_length() {
        let mut paginator = ServerPaginator::new(10, vec![10, 20]);
        let request = paginator.request();
        paginator.receive(request.seq, 4);
        assert_eq!(paginator.known_length(), Some(4));

        let request = paginator.change_page_size(20);
        assert_eq!(request.page_index, 0);
        assert_eq!(request.page_size, 20);
        assert_eq!(paginator.known_length(), None);
        assert_eq!(paginator.known_pages(), 1);
    }

    #[test]
    fn test_go_to_page_limited_to_reachable_pages() {
        let mut paginator = ServerPaginator::new(10, vec![]);
        walk_to(&mut paginator, 2);
        // pages 1 and 2 confirmed, page 3 requested but not answered
        let request = paginator.go_to_page("9");
        assert_eq!(request.page_index, 2);
        assert_eq!(paginator.go_to_page("oops").page_index, 2);

        let request = paginator.go_to_page("1");
        assert_eq!(request.page_index, 0);
        assert_eq!(paginator.go_to_page("9").page_index, 1);
    }

    #[test]
    fn test_go_to_page_agrees_with_next_page() {
        let mut paginator = ServerPaginator::new(10, vec![]);
        let request = paginator.request();
        paginator.receive(request.seq, 10);

        // a full first page makes page 2 reachable by either route
        assert_eq!(paginator.go_to_page("2").page_index, 1);
        let mut other = ServerPaginator::new(10, vec![]);
        let request = other.request();
        other.receive(request.seq, 10);
        assert_eq!(other.next_page().map(|r| r.page_index), Some(1));

        // nothing past that until page 2 answers
        assert_eq!(paginator.go_to_page("3").page_index, 1);
        assert_eq!(paginator.go_to_page("x").page_index, 1);
    }

    #[test]
    fn test_failure_does_not_learn_length() {
        let mut paginator = ServerPaginator::new(10, vec![]);
        let request = paginator.request();
        assert_eq!(paginator.receive_failure(request.seq), PageResponse::Accepted);
        assert_eq!(paginator.known_length(), None);
        assert!(!paginator.has_next());
    }
}
