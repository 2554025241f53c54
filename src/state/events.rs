//! View events

use serde_json::Value;

use crate::data::sort_compare::SortState;

/// Events a view emits after a state change has been applied
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// Global text or a column filter changed. `matched` is the filtered
    /// row count, `None` for a server view that has yet to learn it.
    FilterChanged {
        global_text: String,
        active_columns: Vec<String>,
        matched: Option<usize>,
    },

    /// Sort changed. `announcement` is the text for a live announcer.
    SortChanged {
        sort: SortState,
        announcement: String,
    },

    /// Current page or page size changed
    PageChanged { page_index: usize, page_size: usize },

    /// The visible window was recomputed
    WindowChanged { rows: usize, range_label: String },

    SelectionChanged { page_index: usize, selected: usize },

    /// The column list was replaced
    ColumnsChanged { visible: Vec<String> },

    /// Select filter options were regenerated from the data
    FilterOptionsChanged { field: String, options: Vec<Value> },

    /// A remote page request failed; the view shows an empty page
    FetchFailed { page_index: usize, message: String },
}

impl ViewEvent {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            ViewEvent::FilterChanged { .. } => "filter_changed",
            ViewEvent::SortChanged { .. } => "sort_changed",
            ViewEvent::PageChanged { .. } => "page_changed",
            ViewEvent::WindowChanged { .. } => "window_changed",
            ViewEvent::SelectionChanged { .. } => "selection_changed",
            ViewEvent::ColumnsChanged { .. } => "columns_changed",
            ViewEvent::FilterOptionsChanged { .. } => "filter_options_changed",
            ViewEvent::FetchFailed { .. } => "fetch_failed",
        }
    }
}
