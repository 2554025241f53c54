use anyhow::Result;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::actions::{ActionResult, ActionSet, TableAction, TableActionKind};
use crate::config::GridConfig;
use crate::data::column_schema::{Column, ColumnEdit, ColumnSet};
use crate::data::data_provider::{PageQuery, RemoteDataProvider};
use crate::data::data_view::{BoxedColumnEditor, ACTIONS_COLUMN, ROW_NUMBER_COLUMN, SELECT_COLUMN};
use crate::data::filter_spec::{FilterKind, FilterState, FilterValue};
use crate::data::record::Record;
use crate::data::sort_compare::{SortDirection, SortState};
use crate::debouncer::Debouncer;
use crate::pagination::{PageRequest, PageResponse, Paginator, ServerPaginator};
use crate::selection::{SelectAllState, SelectionTracker};
use crate::state::{EventDispatcher, IdAllocator, ViewEvent, ViewSubscriber};

/// A view whose rows live behind a [`RemoteDataProvider`].
///
/// Navigation and filter changes only issue a [`PageRequest`]; the rows
/// arrive through [`ServerView::load`], or through
/// [`ServerView::begin_fetch`] and [`ServerView::apply_response`] when the
/// host drives the transport itself. Only the answer to the latest request
/// is applied.
pub struct ServerView<R: Record, P> {
    provider: P,
    /// Rows of the current page as the provider returned them
    rows: Vec<R>,
    failed: bool,

    columns: ColumnSet<R>,
    filters: FilterState,
    sort: SortState,
    paginator: ServerPaginator,
    selection: SelectionTracker<R>,
    search_input: Debouncer<String>,

    actions: ActionSet<R>,
    column_editor: Option<BoxedColumnEditor<R>>,

    config: GridConfig,
    search_bar_id: String,
    events: EventDispatcher,
}

impl<R, P> ServerView<R, P>
where
    R: Record + Send + 'static,
    P: RemoteDataProvider<R>,
{
    /// Create the view and issue the request for the first page
    pub fn new(provider: P, columns: Vec<Column<R>>, config: GridConfig) -> Result<Self> {
        let mut ids = IdAllocator::search_bars();
        Self::with_id_allocator(provider, columns, config, &mut ids)
    }

    pub fn with_id_allocator(
        provider: P,
        columns: Vec<Column<R>>,
        config: GridConfig,
        ids: &mut IdAllocator,
    ) -> Result<Self> {
        let columns = ColumnSet::new(columns)?;
        let mut paginator = ServerPaginator::new(
            config.pagination.page_size,
            config.pagination.page_size_options.clone(),
        );
        paginator.request();

        let sort = config
            .initial_sort
            .as_ref()
            .map(|s| s.to_sort_state())
            .unwrap_or_default();

        let mut actions = ActionSet::new();
        if config.search.enabled || columns.has_filters() {
            actions.add_table_action_once(TableAction::reset_filters());
        }
        if config.allows_column_edits() {
            actions.add_table_action_once(TableAction::modify_columns());
        }

        let view = Self {
            provider,
            rows: Vec::new(),
            failed: false,
            columns,
            filters: FilterState::new(),
            sort,
            paginator,
            selection: SelectionTracker::new(),
            search_input: Debouncer::for_search(
                config.search.instant_search,
                config.search.debounce_delay_ms,
            ),
            actions,
            column_editor: None,
            search_bar_id: ids.next_id(),
            config,
            events: EventDispatcher::new(),
        };
        info!(target: "view", "Created server view {}", view.search_bar_id);
        Ok(view)
    }

    pub fn with_actions(mut self, actions: ActionSet<R>) -> Self {
        for action in actions.table {
            self.actions.add_table_action_once(action);
        }
        self.actions.rows.extend(actions.rows);
        self.actions.selected.extend(actions.selected);
        self
    }

    pub fn with_column_editor(mut self, editor: BoxedColumnEditor<R>) -> Self {
        self.column_editor = Some(editor);
        self
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn ViewSubscriber>) {
        self.events.subscribe(subscriber);
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    // ---- fetching ----

    /// The outstanding request and the query to send for it
    pub fn begin_fetch(&self) -> Option<(PageRequest, PageQuery)> {
        let request = self.paginator.in_flight()?;
        Some((request, PageQuery::new(request, &self.sort, &self.filters)))
    }

    /// Apply the provider's answer to request `seq`.
    ///
    /// A failure shows an empty page and sets the failed flag. Answers to
    /// superseded requests are dropped.
    pub fn apply_response(&mut self, seq: u64, result: Result<Vec<R>>) -> PageResponse {
        match result {
            Ok(rows) => {
                let response = self.paginator.receive(seq, rows.len());
                match response {
                    PageResponse::Stale => return response,
                    PageResponse::Accepted => self.rows = rows,
                    PageResponse::Refetch(request) => {
                        debug!(
                            target: "pagination",
                            "Page past the end, refetching page {}",
                            request.page_index
                        );
                        self.rows = Vec::new();
                        self.events.dispatch(ViewEvent::PageChanged {
                            page_index: request.page_index,
                            page_size: request.page_size,
                        });
                    }
                }
                self.failed = false;
                self.emit_window_changed();
                response
            }
            Err(err) => {
                let response = self.paginator.receive_failure(seq);
                if response == PageResponse::Stale {
                    debug!(target: "pagination", "Ignoring failure of stale request {}", seq);
                    return response;
                }
                warn!(target: "view", "Page {} failed to load: {:#}", self.page_index(), err);
                self.rows = Vec::new();
                self.failed = true;
                self.events.dispatch(ViewEvent::FetchFailed {
                    page_index: self.page_index(),
                    message: format!("{:#}", err),
                });
                self.emit_window_changed();
                response
            }
        }
    }

    /// Fetch until no request is outstanding
    pub async fn load(&mut self) {
        while let Some((request, query)) = self.begin_fetch() {
            let result = self.provider.fetch_page(&query).await;
            if let PageResponse::Stale = self.apply_response(request.seq, result) {
                break;
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.paginator.in_flight().is_some()
    }

    /// Whether the last request failed
    pub fn failed(&self) -> bool {
        self.failed
    }

    // ---- filtering ----

    pub fn on_search_input(&mut self, text: impl Into<String>) {
        self.on_search_input_at(text, Instant::now());
    }

    pub fn on_search_input_at(&mut self, text: impl Into<String>, now: Instant) {
        if let Some(text) = self.search_input.on_value_change_at(text.into(), now) {
            self.set_global_filter(text);
        }
    }

    pub fn poll_search(&mut self) -> bool {
        self.poll_search_at(Instant::now())
    }

    pub fn poll_search_at(&mut self, now: Instant) -> bool {
        match self.search_input.poll_at(now) {
            Some(text) => {
                self.set_global_filter(text);
                true
            }
            None => false,
        }
    }

    pub fn set_global_filter(&mut self, text: impl Into<String>) {
        self.filters.set_global_text(text);
        self.query_changed();
        self.emit_filter_changed();
    }

    pub fn set_column_filter(&mut self, field: impl Into<String>, value: FilterValue) {
        self.filters.set_column(field, value);
        self.query_changed();
        self.emit_filter_changed();
    }

    pub fn set_column_filter_json(&mut self, field: impl Into<String>, value: &Value) {
        self.filters.set_column_json(field, value);
        self.query_changed();
        self.emit_filter_changed();
    }

    pub fn clear_column_filter(&mut self, field: &str) {
        self.filters.clear_column(field);
        self.query_changed();
        self.emit_filter_changed();
    }

    pub fn reset_filters(&mut self) {
        info!(target: "filter", "Resetting all filters");
        self.search_input.clear();
        self.filters.clear();
        self.query_changed();
        self.emit_filter_changed();
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Explicit options of a select filter. A server view never sees the
    /// whole column, so options are not generated.
    pub fn filter_options(&self, field: &str) -> Option<&[Value]> {
        match &self.columns.get(field)?.filter.as_ref()?.kind {
            FilterKind::Select {
                options: Some(options),
                ..
            } => Some(options.as_slice()),
            _ => None,
        }
    }

    /// Filters and sort shift the page boundaries, so the length is
    /// discovered again from the first page
    fn query_changed(&mut self) {
        let request = self.paginator.reset_discovery();
        debug!(target: "pagination", "Query changed, requesting page 0 (seq {})", request.seq);
        self.emit_page_changed();
    }

    fn emit_filter_changed(&mut self) {
        let event = ViewEvent::FilterChanged {
            global_text: self.filters.global_text.clone(),
            active_columns: self.filters.columns().map(|(f, _)| f.to_string()).collect(),
            matched: self.paginator.known_length(),
        };
        self.events.dispatch(event);
    }

    // ---- sorting ----

    pub fn set_sort(&mut self, field: impl Into<String>, direction: SortDirection) {
        self.sort = SortState::new(field, direction);
        info!(target: "sort", "{}", self.sort.announcement());
        self.query_changed();
        self.events.dispatch(ViewEvent::SortChanged {
            sort: self.sort.clone(),
            announcement: self.sort.announcement(),
        });
    }

    /// Header click on a sortable column: asc -> desc -> none
    pub fn toggle_sort(&mut self, field: &str) {
        if !self.columns.get(field).is_some_and(|c| c.sortable) {
            warn!(target: "sort", "Field {} is not sortable", field);
            return;
        }
        let direction = if self.sort.active_field == field {
            self.sort.direction.cycle()
        } else {
            SortDirection::Asc
        };
        self.set_sort(field, direction);
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    // ---- pagination ----

    pub fn paginator(&self) -> &ServerPaginator {
        &self.paginator
    }

    pub fn page_index(&self) -> usize {
        self.paginator.page_index()
    }

    pub fn paginate(&mut self, page_index: usize) -> PageRequest {
        let request = self.paginator.paginate(page_index);
        self.emit_page_changed();
        request
    }

    pub fn next_page(&mut self) -> Option<PageRequest> {
        let request = self.paginator.next_page()?;
        self.emit_page_changed();
        Some(request)
    }

    pub fn previous_page(&mut self) -> Option<PageRequest> {
        let request = self.paginator.previous_page()?;
        self.emit_page_changed();
        Some(request)
    }

    pub fn first_page(&mut self) -> PageRequest {
        let request = self.paginator.first_page();
        self.emit_page_changed();
        request
    }

    /// Only possible once the total is known
    pub fn last_page(&mut self) -> Option<PageRequest> {
        if !self.paginator.has_last() {
            return None;
        }
        let request = self.paginator.last_page()?;
        self.emit_page_changed();
        Some(request)
    }

    pub fn go_to_page(&mut self, input: &str) -> PageRequest {
        let request = self.paginator.go_to_page(input);
        self.emit_page_changed();
        request
    }

    pub fn change_page_size(&mut self, page_size: usize) -> PageRequest {
        let request = self.paginator.change_page_size(page_size);
        self.emit_page_changed();
        request
    }

    pub fn range_label(&self) -> String {
        self.paginator.range_label()
    }

    pub fn page_size_options(&self) -> Vec<usize> {
        if self.config.pagination.hide_page_size {
            return Vec::new();
        }
        self.paginator.state().displayed_page_size_options()
    }

    pub fn page_rows(&self) -> &[R] {
        &self.rows
    }

    pub fn row_number(&self, index_on_page: usize) -> usize {
        self.paginator.state().row_number(index_on_page)
    }

    // ---- selection ----

    pub fn toggle_row(&mut self, index_on_page: usize, checked: bool) {
        let Some(row) = self.rows.get(index_on_page) else {
            warn!(target: "selection", "No row {} on page {}", index_on_page, self.page_index());
            return;
        };
        let page = self.paginator.page_index();
        self.selection.toggle(row, page, checked);
        self.emit_selection_changed();
    }

    pub fn is_row_selected(&self, index_on_page: usize) -> bool {
        self.rows
            .get(index_on_page)
            .is_some_and(|row| self.selection.is_selected(row, self.page_index()))
    }

    pub fn toggle_all_on_page(&mut self, checked: bool) {
        let page = self.paginator.page_index();
        self.selection.toggle_all_on_page(&self.rows, page, checked);
        self.emit_selection_changed();
    }

    pub fn select_all_state(&self) -> SelectAllState {
        self.selection.select_all_state(&self.rows, self.page_index())
    }

    pub fn selected_rows(&self) -> Vec<R> {
        self.selection.get_all_selected()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear_all();
        self.emit_selection_changed();
    }

    // ---- columns ----

    pub fn columns(&self) -> &ColumnSet<R> {
        &self.columns
    }

    pub fn display_columns(&self) -> Vec<String> {
        let mut display = Vec::new();
        if self.config.rows.multi_row_selection {
            display.push(SELECT_COLUMN.to_string());
        }
        if self.config.rows.show_row_numbers {
            display.push(ROW_NUMBER_COLUMN.to_string());
        }
        display.extend(self.columns.visible_fields());
        if self.actions.has_row_actions() {
            display.push(ACTIONS_COLUMN.to_string());
        }
        display
    }

    pub fn replace_columns(&mut self, columns: Vec<Column<R>>) -> Result<()> {
        self.columns.replace(columns)?;
        self.events.dispatch(ViewEvent::ColumnsChanged {
            visible: self.columns.visible_fields(),
        });
        Ok(())
    }

    pub fn set_column_visible(&mut self, field: &str, visible: bool) -> Result<()> {
        let columns = self.columns.with_visibility(field, visible);
        self.replace_columns(columns)
    }

    pub fn reset_columns(&mut self) -> Result<()> {
        let defaults = self.columns.defaults().to_vec();
        self.replace_columns(defaults)
    }

    fn edit_with_installed_editor(&mut self) -> Result<bool> {
        let Some(mut editor) = self.column_editor.take() else {
            warn!(target: "columns", "No column editor installed");
            return Ok(false);
        };
        let result = match editor.edit(self.columns.columns(), self.columns.defaults()) {
            ColumnEdit::Apply(columns) => self.replace_columns(columns).map(|_| true),
            ColumnEdit::Cancel => Ok(false),
        };
        self.column_editor = Some(editor);
        result
    }

    // ---- actions ----

    pub fn actions(&self) -> &ActionSet<R> {
        &self.actions
    }

    pub fn run_table_action(&mut self, label: &str) -> Result<ActionResult> {
        let Some(action) = self.actions.table_action(label).cloned() else {
            return Ok(ActionResult::NotFound);
        };
        if action.is_disabled() {
            return Ok(ActionResult::Disabled);
        }
        match &action.kind {
            TableActionKind::Custom(_) => Ok(action.invoke()),
            TableActionKind::ResetFilters => {
                self.reset_filters();
                Ok(ActionResult::Invoked)
            }
            TableActionKind::ModifyColumns => {
                self.edit_with_installed_editor()?;
                Ok(ActionResult::Invoked)
            }
        }
    }

    pub fn run_row_action(&self, label: &str, index_on_page: usize) -> ActionResult {
        match self.rows.get(index_on_page) {
            Some(row) => self.actions.invoke_row(label, row),
            None => ActionResult::NotFound,
        }
    }

    pub fn run_selected_action(&self, label: &str) -> ActionResult {
        let rows = self.selection.get_all_selected();
        self.actions.invoke_selected(label, &rows)
    }

    // ---- misc ----

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn search_bar_id(&self) -> &str {
        &self.search_bar_id
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    fn emit_page_changed(&mut self) {
        self.events.dispatch(ViewEvent::PageChanged {
            page_index: self.paginator.page_index(),
            page_size: self.paginator.page_size(),
        });
    }

    fn emit_window_changed(&mut self) {
        let event = ViewEvent::WindowChanged {
            rows: self.rows.len(),
            range_label: self.paginator.range_label(),
        };
        self.events.dispatch(event);
    }

    fn emit_selection_changed(&mut self) {
        let event = ViewEvent::SelectionChanged {
            page_index: self.paginator.page_index(),
            selected: self.selection.selected_count(),
        };
        self.events.dispatch(event);
    }
}
