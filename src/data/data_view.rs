use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::actions::{ActionResult, ActionSet, TableAction, TableActionKind};
use crate::config::GridConfig;
use crate::data::column_schema::{
    classify_by_value, flatten, Column, ColumnEdit, ColumnEditor, ColumnSet,
};
use crate::data::compound_fields::CompoundFields;
use crate::data::filter_evaluator::FilterEvaluator;
use crate::data::filter_spec::{FilterKind, FilterState, FilterValue};
use crate::data::record::{order_values, values_loosely_equal, Record};
use crate::data::sort_compare::{sort_indices, SortDirection, SortExtractor, SortState};
use crate::debouncer::Debouncer;
use crate::pagination::{ClientPaginator, Paginator};
use crate::selection::{SelectAllState, SelectionTracker};
use crate::state::{EventDispatcher, IdAllocator, ViewEvent, ViewSubscriber};

pub const SELECT_COLUMN: &str = "select";
pub const ROW_NUMBER_COLUMN: &str = "#";
pub const ACTIONS_COLUMN: &str = "actions";

pub type BoxedColumnEditor<R> = Box<dyn ColumnEditor<R> + Send>;

/// A view over a set of rows that filters, sorts, paginates and tracks
/// selection without modifying the underlying data.
///
/// Every state change re-runs filter, sort and pagination in full. The
/// page index is clamped whenever the filtered length shrinks, so the
/// window never points past the last page.
pub struct DataView<R: Record> {
    /// The underlying immutable rows
    source: Arc<Vec<R>>,

    /// Row indices that survive the filters, in sorted order
    visible_rows: Vec<usize>,

    columns: ColumnSet<R>,
    compounds: CompoundFields,
    filters: FilterState,
    sort: SortState,
    extractor: Option<SortExtractor<R>>,

    paginator: ClientPaginator,
    selection: SelectionTracker<R>,
    search_input: Debouncer<String>,

    actions: ActionSet<R>,
    column_editor: Option<BoxedColumnEditor<R>>,

    /// Generated options of select filters without explicit options
    filter_options: BTreeMap<String, Vec<Value>>,

    config: GridConfig,
    search_bar_id: String,
    events: EventDispatcher,
}

impl<R: Record> DataView<R> {
    pub fn new(rows: Vec<R>, columns: Vec<Column<R>>, config: GridConfig) -> Result<Self> {
        let mut ids = IdAllocator::search_bars();
        Self::with_id_allocator(rows, columns, config, &mut ids)
    }

    /// Like [`DataView::new`], taking the search input id from a shared
    /// allocator
    pub fn with_id_allocator(
        rows: Vec<R>,
        columns: Vec<Column<R>>,
        config: GridConfig,
        ids: &mut IdAllocator,
    ) -> Result<Self> {
        let columns = ColumnSet::new(columns)?;
        let paginator = ClientPaginator::new(
            config.pagination.page_size,
            config.pagination.page_size_options.clone(),
        );
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

        let mut view = Self {
            visible_rows: Vec::new(),
            source: Arc::new(rows),
            columns,
            compounds: CompoundFields::new(),
            filters: FilterState::new(),
            sort,
            extractor: None,
            paginator,
            selection: SelectionTracker::new(),
            search_input: Debouncer::for_search(
                config.search.instant_search,
                config.search.debounce_delay_ms,
            ),
            actions,
            column_editor: None,
            filter_options: BTreeMap::new(),
            search_bar_id: ids.next_id(),
            config,
            events: EventDispatcher::new(),
        };
        view.generate_filter_options();
        view.refresh();
        info!(
            target: "view",
            "Created view {} over {} rows",
            view.search_bar_id,
            view.source.len()
        );
        Ok(view)
    }

    /// Build a view whose columns are flattened from the first row
    pub fn from_sample(rows: Vec<R>, sample: &Value, config: GridConfig) -> Result<Self>
    where
        R: 'static,
    {
        let columns = flatten(sample, &classify_by_value::<R>, None);
        Self::new(rows, columns, config)
    }

    pub fn with_compound_fields(mut self, compounds: CompoundFields) -> Self {
        self.compounds = compounds;
        self.generate_filter_options();
        self.refresh();
        self
    }

    pub fn with_sort_extractor(mut self, extractor: SortExtractor<R>) -> Self {
        self.extractor = Some(extractor);
        self.refresh();
        self
    }

    /// Caller supplied actions are kept after the built-in ones
    pub fn with_actions(mut self, actions: ActionSet<R>) -> Self {
        for action in actions.table {
            if !self.actions.add_table_action_once(action) {
                debug!(target: "view", "Skipping duplicate table action");
            }
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

    /// Replace the rows. Filters, sort and page are kept and re-applied.
    pub fn set_data(&mut self, rows: Vec<R>) {
        debug!(target: "view", "Replacing {} rows with {}", self.source.len(), rows.len());
        self.source = Arc::new(rows);
        self.generate_filter_options();
        self.refresh();
    }

    /// Re-run filter, sort and pagination
    pub fn refresh(&mut self) {
        let evaluator = FilterEvaluator::new(&self.filters, self.columns.columns(), &self.compounds);
        let mut rows = evaluator.filter_indices(&self.source);
        sort_indices(
            &self.source,
            &mut rows,
            &self.sort,
            &self.compounds,
            self.extractor.as_ref(),
        );
        self.visible_rows = rows;

        let page_before = self.paginator.page_index();
        self.paginator.set_length(self.visible_rows.len());
        if self.paginator.page_index() != page_before {
            self.emit_page_changed();
        }
        self.emit_window_changed();
    }

    // ---- filtering ----

    /// Text typed into the search input; applied once the debounce window
    /// passes (immediately in instant mode)
    pub fn on_search_input(&mut self, text: impl Into<String>) {
        self.on_search_input_at(text, Instant::now());
    }

    pub fn on_search_input_at(&mut self, text: impl Into<String>, now: Instant) {
        if let Some(text) = self.search_input.on_value_change_at(text.into(), now) {
            self.set_global_filter(text);
        }
    }

    /// Apply pending search input whose window has passed.
    /// Returns true when a filter was applied.
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

    pub fn has_pending_search(&self) -> bool {
        self.search_input.is_pending()
    }

    pub fn set_global_filter(&mut self, text: impl Into<String>) {
        self.filters.set_global_text(text);
        self.filters_changed();
    }

    pub fn set_column_filter(&mut self, field: impl Into<String>, value: FilterValue) {
        self.filters.set_column(field, value);
        self.filters_changed();
    }

    /// Column filter from an untyped form value; empty values clear it
    pub fn set_column_filter_json(&mut self, field: impl Into<String>, value: &Value) {
        self.filters.set_column_json(field, value);
        self.filters_changed();
    }

    pub fn clear_column_filter(&mut self, field: &str) {
        self.filters.clear_column(field);
        self.filters_changed();
    }

    /// Clear the search text, every column filter and pending search input
    pub fn reset_filters(&mut self) {
        info!(target: "filter", "Resetting all filters");
        self.search_input.clear();
        self.filters.clear();
        self.filters_changed();
    }

    fn filters_changed(&mut self) {
        self.refresh();
        let event = ViewEvent::FilterChanged {
            global_text: self.filters.global_text.clone(),
            active_columns: self.filters.columns().map(|(f, _)| f.to_string()).collect(),
            matched: Some(self.visible_rows.len()),
        };
        debug!(target: "filter", "{} of {} rows match", self.visible_rows.len(), self.source.len());
        self.events.dispatch(event);
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Options of a select filter: explicit options, else the sorted unique
    /// values of the column in the current data
    pub fn filter_options(&self, field: &str) -> Option<&[Value]> {
        let column = self.columns.get(field)?;
        match &column.filter.as_ref()?.kind {
            FilterKind::Select {
                options: Some(options),
                ..
            } => Some(options.as_slice()),
            FilterKind::Select { options: None, .. } => {
                self.filter_options.get(field).map(Vec::as_slice)
            }
            _ => None,
        }
    }

    fn generate_filter_options(&mut self) {
        let mut generated = BTreeMap::new();
        for column in self.columns.columns() {
            let wants_options = matches!(
                column.filter.as_ref().map(|f| &f.kind),
                Some(FilterKind::Select { options: None, .. })
            );
            if !wants_options {
                continue;
            }

            let mut values: Vec<Value> = self
                .source
                .iter()
                .filter_map(|row| self.compounds.resolve_field(row, &column.field))
                .collect();
            values.sort_by(order_values);
            values.dedup_by(|a, b| values_loosely_equal(a, b));
            generated.insert(column.field.clone(), values);
        }

        for (field, options) in &generated {
            if self.filter_options.get(field) != Some(options) {
                self.events.dispatch(ViewEvent::FilterOptionsChanged {
                    field: field.clone(),
                    options: options.clone(),
                });
            }
        }
        self.filter_options = generated;
    }

    // ---- sorting ----

    pub fn set_sort(&mut self, field: impl Into<String>, direction: SortDirection) {
        self.sort = SortState::new(field, direction);
        info!(target: "sort", "{}", self.sort.announcement());
        self.refresh();
        self.events.dispatch(ViewEvent::SortChanged {
            sort: self.sort.clone(),
            announcement: self.sort.announcement(),
        });
    }

    /// Header click: cycle asc -> desc -> none on the same field, start at
    /// asc on a new one. Fields that are neither sortable columns nor
    /// compound fields are ignored.
    pub fn toggle_sort(&mut self, field: &str) {
        let sortable = self.compounds.contains(field)
            || self.columns.get(field).is_some_and(|c| c.sortable);
        if !sortable {
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

    pub fn clear_sort(&mut self) {
        let field = self.sort.active_field.clone();
        self.set_sort(field, SortDirection::None);
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    // ---- pagination ----

    pub fn paginator(&self) -> &ClientPaginator {
        &self.paginator
    }

    pub fn page_index(&self) -> usize {
        self.paginator.page_index()
    }

    pub fn paginate(&mut self, page_index: usize) {
        self.paginator.paginate(page_index);
        self.page_moved();
    }

    pub fn next_page(&mut self) -> bool {
        let moved = self.paginator.next_page().is_some();
        if moved {
            self.page_moved();
        }
        moved
    }

    pub fn previous_page(&mut self) -> bool {
        let moved = self.paginator.previous_page().is_some();
        if moved {
            self.page_moved();
        }
        moved
    }

    pub fn first_page(&mut self) {
        self.paginator.first_page();
        self.page_moved();
    }

    pub fn last_page(&mut self) {
        self.paginator.last_page();
        self.page_moved();
    }

    pub fn go_to_page(&mut self, input: &str) {
        self.paginator.go_to_page(input);
        self.page_moved();
    }

    pub fn change_page_size(&mut self, page_size: usize) {
        self.paginator.change_page_size(page_size);
        self.refresh();
        self.emit_page_changed();
    }

    fn page_moved(&mut self) {
        self.emit_page_changed();
        self.emit_window_changed();
    }

    pub fn range_label(&self) -> String {
        self.paginator.range_label()
    }

    /// Page size choices to offer, or none when the selector is hidden
    pub fn page_size_options(&self) -> Vec<usize> {
        if self.config.pagination.hide_page_size {
            return Vec::new();
        }
        self.paginator.state().displayed_page_size_options()
    }

    /// Number of rows matching the filters
    pub fn row_count(&self) -> usize {
        self.visible_rows.len()
    }

    pub fn source(&self) -> &[R] {
        &self.source
    }

    /// Source indices of the filtered, sorted rows
    pub fn visible_row_indices(&self) -> &[usize] {
        &self.visible_rows
    }

    /// Rows on the current page
    pub fn page_rows(&self) -> Vec<&R> {
        self.visible_rows[self.paginator.window_range()]
            .iter()
            .filter_map(|&idx| self.source.get(idx))
            .collect()
    }

    fn page_rows_owned(&self) -> Vec<R> {
        self.page_rows().into_iter().cloned().collect()
    }

    pub fn row_on_page(&self, index_on_page: usize) -> Option<&R> {
        let range = self.paginator.window_range();
        let position = range.start + index_on_page;
        if position >= range.end {
            return None;
        }
        self.visible_rows
            .get(position)
            .and_then(|&idx| self.source.get(idx))
    }

    /// 1-based number of a row on the current page across all pages
    pub fn row_number(&self, index_on_page: usize) -> usize {
        self.paginator.state().row_number(index_on_page)
    }

    // ---- selection ----

    pub fn toggle_row(&mut self, index_on_page: usize, checked: bool) {
        let Some(row) = self.row_on_page(index_on_page).cloned() else {
            warn!(target: "selection", "No row {} on page {}", index_on_page, self.page_index());
            return;
        };
        let page = self.page_index();
        self.selection.toggle(&row, page, checked);
        self.emit_selection_changed();
    }

    pub fn is_row_selected(&self, index_on_page: usize) -> bool {
        self.row_on_page(index_on_page)
            .is_some_and(|row| self.selection.is_selected(row, self.page_index()))
    }

    /// Header checkbox: select or deselect every row on the current page
    pub fn toggle_all_on_page(&mut self, checked: bool) {
        let rows = self.page_rows_owned();
        let page = self.page_index();
        self.selection.toggle_all_on_page(&rows, page, checked);
        self.emit_selection_changed();
    }

    pub fn select_all_state(&self) -> SelectAllState {
        let rows = self.page_rows_owned();
        self.selection.select_all_state(&rows, self.page_index())
    }

    pub fn selected_rows(&self) -> Vec<R> {
        self.selection.get_all_selected()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear_all();
        self.emit_selection_changed();
    }

    pub fn selection(&self) -> &SelectionTracker<R> {
        &self.selection
    }

    // ---- columns ----

    pub fn columns(&self) -> &ColumnSet<R> {
        &self.columns
    }

    /// Column ids in render order: the selection column, the row number
    /// column, the visible fields, then the row actions column
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

    /// Replace the column list wholesale. Rejected lists leave the view
    /// unchanged.
    pub fn replace_columns(&mut self, columns: Vec<Column<R>>) -> Result<()> {
        self.columns.replace(columns)?;
        self.columns_changed();
        Ok(())
    }

    pub fn set_column_visible(&mut self, field: &str, visible: bool) -> Result<()> {
        let columns = self.columns.with_visibility(field, visible);
        self.replace_columns(columns)
    }

    pub fn move_column_left(&mut self, field: &str) -> Result<()> {
        let columns = self.columns.moved_left(field);
        self.replace_columns(columns)
    }

    pub fn move_column_right(&mut self, field: &str) -> Result<()> {
        let columns = self.columns.moved_right(field);
        self.replace_columns(columns)
    }

    pub fn reset_columns(&mut self) {
        self.columns.reset_to_defaults();
        self.columns_changed();
    }

    /// Run an edit session with the given editor.
    /// Returns true when a new list was applied.
    pub fn edit_columns<E: ColumnEditor<R>>(&mut self, editor: &mut E) -> Result<bool> {
        let applied = self.columns.edit_with(editor)?;
        if applied {
            self.columns_changed();
        }
        Ok(applied)
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

    fn columns_changed(&mut self) {
        self.generate_filter_options();
        self.refresh();
        self.events.dispatch(ViewEvent::ColumnsChanged {
            visible: self.columns.visible_fields(),
        });
    }

    // ---- actions ----

    pub fn actions(&self) -> &ActionSet<R> {
        &self.actions
    }

    pub fn table_action_labels(&self) -> Vec<&str> {
        self.actions.table.iter().map(|a| a.label.as_str()).collect()
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
        match self.row_on_page(index_on_page) {
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
            rows: self.paginator.window_range().len(),
            range_label: self.paginator.range_label(),
        };
        self.events.dispatch(event);
    }

    fn emit_selection_changed(&mut self) {
        let event = ViewEvent::SelectionChanged {
            page_index: self.page_index(),
            selected: self.selection.selected_count(),
        };
        self.events.dispatch(event);
    }
}
