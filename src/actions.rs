//! Table, row and selected-row actions
//!
//! The view only stores these callables and invokes them. The one piece of
//! logic applied here is the disabled check before an invocation.

use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub type Callback = Arc<dyn Fn() + Send + Sync>;
pub type Enablement = Arc<dyn Fn() -> bool + Send + Sync>;
pub type RowCallback<R> = Arc<dyn Fn(&R) + Send + Sync>;
pub type RowEnablement<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;
pub type RowsCallback<R> = Arc<dyn Fn(&[R]) + Send + Sync>;
pub type RowsEnablement<R> = Arc<dyn Fn(&[R]) -> bool + Send + Sync>;

/// Result of an invocation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    Invoked,
    /// The disabled check said no; the callable was not run
    Disabled,
    /// No action with that label
    NotFound,
}

pub const RESET_FILTERS_LABEL: &str = "Reset filters";
pub const MODIFY_COLUMNS_LABEL: &str = "Modify columns";

/// What a table action runs: a caller supplied callable, or one of the
/// operations the view performs on itself
#[derive(Clone)]
pub enum TableActionKind {
    Custom(Callback),
    ResetFilters,
    ModifyColumns,
}

#[derive(Clone)]
pub struct TableAction {
    pub label: String,
    pub description: Option<String>,
    pub kind: TableActionKind,
    pub disabled: Option<Enablement>,
}

impl TableAction {
    pub fn new<F>(label: impl Into<String>, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            description: None,
            kind: TableActionKind::Custom(Arc::new(action)),
            disabled: None,
        }
    }

    pub fn reset_filters() -> Self {
        Self {
            label: RESET_FILTERS_LABEL.to_string(),
            description: Some("Clear the search text and all column filters".to_string()),
            kind: TableActionKind::ResetFilters,
            disabled: None,
        }
    }

    pub fn modify_columns() -> Self {
        Self {
            label: MODIFY_COLUMNS_LABEL.to_string(),
            description: Some("Show, hide or reorder columns".to_string()),
            kind: TableActionKind::ModifyColumns,
            disabled: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn disabled_when<F>(mut self, disabled: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.disabled = Some(Arc::new(disabled));
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.as_ref().is_some_and(|d| d())
    }

    /// Run a custom action. Built-in kinds are run by the view that owns
    /// them and report `NotFound` here.
    pub fn invoke(&self) -> ActionResult {
        if self.is_disabled() {
            debug!(target: "view", "Action '{}' is disabled", self.label);
            return ActionResult::Disabled;
        }
        match &self.kind {
            TableActionKind::Custom(action) => {
                action();
                ActionResult::Invoked
            }
            TableActionKind::ResetFilters | TableActionKind::ModifyColumns => ActionResult::NotFound,
        }
    }
}

impl fmt::Debug for TableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TableActionKind::Custom(_) => "custom",
            TableActionKind::ResetFilters => "reset_filters",
            TableActionKind::ModifyColumns => "modify_columns",
        };
        f.debug_struct("TableAction")
            .field("label", &self.label)
            .field("kind", &kind)
            .finish()
    }
}

/// An action offered on every row
pub struct RowAction<R> {
    pub label: String,
    pub description: Option<String>,
    pub action: RowCallback<R>,
    pub disabled: Option<RowEnablement<R>>,
}

impl<R> RowAction<R> {
    pub fn new<F>(label: impl Into<String>, action: F) -> Self
    where
        F: Fn(&R) + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            description: None,
            action: Arc::new(action),
            disabled: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn disabled_when<F>(mut self, disabled: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.disabled = Some(Arc::new(disabled));
        self
    }

    pub fn is_disabled(&self, row: &R) -> bool {
        self.disabled.as_ref().is_some_and(|d| d(row))
    }

    pub fn invoke(&self, row: &R) -> ActionResult {
        if self.is_disabled(row) {
            return ActionResult::Disabled;
        }
        (self.action)(row);
        ActionResult::Invoked
    }
}

impl<R> Clone for RowAction<R> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            description: self.description.clone(),
            action: Arc::clone(&self.action),
            disabled: self.disabled.clone(),
        }
    }
}

impl<R> fmt::Debug for RowAction<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowAction").field("label", &self.label).finish()
    }
}

/// An action over the currently selected rows
pub struct SelectedRowsAction<R> {
    pub label: String,
    pub description: Option<String>,
    pub action: RowsCallback<R>,
    pub disabled: Option<RowsEnablement<R>>,
}

impl<R> SelectedRowsAction<R> {
    pub fn new<F>(label: impl Into<String>, action: F) -> Self
    where
        F: Fn(&[R]) + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            description: None,
            action: Arc::new(action),
            disabled: None,
        }
    }

    pub fn disabled_when<F>(mut self, disabled: F) -> Self
    where
        F: Fn(&[R]) -> bool + Send + Sync + 'static,
    {
        self.disabled = Some(Arc::new(disabled));
        self
    }

    pub fn is_disabled(&self, rows: &[R]) -> bool {
        self.disabled.as_ref().is_some_and(|d| d(rows))
    }

    pub fn invoke(&self, rows: &[R]) -> ActionResult {
        if self.is_disabled(rows) {
            return ActionResult::Disabled;
        }
        (self.action)(rows);
        ActionResult::Invoked
    }
}

impl<R> Clone for SelectedRowsAction<R> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            description: self.description.clone(),
            action: Arc::clone(&self.action),
            disabled: self.disabled.clone(),
        }
    }
}

impl<R> fmt::Debug for SelectedRowsAction<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedRowsAction")
            .field("label", &self.label)
            .finish()
    }
}

/// The actions a view offers
pub struct ActionSet<R> {
    pub table: Vec<TableAction>,
    pub rows: Vec<RowAction<R>>,
    pub selected: Vec<SelectedRowsAction<R>>,
}

impl<R> ActionSet<R> {
    pub fn new() -> Self {
        Self {
            table: Vec::new(),
            rows: Vec::new(),
            selected: Vec::new(),
        }
    }

    pub fn has_row_actions(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn table_action(&self, label: &str) -> Option<&TableAction> {
        self.table.iter().find(|a| a.label == label)
    }

    /// Add a table action unless one with the same label exists.
    /// Returns false when it was already present.
    pub fn add_table_action_once(&mut self, action: TableAction) -> bool {
        if self.table_action(&action.label).is_some() {
            return false;
        }
        self.table.push(action);
        true
    }

    pub fn invoke_row(&self, label: &str, row: &R) -> ActionResult {
        self.rows
            .iter()
            .find(|a| a.label == label)
            .map_or(ActionResult::NotFound, |a| a.invoke(row))
    }

    pub fn invoke_selected(&self, label: &str, rows: &[R]) -> ActionResult {
        self.selected
            .iter()
            .find(|a| a.label == label)
            .map_or(ActionResult::NotFound, |a| a.invoke(rows))
    }
}

impl<R> Default for ActionSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for ActionSet<R> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            rows: self.rows.clone(),
            selected: self.selected.clone(),
        }
    }
}

impl<R> fmt::Debug for ActionSet<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSet")
            .field("table", &self.table)
            .field("rows", &self.rows)
            .field("selected", &self.selected)
            .finish()
    }
}
