//! Column descriptors and the column schema resolver
//!
//! Columns come either from static configuration or from flattening a
//! sample record. A column list is only ever replaced wholesale, so the
//! visible set and the order can never drift apart.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::data::filter_spec::FilterSpec;
use crate::data::record::Record;

pub type RowCallback<R, T> = Arc<dyn Fn(&R) -> T + Send + Sync>;
pub type RowHandler<R> = Arc<dyn Fn(&R) + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// What a column renders. Each kind carries the callables it needs.
pub enum ColumnKind<R> {
    Text {
        truncation_limit: Option<usize>,
    },
    Button {
        label: RowCallback<R, String>,
        on_click: RowHandler<R>,
    },
    Checkbox {
        checked: RowCallback<R, bool>,
    },
    Toggle {
        checked: RowCallback<R, bool>,
    },
}

impl<R> ColumnKind<R> {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnKind::Text { .. } => "text",
            ColumnKind::Button { .. } => "button",
            ColumnKind::Checkbox { .. } => "checkbox",
            ColumnKind::Toggle { .. } => "toggle",
        }
    }
}

impl<R> Clone for ColumnKind<R> {
    fn clone(&self) -> Self {
        match self {
            ColumnKind::Text { truncation_limit } => ColumnKind::Text {
                truncation_limit: *truncation_limit,
            },
            ColumnKind::Button { label, on_click } => ColumnKind::Button {
                label: label.clone(),
                on_click: on_click.clone(),
            },
            ColumnKind::Checkbox { checked } => ColumnKind::Checkbox {
                checked: checked.clone(),
            },
            ColumnKind::Toggle { checked } => ColumnKind::Toggle {
                checked: checked.clone(),
            },
        }
    }
}

/// A column of the grid
pub struct Column<R> {
    pub kind: ColumnKind<R>,
    /// Dot path into the row, unique within a column set
    pub field: String,
    pub header: String,
    pub sortable: bool,
    pub visible: bool,
    pub align: Align,
    pub filter: Option<FilterSpec<R>>,
    pub value_getter: Option<RowCallback<R, Value>>,
}

impl<R> Column<R> {
    fn with_kind(kind: ColumnKind<R>, field: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
            header: header.into(),
            sortable: false,
            visible: true,
            align: Align::Left,
            filter: None,
            value_getter: None,
        }
    }

    pub fn text(field: impl Into<String>, header: impl Into<String>) -> Self {
        Self::with_kind(
            ColumnKind::Text {
                truncation_limit: None,
            },
            field,
            header,
        )
    }

    pub fn button<L, C>(field: impl Into<String>, header: impl Into<String>, label: L, on_click: C) -> Self
    where
        L: Fn(&R) -> String + Send + Sync + 'static,
        C: Fn(&R) + Send + Sync + 'static,
    {
        Self::with_kind(
            ColumnKind::Button {
                label: Arc::new(label),
                on_click: Arc::new(on_click),
            },
            field,
            header,
        )
    }

    pub fn checkbox<F>(field: impl Into<String>, header: impl Into<String>, checked: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        Self::with_kind(
            ColumnKind::Checkbox {
                checked: Arc::new(checked),
            },
            field,
            header,
        )
    }

    pub fn toggle<F>(field: impl Into<String>, header: impl Into<String>, checked: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        Self::with_kind(
            ColumnKind::Toggle {
                checked: Arc::new(checked),
            },
            field,
            header,
        )
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn with_filter(mut self, filter: FilterSpec<R>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_value_getter<F>(mut self, getter: F) -> Self
    where
        F: Fn(&R) -> Value + Send + Sync + 'static,
    {
        self.value_getter = Some(Arc::new(getter));
        self
    }

    /// Text columns only
    pub fn with_truncation(mut self, limit: usize) -> Self {
        if let ColumnKind::Text { truncation_limit } = &mut self.kind {
            *truncation_limit = Some(limit);
        }
        self
    }

    /// Overlay `newer` on top of this column. Everything `newer` sets wins;
    /// optional parts `newer` leaves unset are kept from `self`.
    pub fn merged_with(self, newer: Column<R>) -> Column<R> {
        let kind = match (self.kind, newer.kind) {
            (
                ColumnKind::Text {
                    truncation_limit: old,
                },
                ColumnKind::Text {
                    truncation_limit: new,
                },
            ) => ColumnKind::Text {
                truncation_limit: new.or(old),
            },
            (_, kind) => kind,
        };

        Column {
            kind,
            field: newer.field,
            header: newer.header,
            sortable: newer.sortable,
            visible: newer.visible,
            align: newer.align,
            filter: newer.filter.or(self.filter),
            value_getter: newer.value_getter.or(self.value_getter),
        }
    }
}

impl<R: Record> Column<R> {
    /// Value shown in the cell: the value getter if present, else the field
    pub fn cell_value(&self, row: &R) -> Option<Value> {
        match &self.value_getter {
            Some(getter) => Some(getter(row)),
            None => row.field(&self.field),
        }
    }
}

impl<R> Clone for Column<R> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            field: self.field.clone(),
            header: self.header.clone(),
            sortable: self.sortable,
            visible: self.visible,
            align: self.align,
            filter: self.filter.clone(),
            value_getter: self.value_getter.clone(),
        }
    }
}

impl<R> fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("kind", &self.kind.name())
            .field("field", &self.field)
            .field("header", &self.header)
            .field("sortable", &self.sortable)
            .field("visible", &self.visible)
            .field("align", &self.align)
            .field("filter", &self.filter)
            .finish()
    }
}

/// Default classifier for flattened records: booleans become checkbox
/// columns, everything else a sortable text column.
pub fn classify_by_value<R: Record + 'static>(key: &str, value: &Value, path: &str) -> Column<R> {
    match value {
        Value::Bool(_) => {
            let field = path.to_string();
            Column::checkbox(path, key, move |row: &R| {
                row.field(&field).and_then(|v| v.as_bool()).unwrap_or(false)
            })
        }
        Value::Number(_) => Column::text(path, key).sortable().align(Align::Right),
        _ => Column::text(path, key).sortable(),
    }
}

/// Turn the leaf fields of a record into columns with dot-path fields.
///
/// Nested objects are walked with an extended prefix, arrays and scalars
/// are leaves. `classify` receives `(key, value, path)`.
pub fn flatten<R, F>(obj: &Value, classify: &F, prefix: Option<&str>) -> Vec<Column<R>>
where
    F: Fn(&str, &Value, &str) -> Column<R>,
{
    let mut columns = Vec::new();
    let Some(map) = obj.as_object() else {
        return columns;
    };

    for (key, value) in map {
        let path = match prefix {
            Some(p) if !p.is_empty() => format!("{}.{}", p, key),
            _ => key.clone(),
        };

        if value.is_object() {
            columns.extend(flatten(value, classify, Some(&path)));
        } else {
            columns.push(classify(key, value, &path));
        }
    }

    columns
}

/// Merge `incoming` into `existing`, matching by field. Matched columns
/// are overlaid in place, new ones are appended.
pub fn merge_columns<R>(existing: &[Column<R>], incoming: Vec<Column<R>>) -> Vec<Column<R>> {
    let mut merged: Vec<Column<R>> = existing.to_vec();

    for column in incoming {
        match merged.iter().position(|c| c.field == column.field) {
            Some(idx) => {
                let old = merged.remove(idx);
                merged.insert(idx, old.merged_with(column));
            }
            None => merged.push(column),
        }
    }

    merged
}

pub fn flatten_and_merge<R, F>(
    obj: &Value,
    classify: &F,
    existing: &[Column<R>],
    prefix: Option<&str>,
) -> Vec<Column<R>>
where
    F: Fn(&str, &Value, &str) -> Column<R>,
{
    merge_columns(existing, flatten(obj, classify, prefix))
}

fn ensure_unique_fields<R>(columns: &[Column<R>]) -> Result<()> {
    let mut seen = HashSet::new();
    for column in columns {
        if !seen.insert(column.field.as_str()) {
            bail!("Duplicate column field '{}'", column.field);
        }
    }
    Ok(())
}

/// Result of a column edit session
pub enum ColumnEdit<R> {
    Apply(Vec<Column<R>>),
    Cancel,
}

/// The show/hide/reorder surface. It gets the current list and the frozen
/// default order and answers with a full replacement list or a cancel.
pub trait ColumnEditor<R> {
    fn edit(&mut self, current: &[Column<R>], defaults: &[Column<R>]) -> ColumnEdit<R>;
}

impl<R, F> ColumnEditor<R> for F
where
    F: FnMut(&[Column<R>], &[Column<R>]) -> ColumnEdit<R>,
{
    fn edit(&mut self, current: &[Column<R>], defaults: &[Column<R>]) -> ColumnEdit<R> {
        self(current, defaults)
    }
}

/// The columns of one view plus the default order they started with
pub struct ColumnSet<R> {
    columns: Vec<Column<R>>,
    defaults: Arc<Vec<Column<R>>>,
}

impl<R> ColumnSet<R> {
    pub fn new(columns: Vec<Column<R>>) -> Result<Self> {
        ensure_unique_fields(&columns)?;
        Ok(Self {
            defaults: Arc::new(columns.clone()),
            columns,
        })
    }

    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    pub fn defaults(&self) -> &[Column<R>] {
        &self.defaults
    }

    pub fn get(&self, field: &str) -> Option<&Column<R>> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Position of a column in the current order
    pub fn order(&self, field: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.field == field)
    }

    pub fn visible(&self) -> impl Iterator<Item = &Column<R>> {
        self.columns.iter().filter(|c| c.visible)
    }

    pub fn visible_fields(&self) -> Vec<String> {
        self.visible().map(|c| c.field.clone()).collect()
    }

    pub fn hidden_fields(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !c.visible)
            .map(|c| c.field.clone())
            .collect()
    }

    pub fn has_filters(&self) -> bool {
        self.columns.iter().any(|c| c.filter.is_some())
    }

    /// Replace the whole list. A list with duplicate fields is rejected
    /// and the current list stays in place.
    pub fn replace(&mut self, columns: Vec<Column<R>>) -> Result<()> {
        if let Err(e) = ensure_unique_fields(&columns) {
            warn!(target: "columns", "Rejected column list: {}", e);
            return Err(e);
        }
        debug!(target: "columns", "Replacing {} columns with {}", self.columns.len(), columns.len());
        self.columns = columns;
        Ok(())
    }

    /// Run an edit session. Returns true when a new list was applied.
    pub fn edit_with<E: ColumnEditor<R>>(&mut self, editor: &mut E) -> Result<bool> {
        match editor.edit(&self.columns, &self.defaults) {
            ColumnEdit::Apply(columns) => {
                self.replace(columns)?;
                Ok(true)
            }
            ColumnEdit::Cancel => {
                debug!(target: "columns", "Column edit cancelled");
                Ok(false)
            }
        }
    }

    pub fn reset_to_defaults(&mut self) {
        self.columns = self.defaults.as_ref().clone();
    }

    /// Copy of the list with one column shown or hidden
    pub fn with_visibility(&self, field: &str, visible: bool) -> Vec<Column<R>> {
        self.columns
            .iter()
            .map(|c| {
                let mut c = c.clone();
                if c.field == field {
                    c.visible = visible;
                }
                c
            })
            .collect()
    }

    /// Copy of the list with every column visible
    pub fn with_all_visible(&self) -> Vec<Column<R>> {
        self.columns
            .iter()
            .map(|c| {
                let mut c = c.clone();
                c.visible = true;
                c
            })
            .collect()
    }

    /// Copy of the list with a column swapped one step left.
    /// Moving the first column left wraps it to the end.
    pub fn moved_left(&self, field: &str) -> Vec<Column<R>> {
        let mut columns = self.columns.clone();
        if let Some(idx) = self.order(field) {
            if idx == 0 {
                let col = columns.remove(0);
                columns.push(col);
            } else {
                columns.swap(idx - 1, idx);
            }
        }
        columns
    }

    /// Copy of the list with a column swapped one step right.
    /// Moving the last column right wraps it to the front.
    pub fn moved_right(&self, field: &str) -> Vec<Column<R>> {
        let mut columns = self.columns.clone();
        let len = columns.len();
        if let Some(idx) = self.order(field) {
            if idx == len - 1 {
                if let Some(col) = columns.pop() {
                    columns.insert(0, col);
                }
            } else {
                columns.swap(idx, idx + 1);
            }
        }
        columns
    }

    /// Copy of the list with a column moved to `to` (clamped to the end)
    pub fn moved_to(&self, field: &str, to: usize) -> Vec<Column<R>> {
        let mut columns = self.columns.clone();
        if let Some(idx) = self.order(field) {
            let col = columns.remove(idx);
            let to = to.min(columns.len());
            columns.insert(to, col);
        }
        columns
    }
}

impl<R> Clone for ColumnSet<R> {
    fn clone(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            defaults: self.defaults.clone(),
        }
    }
}

impl<R> fmt::Debug for ColumnSet<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnSet")
            .field("columns", &self.columns)
            .field("defaults", &self.defaults.len())
            .finish()
    }
}
