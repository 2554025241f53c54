//! Filter configuration and filter state

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Custom column filter logic. Always wins over the built-in kinds.
pub type FilterPredicate<R> = Arc<dyn Fn(&R, &FilterValue) -> bool + Send + Sync>;

/// The kind of filter a column offers. Exactly one per column.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    Text,
    Select {
        /// Explicit options. When `None` the options are the unique
        /// values of the column in the loaded data.
        options: Option<Vec<Value>>,
        multiple: bool,
    },
    SingleDate,
    DateRange,
}

/// Filter configuration of one column
pub struct FilterSpec<R> {
    pub kind: FilterKind,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    /// Text filters only: skip the debounce delay
    pub instant_search: bool,
    predicate: Option<FilterPredicate<R>>,
}

impl<R> FilterSpec<R> {
    fn of_kind(kind: FilterKind) -> Self {
        Self {
            kind,
            label: None,
            placeholder: None,
            instant_search: false,
            predicate: None,
        }
    }

    pub fn text() -> Self {
        Self::of_kind(FilterKind::Text)
    }

    /// Select filter whose options come from the data
    pub fn select(multiple: bool) -> Self {
        Self::of_kind(FilterKind::Select {
            options: None,
            multiple,
        })
    }

    pub fn select_from(options: Vec<Value>, multiple: bool) -> Self {
        Self::of_kind(FilterKind::Select {
            options: Some(options),
            multiple,
        })
    }

    pub fn single_date() -> Self {
        Self::of_kind(FilterKind::SingleDate)
    }

    pub fn date_range() -> Self {
        Self::of_kind(FilterKind::DateRange)
    }

    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&R, &FilterValue) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_instant_search(mut self, instant: bool) -> Self {
        self.instant_search = instant;
        self
    }

    pub fn predicate(&self) -> Option<&FilterPredicate<R>> {
        self.predicate.as_ref()
    }
}

impl<R> Clone for FilterSpec<R> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            label: self.label.clone(),
            placeholder: self.placeholder.clone(),
            instant_search: self.instant_search,
            predicate: self.predicate.clone(),
        }
    }
}

impl<R> fmt::Debug for FilterSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSpec")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("instant_search", &self.instant_search)
            .field("custom_predicate", &self.predicate.is_some())
            .finish()
    }
}

/// The value a user entered for one column filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum FilterValue {
    Text(String),
    /// Selected options; single-select UIs supply one element
    Options(Vec<Value>),
    /// A single date, compared at day granularity
    Date(String),
    DateRange {
        start: Option<String>,
        end: Option<String>,
    },
}

impl FilterValue {
    pub fn text(s: impl Into<String>) -> Self {
        FilterValue::Text(s.into())
    }

    pub fn options(values: Vec<Value>) -> Self {
        FilterValue::Options(values)
    }

    pub fn date(s: impl Into<String>) -> Self {
        FilterValue::Date(s.into())
    }

    pub fn range(start: Option<&str>, end: Option<&str>) -> Self {
        FilterValue::DateRange {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
        }
    }

    /// A semantically empty value means "no filter for this column"
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Text(s) | FilterValue::Date(s) => s.is_empty(),
            FilterValue::Options(values) => values.is_empty(),
            FilterValue::DateRange { start, end } => {
                start.as_deref().map_or(true, str::is_empty)
                    && end.as_deref().map_or(true, str::is_empty)
            }
        }
    }

    /// Interpret an untyped value coming from a form control.
    /// Returns `None` when the value is semantically empty.
    pub fn from_json(value: &Value) -> Option<Self> {
        if is_semantically_empty(value) {
            return None;
        }
        let parsed = match value {
            Value::String(s) => FilterValue::Text(s.clone()),
            Value::Array(items) => FilterValue::Options(items.clone()),
            Value::Object(map) if map.contains_key("start") || map.contains_key("end") => {
                let bound = |key: &str| {
                    map.get(key)
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                };
                FilterValue::DateRange {
                    start: bound("start"),
                    end: bound("end"),
                }
            }
            other => FilterValue::Options(vec![other.clone()]),
        };
        (!parsed.is_empty()).then_some(parsed)
    }

    /// Text form of the value, used by text matching and custom predicates
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FilterValue::Text(s) | FilterValue::Date(s) => Some(s),
            _ => None,
        }
    }
}

/// Empty string, empty array, null, or an object whose leaves are all empty
pub fn is_semantically_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.values().all(is_semantically_empty),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Global search text plus per-column filter values.
///
/// Column entries are removed rather than stored empty, so an entry
/// present in `per_column` is always an active filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub global_text: String,
    per_column: BTreeMap<String, FilterValue>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_global_text(&mut self, text: impl Into<String>) {
        self.global_text = text.into();
    }

    /// Set or clear the filter of one column
    pub fn set_column(&mut self, field: impl Into<String>, value: FilterValue) {
        let field = field.into();
        if value.is_empty() {
            trace!(target: "filter", "Column filter {} is empty, removing", field);
            self.per_column.remove(&field);
        } else {
            self.per_column.insert(field, value);
        }
    }

    /// Set a column filter from an untyped form value
    pub fn set_column_json(&mut self, field: impl Into<String>, value: &Value) {
        let field = field.into();
        match FilterValue::from_json(value) {
            Some(parsed) => {
                self.per_column.insert(field, parsed);
            }
            None => {
                self.per_column.remove(&field);
            }
        }
    }

    pub fn clear_column(&mut self, field: &str) {
        self.per_column.remove(field);
    }

    pub fn column(&self, field: &str) -> Option<&FilterValue> {
        self.per_column.get(field)
    }

    /// Active column filters in field order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.per_column.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn has_global(&self) -> bool {
        !self.global_text.is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.has_global() || !self.per_column.is_empty()
    }

    /// Drop any entry that became empty. Entries set through
    /// [`FilterState::set_column`] are already sanitized; this covers
    /// states built by deserialization.
    pub fn sanitize(&mut self) {
        self.per_column.retain(|_, value| !value.is_empty());
    }

    pub fn clear(&mut self) {
        self.global_text.clear();
        self.per_column.clear();
    }

    /// Column filters as plain JSON, the shape a remote provider receives
    pub fn columns_as_json(&self) -> BTreeMap<String, Value> {
        self.per_column
            .iter()
            .map(|(field, value)| {
                let json = match value {
                    FilterValue::Text(s) | FilterValue::Date(s) => Value::String(s.clone()),
                    FilterValue::Options(values) => Value::Array(values.clone()),
                    FilterValue::DateRange { start, end } => serde_json::json!({
                        "start": start,
                        "end": end,
                    }),
                };
                (field.clone(), json)
            })
            .collect()
    }
}
