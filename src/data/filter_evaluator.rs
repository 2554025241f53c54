use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, trace};

use crate::data::column_schema::Column;
use crate::data::compound_fields::CompoundFields;
use crate::data::filter_spec::{FilterKind, FilterPredicate, FilterState, FilterValue};
use crate::data::record::{
    display_value, parse_timestamp, parse_timestamp_str, values_loosely_equal, Record,
};

/// One active column filter, with its value parsed up front
enum ColumnCheck<'a, R> {
    Custom {
        predicate: &'a FilterPredicate<R>,
        value: &'a FilterValue,
    },
    Select(Vec<Value>),
    SingleDate(NaiveDate),
    DateRange {
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    },
    Text(String),
}

/// Decides whether rows match a filter state.
///
/// Built once per recompute so the global text is lowercased and dates are
/// parsed a single time, then applied to every row.
pub struct FilterEvaluator<'a, R> {
    compounds: &'a CompoundFields,
    global_needle: Option<String>,
    checks: Vec<(&'a str, ColumnCheck<'a, R>)>,
}

impl<'a, R: Record> FilterEvaluator<'a, R> {
    pub fn new(state: &'a FilterState, columns: &'a [Column<R>], compounds: &'a CompoundFields) -> Self {
        let global_needle = state
            .has_global()
            .then(|| state.global_text.to_lowercase());

        let checks = state
            .columns()
            .filter_map(|(field, value)| {
                let column = columns.iter().find(|c| c.field == field);
                Self::prepare(field, value, column).map(|check| (field, check))
            })
            .collect();

        Self {
            compounds,
            global_needle,
            checks,
        }
    }

    fn prepare(field: &str, value: &'a FilterValue, column: Option<&'a Column<R>>) -> Option<ColumnCheck<'a, R>> {
        if value.is_empty() {
            return None;
        }

        let spec = column.and_then(|c| c.filter.as_ref());
        if let Some(predicate) = spec.and_then(|s| s.predicate()) {
            return Some(ColumnCheck::Custom { predicate, value });
        }

        let kind = spec.map(|s| &s.kind).unwrap_or(&FilterKind::Text);
        let check = match (kind, value) {
            (FilterKind::Select { .. }, FilterValue::Options(options)) => {
                ColumnCheck::Select(options.clone())
            }
            (FilterKind::Select { .. }, FilterValue::Text(s)) => {
                ColumnCheck::Select(vec![Value::String(s.clone())])
            }
            (FilterKind::SingleDate, FilterValue::Date(s) | FilterValue::Text(s)) => {
                match parse_timestamp_str(s) {
                    Some(dt) => ColumnCheck::SingleDate(dt.date()),
                    None => {
                        debug!(target: "filter", "Ignoring unparsable date '{}' for {}", s, field);
                        return None;
                    }
                }
            }
            (_, FilterValue::DateRange { start, end }) => {
                let bound = |b: &Option<String>| -> Result<Option<NaiveDateTime>, ()> {
                    match b.as_deref().filter(|s| !s.is_empty()) {
                        None => Ok(None),
                        Some(s) => parse_timestamp_str(s).map(Some).ok_or(()),
                    }
                };
                match (bound(start), bound(end)) {
                    (Ok(start), Ok(end)) => ColumnCheck::DateRange { start, end },
                    _ => {
                        debug!(target: "filter", "Ignoring unparsable date range for {}", field);
                        return None;
                    }
                }
            }
            (FilterKind::Text, FilterValue::Options(options)) => ColumnCheck::Select(options.clone()),
            (FilterKind::Text, FilterValue::Text(s) | FilterValue::Date(s)) => {
                ColumnCheck::Text(s.to_lowercase())
            }
            (kind, value) => {
                debug!(target: "filter", "Filter value {:?} does not fit {:?} filter on {}", value, kind, field);
                return None;
            }
        };
        Some(check)
    }

    /// True when no global text and no usable column filter is active
    pub fn is_identity(&self) -> bool {
        self.global_needle.is_none() && self.checks.is_empty()
    }

    pub fn matches(&self, row: &R) -> bool {
        if let Some(needle) = &self.global_needle {
            if !self.matches_global(row, needle) {
                return false;
            }
        }

        self.checks
            .iter()
            .all(|(field, check)| self.matches_column(row, field, check))
    }

    fn matches_global(&self, row: &R, needle: &str) -> bool {
        let contains = |value: &Value| {
            display_value(value)
                .map(|s| s.to_lowercase().contains(needle))
                .unwrap_or(false)
        };

        row.search_values().iter().any(contains) || self.compounds.values(row).iter().any(contains)
    }

    fn matches_column(&self, row: &R, field: &str, check: &ColumnCheck<'a, R>) -> bool {
        if let ColumnCheck::Custom { predicate, value } = check {
            return predicate(row, value);
        }

        let Some(cell) = self.compounds.resolve_field(row, field) else {
            trace!(target: "filter", "Field {} missing on row", field);
            return false;
        };

        match check {
            ColumnCheck::Custom { .. } => unreachable!("handled above"),
            ColumnCheck::Select(options) => options.iter().any(|o| values_loosely_equal(o, &cell)),
            ColumnCheck::SingleDate(day) => {
                parse_timestamp(&cell).map_or(false, |dt| dt.date() == *day)
            }
            ColumnCheck::DateRange { start, end } => {
                let Some(at) = parse_timestamp(&cell) else {
                    return false;
                };
                if start.map_or(false, |s| at < s) {
                    return false;
                }
                if end.map_or(false, |e| at > e) {
                    return false;
                }
                true
            }
            ColumnCheck::Text(needle) => display_value(&cell)
                .map(|s| s.to_lowercase().contains(needle.as_str()))
                .unwrap_or(false),
        }
    }

    /// Indices of the rows that match, in source order
    pub fn filter_indices(&self, rows: &[R]) -> Vec<usize> {
        if self.is_identity() {
            return (0..rows.len()).collect();
        }
        rows.iter()
            .enumerate()
            .filter(|(_, row)| self.matches(row))
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// One-shot form of [`FilterEvaluator::matches`]
pub fn matches<R: Record>(
    row: &R,
    state: &FilterState,
    columns: &[Column<R>],
    compounds: &CompoundFields,
) -> bool {
    FilterEvaluator::new(state, columns, compounds).matches(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::compound_fields::CompoundField;
    use crate::data::filter_spec::FilterSpec;
    use serde_json::json;

    fn columns() -> Vec<Column<Value>> {
        vec![
            Column::text("name", "Name").with_filter(FilterSpec::select(true)),
            Column::text("weight", "Weight").with_filter(
                FilterSpec::text().with_predicate(|row: &Value, filter| {
                    let min: f64 = filter.as_text().and_then(|s| s.parse().ok()).unwrap_or(0.0);
                    row["weight"].as_f64().map_or(false, |w| w >= min)
                }),
            ),
            Column::text("discoveredBy", "Discovered By").with_filter(FilterSpec::text()),
            Column::text("dob", "Born").with_filter(FilterSpec::date_range()),
            Column::text("joined", "Joined").with_filter(FilterSpec::single_date()),
        ]
    }

    fn row() -> Value {
        json!({
            "name": "Neon",
            "weight": 20.1797,
            "discoveredBy": "Alice Johnson",
            "dob": "03/15/2025",
            "joined": "2025-02-01T13:45:00",
            "address": {"city": "Hereville"}
        })
    }

    fn check(state: &FilterState) -> bool {
        matches(&row(), state, &columns(), &CompoundFields::new())
    }

    #[test]
    fn test_no_filters_matches_everything() {
        assert!(check(&FilterState::new()));
        assert!(matches(&json!({}), &FilterState::new(), &columns(), &CompoundFields::new()));
    }

    #[test]
    fn test_global_text_is_case_insensitive_over_all_fields() {
        let mut state = FilterState::new();
        state.set_global_text("ALICE");
        assert!(check(&state));
        state.set_global_text("herev");
        assert!(check(&state));
        state.set_global_text("argon");
        assert!(!check(&state));
    }

    #[test]
    fn test_global_text_matches_compound_values() {
        let compounds = CompoundFields::new()
            .with(CompoundField::joined("location", &["name", "address.city"], " @ "))
            .unwrap();
        let mut state = FilterState::new();
        state.set_global_text("neon @ here");
        assert!(matches(&row(), &state, &columns(), &compounds));
    }

    #[test]
    fn test_select_membership() {
        let mut state = FilterState::new();
        state.set_column("name", FilterValue::options(vec![json!("Argon"), json!("Neon")]));
        assert!(check(&state));
        state.set_column("name", FilterValue::options(vec![json!("Argon")]));
        assert!(!check(&state));
    }

    #[test]
    fn test_custom_predicate_wins() {
        let mut state = FilterState::new();
        state.set_column("weight", FilterValue::text("20"));
        assert!(check(&state));
        state.set_column("weight", FilterValue::text("21"));
        assert!(!check(&state));
    }

    #[test]
    fn test_text_column_substring() {
        let mut state = FilterState::new();
        state.set_column("discoveredBy", FilterValue::text("JOHN"));
        assert!(check(&state));
        state.set_column("discoveredBy", FilterValue::text("smith"));
        assert!(!check(&state));
    }

    #[test]
    fn test_date_range_bounds() {
        let mut state = FilterState::new();
        state.set_column("dob", FilterValue::range(Some("2025-03-01"), Some("2025-03-31")));
        assert!(check(&state));
        state.set_column("dob", FilterValue::range(Some("2025-03-16"), None));
        assert!(!check(&state));
        state.set_column("dob", FilterValue::range(None, Some("2025-03-14")));
        assert!(!check(&state));
    }

    #[test]
    fn test_unparsable_date_is_permissive() {
        let mut state = FilterState::new();
        state.set_column("dob", FilterValue::range(Some("someday"), None));
        assert!(check(&state));
        state.set_column("joined", FilterValue::date("never"));
        assert!(check(&state));
    }

    #[test]
    fn test_single_date_truncates_to_day() {
        let mut state = FilterState::new();
        state.set_column("joined", FilterValue::date("2025-02-01"));
        assert!(check(&state));
        state.set_column("joined", FilterValue::date("2025-02-02"));
        assert!(!check(&state));
    }

    #[test]
    fn test_missing_field_fails_builtin_filters() {
        let mut state = FilterState::new();
        state.set_column("discoveredBy", FilterValue::text("a"));
        let bare = json!({"name": "Neon"});
        assert!(!matches(&bare, &state, &columns(), &CompoundFields::new()));
    }

    #[test]
    fn test_filter_without_column_defaults_to_text() {
        let mut state = FilterState::new();
        state.set_column("address.city", FilterValue::text("here"));
        assert!(check(&state));
    }

    #[test]
    fn test_appending_characters_never_widens() {
        let rows = vec![
            json!({"name": "Neon"}),
            json!({"name": "Neodymium"}),
            json!({"name": "Argon"}),
        ];
        let compounds = CompoundFields::new();
        let no_columns: Vec<Column<Value>> = Vec::new();
        let mut previous = rows.len();
        for needle in ["n", "ne", "neo", "neon"] {
            let mut state = FilterState::new();
            state.set_global_text(needle);
            let evaluator = FilterEvaluator::new(&state, &no_columns, &compounds);
            let count = evaluator.filter_indices(&rows).len();
            assert!(count <= previous, "{} widened the match set", needle);
            previous = count;
        }
        assert_eq!(previous, 1);
    }
}
