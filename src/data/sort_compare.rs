use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use tracing::trace;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::data::compound_fields::CompoundFields;
use crate::data::record::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
    /// No sort applied; the original relative order is kept
    #[default]
    None,
}

impl SortDirection {
    /// Header click cycle: asc -> desc -> none -> asc
    pub fn cycle(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::None,
            SortDirection::None => SortDirection::Asc,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            SortDirection::Asc => "ascending",
            SortDirection::Desc => "descending",
            SortDirection::None => "cleared",
        }
    }

    /// Parse `asc`/`desc` (and the long forms); anything else is no sort
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => SortDirection::Asc,
            "desc" | "descending" => SortDirection::Desc,
            _ => SortDirection::None,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
            SortDirection::None => "",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub active_field: String,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            active_field: field.into(),
            direction,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.direction != SortDirection::None && !self.active_field.is_empty()
    }

    /// Text for the live announcer, e.g. "Sorting by name ascending"
    pub fn announcement(&self) -> String {
        format!(
            "Sorting by {} {}",
            self.active_field,
            self.direction.describe()
        )
    }
}

/// Custom sort value extraction: `(row, field) -> value`
pub type SortExtractor<R> = Arc<dyn Fn(&R, &str) -> Option<Value> + Send + Sync>;

/// String comparison in dictionary order.
///
/// Letters compare with accents and case folded away first. Ties are split
/// by accent (unaccented first), then by case (lowercase first).
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let base = |s: &str| {
        s.nfd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .collect::<Vec<char>>()
    };
    let accented = |s: &str| s.nfd().flat_map(char::to_lowercase).collect::<Vec<char>>();

    base(a)
        .cmp(&base(b))
        .then_with(|| accented(a).cmp(&accented(b)))
        .then_with(|| b.nfc().cmp(a.nfc()))
}

/// Type-aware comparison of two sort values.
///
/// Numbers compare numerically, booleans as false < true, strings in
/// dictionary order. Any other pairing (mixed types, nulls, missing
/// fields, objects, arrays) compares equal.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => (*x as u8).cmp(&(*y as u8)),
        (Some(Value::String(x)), Some(Value::String(y))) => locale_compare(x, y),
        _ => Ordering::Equal,
    }
}

/// The value a row is sorted by: compound field, then custom extractor,
/// then the raw field.
pub fn sort_value<R: Record>(
    row: &R,
    field: &str,
    compounds: &CompoundFields,
    extractor: Option<&SortExtractor<R>>,
) -> Option<Value> {
    if let Some(compound) = compounds.get(field) {
        return Some(compound.resolve(row));
    }
    match extractor {
        Some(extract) => extract(row, field),
        None => row.field(field),
    }
}

pub fn compare<R: Record>(
    a: &R,
    b: &R,
    state: &SortState,
    compounds: &CompoundFields,
    extractor: Option<&SortExtractor<R>>,
) -> Ordering {
    if !state.is_active() {
        return Ordering::Equal;
    }

    let va = sort_value(a, &state.active_field, compounds, extractor);
    let vb = sort_value(b, &state.active_field, compounds, extractor);
    let cmp = compare_values(va.as_ref(), vb.as_ref());

    match state.direction {
        SortDirection::Desc => cmp.reverse(),
        _ => cmp,
    }
}

/// Stable sort of row indices. Sort values are extracted once per row.
pub fn sort_indices<R: Record>(
    rows: &[R],
    indices: &mut [usize],
    state: &SortState,
    compounds: &CompoundFields,
    extractor: Option<&SortExtractor<R>>,
) {
    if !state.is_active() {
        trace!(target: "sort", "No active sort, keeping source order");
        return;
    }

    let mut keyed: Vec<(usize, Option<Value>)> = indices
        .iter()
        .map(|&idx| {
            let value = rows
                .get(idx)
                .and_then(|row| sort_value(row, &state.active_field, compounds, extractor));
            (idx, value)
        })
        .collect();

    let descending = state.direction == SortDirection::Desc;
    keyed.sort_by(|(_, a), (_, b)| {
        let cmp = compare_values(a.as_ref(), b.as_ref());
        if descending {
            cmp.reverse()
        } else {
            cmp
        }
    });

    for (slot, (idx, _)) in indices.iter_mut().zip(keyed) {
        *slot = idx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::compound_fields::CompoundField;
    use serde_json::json;

    #[test]
    fn test_numeric_comparison() {
        assert_eq!(
            compare_values(Some(&json!(2)), Some(&json!(10))),
            Ordering::Less
        );
        assert_eq!(
            compare_values(Some(&json!(2.5)), Some(&json!(2))),
            Ordering::Greater
        );
    }

    #[test]
    fn test_boolean_comparison() {
        assert_eq!(
            compare_values(Some(&json!(false)), Some(&json!(true))),
            Ordering::Less
        );
    }

    #[test]
    fn test_string_comparison_ignores_case_first() {
        assert_eq!(locale_compare("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_compare("a", "A"), Ordering::Less);
        assert_eq!(locale_compare("Zeta", "alpha"), Ordering::Greater);
        assert_eq!(locale_compare("same", "same"), Ordering::Equal);
    }

    #[test]
    fn test_accented_letters_sort_with_their_base_letter() {
        assert_eq!(locale_compare("Émile", "Zed"), Ordering::Less);
        assert_eq!(locale_compare("résumé", "rose"), Ordering::Less);
        assert_eq!(locale_compare("über", "vase"), Ordering::Less);
        assert_eq!(locale_compare("resume", "résumé"), Ordering::Less);
        assert_eq!(locale_compare("café", "cafe\u{301}"), Ordering::Equal);

        let rows = vec![json!({"n": "Zoë"}), json!({"n": "Élodie"}), json!({"n": "Adam"})];
        let mut idx = vec![0, 1, 2];
        sort_indices(
            &rows,
            &mut idx,
            &SortState::new("n", SortDirection::Asc),
            &CompoundFields::new(),
            None,
        );
        assert_eq!(idx, vec![2, 1, 0]);
    }

    #[test]
    fn test_mixed_and_missing_are_equal() {
        assert_eq!(
            compare_values(Some(&json!(1)), Some(&json!("1"))),
            Ordering::Equal
        );
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Equal);
        assert_eq!(
            compare_values(Some(&json!({"a": 1})), Some(&json!({"a": 2}))),
            Ordering::Equal
        );
    }

    #[test]
    fn test_numbers_are_not_compared_as_strings() {
        let rows = vec![json!({"n": 10}), json!({"n": 9}), json!({"n": 100})];
        let mut idx = vec![0, 1, 2];
        sort_indices(
            &rows,
            &mut idx,
            &SortState::new("n", SortDirection::Asc),
            &CompoundFields::new(),
            None,
        );
        assert_eq!(idx, vec![1, 0, 2]);
    }

    #[test]
    fn test_direction_none_is_identity() {
        let rows = vec![json!({"n": 3}), json!({"n": 1}), json!({"n": 2})];
        let mut idx = vec![0, 1, 2];
        sort_indices(
            &rows,
            &mut idx,
            &SortState::new("n", SortDirection::None),
            &CompoundFields::new(),
            None,
        );
        assert_eq!(idx, vec![0, 1, 2]);
        assert_eq!(
            compare(
                &rows[0],
                &rows[1],
                &SortState::none(),
                &CompoundFields::new(),
                None
            ),
            Ordering::Equal
        );
    }

    #[test]
    fn test_descending_keeps_equal_groups_stable() {
        let rows = vec![
            json!({"k": 1, "id": "a"}),
            json!({"k": 2, "id": "b"}),
            json!({"k": 1, "id": "c"}),
            json!({"k": 2, "id": "d"}),
        ];
        let compounds = CompoundFields::new();
        let mut idx = vec![0, 1, 2, 3];
        sort_indices(&rows, &mut idx, &SortState::new("k", SortDirection::Desc), &compounds, None);
        assert_eq!(idx, vec![1, 3, 0, 2]);
        sort_indices(&rows, &mut idx, &SortState::new("k", SortDirection::Asc), &compounds, None);
        assert_eq!(idx, vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_compound_field_sorting() {
        let rows = vec![
            json!({"university": "B", "country": "X"}),
            json!({"university": "A", "country": "Y"}),
        ];
        let compounds = CompoundFields::new()
            .with(CompoundField::joined("location", &["university", "country"], " - "))
            .unwrap();
        let mut idx = vec![0, 1];
        sort_indices(
            &rows,
            &mut idx,
            &SortState::new("location", SortDirection::Asc),
            &compounds,
            None,
        );
        assert_eq!(idx, vec![1, 0]);
    }

    #[test]
    fn test_custom_extractor_used_when_not_compound() {
        let rows = vec![json!({"price": 5}), json!({"price": 7})];
        let negate: SortExtractor<Value> = Arc::new(|row: &Value, field: &str| {
            row[field].as_f64().map(|p| json!(-p))
        });
        let mut idx = vec![0, 1];
        sort_indices(
            &rows,
            &mut idx,
            &SortState::new("price", SortDirection::Asc),
            &CompoundFields::new(),
            Some(&negate),
        );
        assert_eq!(idx, vec![1, 0]);
    }

    #[test]
    fn test_direction_cycle_and_announcement() {
        assert_eq!(SortDirection::Asc.cycle(), SortDirection::Desc);
        assert_eq!(SortDirection::Desc.cycle(), SortDirection::None);
        assert_eq!(
            SortState::new("name", SortDirection::Desc).announcement(),
            "Sorting by name descending"
        );
        assert_eq!(SortDirection::parse("DESC"), SortDirection::Desc);
    }
}
