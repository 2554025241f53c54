use grid_view::config::{GridConfig, InitialSort};
use grid_view::data::column_schema::{classify_by_value, flatten, Column, ColumnEdit};
use grid_view::data::compound_fields::{CompoundField, CompoundFields};
use grid_view::data::data_view::DataView;
use grid_view::data::filter_evaluator::FilterEvaluator;
use grid_view::data::filter_spec::{FilterSpec, FilterState, FilterValue};
use grid_view::data::sort_compare::SortDirection;
use grid_view::pagination::{ClientPaginator, Paginator};
use grid_view::selection::SelectAllState;
use grid_view::state::{FnSubscriber, ViewEvent};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn students() -> Vec<Value> {
    vec![
        json!({"name": "Ada", "university": "B", "country": "X", "enrolled": "2021-09-01", "year": 3}),
        json!({"name": "Ben", "university": "A", "country": "Y", "enrolled": "2022-09-01", "year": 1}),
        json!({"name": "Cyd", "university": "C", "country": "X", "enrolled": "2020-01-15", "year": 4}),
        json!({"name": "Dee", "university": "A", "country": "X", "enrolled": "2023-02-10", "year": 2}),
    ]
}

fn student_columns() -> Vec<Column<Value>> {
    vec![
        Column::text("name", "Name").sortable().with_filter(FilterSpec::text()),
        Column::text("university", "University").sortable(),
        Column::text("country", "Country").with_filter(FilterSpec::select(true)),
        Column::text("enrolled", "Enrolled").with_filter(FilterSpec::date_range()),
        Column::text("year", "Year").sortable(),
    ]
}

fn location() -> CompoundFields {
    CompoundFields::new()
        .with(CompoundField::joined("location", &["university", "country"], " - "))
        .unwrap()
}

fn names(view: &DataView<Value>) -> Vec<String> {
    view.page_rows()
        .iter()
        .filter_map(|r| r["name"].as_str().map(str::to_string))
        .collect()
}

#[test]
fn test_filter_to_seven_rows_clamps_to_first_page() {
    let rows: Vec<Value> = (0..25)
        .map(|i| json!({"id": i, "kind": if i < 7 { "keep" } else { "drop" }}))
        .collect();
    let columns = vec![
        Column::text("id", "Id"),
        Column::text("kind", "Kind").with_filter(FilterSpec::select(false)),
    ];
    let mut view = DataView::new(rows, columns, GridConfig::default()).unwrap();

    view.paginate(2);
    assert_eq!(view.page_index(), 2);

    view.set_column_filter("kind", FilterValue::options(vec![json!("keep")]));
    assert_eq!(view.paginator().total_pages(), Some(1));
    assert_eq!(view.page_index(), 0);
    assert_eq!(view.page_rows().len(), 7);
    assert_eq!(view.range_label(), "1–7 of 7");
}

#[test]
fn test_compound_location_sort() {
    let rows = vec![
        json!({"university": "B", "country": "X"}),
        json!({"university": "A", "country": "Y"}),
    ];
    let columns = vec![Column::text("university", "University")];
    let mut view = DataView::new(rows, columns, GridConfig::default())
        .unwrap()
        .with_compound_fields(location());

    view.toggle_sort("location");
    let order: Vec<&str> = view
        .page_rows()
        .iter()
        .filter_map(|r| r["university"].as_str())
        .collect();
    assert_eq!(order, vec!["A", "B"]);
    assert_eq!(view.sort().announcement(), "Sorting by location ascending");
}

#[test]
fn test_global_search_covers_compound_values() {
    let mut view = DataView::new(students(), student_columns(), GridConfig::default())
        .unwrap()
        .with_compound_fields(location());

    view.set_global_filter("a - x");
    assert_eq!(names(&view), vec!["Dee"]);
}

#[test]
fn test_filters_are_anded() {
    let mut view = DataView::new(students(), student_columns(), GridConfig::default()).unwrap();

    view.set_column_filter("country", FilterValue::options(vec![json!("X")]));
    assert_eq!(view.row_count(), 3);

    view.set_column_filter("enrolled", FilterValue::range(Some("2021-01-01"), None));
    assert_eq!(names(&view), vec!["Ada", "Dee"]);

    view.set_global_filter("de");
    assert_eq!(names(&view), vec!["Dee"]);

    view.clear_column_filter("country");
    view.reset_filters();
    assert_eq!(view.row_count(), 4);
}

#[test]
fn test_unparsable_date_disables_column_filter() {
    let mut view = DataView::new(students(), student_columns(), GridConfig::default()).unwrap();
    view.set_column_filter("enrolled", FilterValue::range(Some("not a date"), None));
    assert_eq!(view.row_count(), 4);
}

#[test]
fn test_no_active_filters_match_every_row() {
    let state = FilterState::new();
    let columns = student_columns();
    let compounds = CompoundFields::new();
    let evaluator = FilterEvaluator::new(&state, &columns, &compounds);

    for row in students() {
        assert!(evaluator.matches(&row));
    }
}

#[test]
fn test_longer_search_text_never_widens_matches() {
    let mut view = DataView::new(students(), student_columns(), GridConfig::default()).unwrap();
    let mut previous = view.row_count();
    let mut needle = String::new();
    for ch in "2021-09".chars() {
        needle.push(ch);
        view.set_global_filter(needle.as_str());
        assert!(view.row_count() <= previous);
        previous = view.row_count();
    }
    assert_eq!(previous, 1);
}

#[test]
fn test_sort_none_keeps_insertion_order_and_equal_groups_are_stable() {
    let rows: Vec<Value> = (0..8)
        .map(|i| json!({"id": i, "bucket": i % 2}))
        .collect();
    let columns = vec![Column::text("id", "Id"), Column::text("bucket", "Bucket").sortable()];
    let mut view = DataView::new(rows, columns, GridConfig::default()).unwrap();
    let ids = |view: &DataView<Value>| -> Vec<i64> {
        view.page_rows().iter().filter_map(|r| r["id"].as_i64()).collect()
    };

    view.set_sort("bucket", SortDirection::None);
    assert_eq!(ids(&view), (0..8).collect::<Vec<_>>());

    view.set_sort("bucket", SortDirection::Asc);
    let first = ids(&view);
    assert_eq!(first, vec![0, 2, 4, 6, 1, 3, 5, 7]);

    view.set_sort("bucket", SortDirection::Desc);
    view.set_sort("bucket", SortDirection::Asc);
    assert_eq!(ids(&view), first);
}

#[test]
fn test_windows_partition_the_rows() {
    for length in [0usize, 1, 9, 10, 11, 34] {
        let mut paginator = ClientPaginator::new(10, vec![10, 20]);
        paginator.set_length(length);

        let mut total = 0;
        let pages = paginator.total_pages().unwrap_or(0);
        for page in 0..pages {
            paginator.paginate(page);
            let window = paginator.window_range();
            assert!(window.len() <= 10);
            total += window.len();
        }
        assert_eq!(total, length);
    }
}

#[test]
fn test_initial_sort_from_config() {
    let config = GridConfig {
        initial_sort: Some(InitialSort {
            active: "year".to_string(),
            direction: SortDirection::Desc,
        }),
        ..GridConfig::default()
    };
    let view = DataView::new(students(), student_columns(), config).unwrap();
    assert_eq!(names(&view), vec!["Cyd", "Ada", "Dee", "Ben"]);
}

#[test]
fn test_selection_is_scoped_to_the_page() {
    let rows: Vec<Value> = (0..15).map(|i| json!({"id": i})).collect();
    let mut view = DataView::new(rows, vec![Column::text("id", "Id")], GridConfig::default()).unwrap();

    view.toggle_all_on_page(true);
    assert_eq!(view.select_all_state(), SelectAllState::All);

    view.next_page();
    assert_eq!(view.select_all_state(), SelectAllState::None);
    assert!(!view.is_row_selected(0));

    view.toggle_row(0, true);
    assert_eq!(view.select_all_state(), SelectAllState::Some);
    assert_eq!(view.selected_rows().len(), 11);

    view.toggle_row(0, false);
    assert_eq!(view.selection().pages().collect::<Vec<_>>(), vec![0]);
}

#[test]
fn test_flattened_columns_use_dot_paths() {
    let sample = json!({
        "name": "Ada",
        "active": true,
        "address": {"city": "Paris", "geo": {"lat": 1.5}},
        "tags": ["a", "b"]
    });
    let columns: Vec<Column<Value>> = flatten(&sample, &classify_by_value::<Value>, None);
    let fields: Vec<&str> = columns.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(fields, vec!["name", "active", "address.city", "address.geo.lat", "tags"]);
    assert_eq!(columns[1].kind.name(), "checkbox");

    let view = DataView::from_sample(vec![sample.clone()], &sample, GridConfig::default()).unwrap();
    assert_eq!(view.columns().visible_fields().len(), 5);
}

#[test]
fn test_modify_columns_action_applies_editor_result() {
    let config = GridConfig::default().with_overrides(|c| c.columns.show_hide_columns = true);
    let editor = |current: &[Column<Value>], _defaults: &[Column<Value>]| {
        let mut columns = current.to_vec();
        columns.retain(|c| c.field != "year");
        ColumnEdit::Apply(columns)
    };
    let mut view = DataView::new(students(), student_columns(), config)
        .unwrap()
        .with_column_editor(Box::new(editor));

    assert_eq!(view.table_action_labels(), vec!["Reset filters", "Modify columns"]);
    view.run_table_action("Modify columns").unwrap();
    assert_eq!(
        view.display_columns(),
        vec!["name", "university", "country", "enrolled"]
    );

    view.reset_columns();
    assert_eq!(view.columns().visible_fields().len(), 5);
}

#[test]
fn test_events_reach_subscribers() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut view = DataView::new(students(), student_columns(), GridConfig::default()).unwrap();
    view.subscribe(Box::new(FnSubscriber::new("recorder", move |event: &ViewEvent| {
        sink.lock().unwrap().push(event.name());
    })));

    view.toggle_sort("name");
    view.set_global_filter("a");

    let seen = seen.lock().unwrap();
    assert!(seen.contains(&"sort_changed"));
    assert!(seen.contains(&"filter_changed"));
    assert!(seen.contains(&"window_changed"));
}

#[test]
fn test_debounced_search_applies_last_value() {
    use std::time::{Duration, Instant};

    let mut view = DataView::new(students(), student_columns(), GridConfig::default()).unwrap();
    let start = Instant::now();
    view.on_search_input_at("a", start);
    view.on_search_input_at("ad", start + Duration::from_millis(100));
    assert_eq!(view.row_count(), 4);

    assert!(!view.poll_search_at(start + Duration::from_millis(300)));
    assert!(view.poll_search_at(start + Duration::from_millis(700)));
    assert_eq!(view.filters().global_text, "ad");
    assert_eq!(names(&view), vec!["Ada"]);
}

#[test]
fn test_instant_search_skips_the_delay() {
    let config = GridConfig::default().with_overrides(|c| c.search.instant_search = true);
    let mut view = DataView::new(students(), student_columns(), config).unwrap();
    view.on_search_input("cyd");
    assert_eq!(names(&view), vec!["Cyd"]);
}
