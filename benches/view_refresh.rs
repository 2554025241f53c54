use criterion::{black_box, criterion_group, criterion_main, Criterion};
use grid_view::config::GridConfig;
use grid_view::data::column_schema::Column;
use grid_view::data::compound_fields::{CompoundField, CompoundFields};
use grid_view::data::data_view::DataView;
use grid_view::data::filter_spec::{FilterSpec, FilterValue};
use grid_view::data::sort_compare::SortDirection;
use serde_json::{json, Value};

fn create_test_rows(rows: usize) -> Vec<Value> {
    let books = [
        "Commodities Trading",
        "Equity Trading",
        "FX Trading",
        "Bond Trading",
        "Derivatives",
        "Options",
        "Futures",
        "ETF Trading",
    ];

    (0..rows)
        .map(|i| {
            json!({
                "id": i,
                "book": books[i % books.len()],
                "value": (i * 37) % 1000,
                "desk": { "city": format!("City {}", i % 13), "country": format!("C{}", i % 5) },
                "status": format!("STATUS_{}", i % 5),
            })
        })
        .collect()
}

fn columns() -> Vec<Column<Value>> {
    vec![
        Column::text("id", "Id").sortable(),
        Column::text("book", "Book").sortable().with_filter(FilterSpec::text()),
        Column::text("value", "Value").sortable(),
        Column::text("desk.city", "City"),
        Column::text("desk.country", "Country"),
        Column::text("status", "Status").with_filter(FilterSpec::select(true)),
    ]
}

fn create_view(rows: usize) -> DataView<Value> {
    let compounds = CompoundFields::new()
        .with(CompoundField::joined(
            "location",
            &["desk.city", "desk.country"],
            " - ",
        ))
        .expect("unique compound field");
    DataView::new(create_test_rows(rows), columns(), GridConfig::default())
        .expect("valid columns")
        .with_compound_fields(compounds)
}

fn benchmark_global_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("global_filter");

    for rows in [10_000, 50_000] {
        let mut view = create_view(rows);
        group.bench_function(format!("{}_rows", rows), |b| {
            b.iter(|| {
                view.set_global_filter(black_box("trad"));
                view.set_global_filter(black_box(""));
            });
        });
    }

    group.finish();
}

fn benchmark_compound_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("compound_sort");

    for rows in [10_000, 50_000] {
        let mut view = create_view(rows);
        group.bench_function(format!("{}_rows", rows), |b| {
            b.iter(|| {
                view.set_sort(black_box("location"), SortDirection::Asc);
                view.set_sort("location", SortDirection::None);
            });
        });
    }

    group.finish();
}

fn benchmark_filter_sort_paginate(c: &mut Criterion) {
    let mut view = create_view(50_000);

    c.bench_function("filter_sort_paginate_50k", |b| {
        b.iter(|| {
            view.set_column_filter(
                "status",
                FilterValue::options(vec![json!("STATUS_1"), json!("STATUS_3")]),
            );
            view.set_sort("value", SortDirection::Desc);
            view.paginate(black_box(5));
            black_box(view.page_rows().len());
            view.reset_filters();
        });
    });
}

criterion_group!(
    benches,
    benchmark_global_filter,
    benchmark_compound_sort,
    benchmark_filter_sort_paginate
);
criterion_main!(benches);
