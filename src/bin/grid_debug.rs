// Grid view debug binary - runs one view over a data file and prints a page
// Run with: cargo run --bin grid_debug -- data.json --filter sales --sort amount:desc

use anyhow::{bail, Context, Result};
use serde_json::Value;

use grid_view::config::GridConfig;
use grid_view::data::sort_compare::SortDirection;
use grid_view::data::data_view::DataView;
use grid_view::loaders::load_rows;
use grid_view::logging::init_tracing;
use grid_view::pagination::Paginator;
use grid_view::table_display::render_page;

struct Options {
    file: String,
    filter: Option<String>,
    sort: Option<(String, SortDirection)>,
    page: Option<String>,
    page_size: Option<usize>,
    show_logs: bool,
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|pos| args.get(pos + 1))
        .cloned()
}

fn parse_args(args: &[String]) -> Result<Options> {
    let takes_value = ["--filter", "--sort", "--page", "--page-size"];
    let file = args
        .iter()
        .enumerate()
        .skip(1)
        .find(|(i, arg)| {
            !arg.starts_with("--") && !takes_value.contains(&args[i - 1].as_str())
        })
        .map(|(_, arg)| arg.clone());
    let Some(file) = file else {
        bail!("usage: grid_debug <file.json|file.csv> [--filter TEXT] [--sort FIELD[:asc|desc]] [--page N] [--page-size N] [--logs]");
    };

    let sort = flag_value(args, "--sort").map(|spec| match spec.split_once(':') {
        Some((field, direction)) => (field.to_string(), SortDirection::parse(direction)),
        None => (spec, SortDirection::Asc),
    });

    let page_size = flag_value(args, "--page-size")
        .map(|s| s.parse::<usize>())
        .transpose()
        .context("--page-size must be a number")?;

    Ok(Options {
        file,
        filter: flag_value(args, "--filter"),
        sort,
        page: flag_value(args, "--page"),
        page_size,
        show_logs: args.iter().any(|arg| arg == "--logs"),
    })
}

fn main() -> Result<()> {
    let logs = init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let options = parse_args(&args)?;

    let rows = load_rows(&options.file)?;
    let Some(sample) = rows.first().cloned() else {
        println!("{} has no rows", options.file);
        return Ok(());
    };

    let config = GridConfig::load().unwrap_or_default();
    let mut view: DataView<Value> = DataView::from_sample(rows, &sample, config)?;

    if let Some(page_size) = options.page_size {
        view.change_page_size(page_size);
    }
    if let Some(text) = &options.filter {
        view.set_global_filter(text.as_str());
    }
    if let Some((field, direction)) = options.sort {
        view.set_sort(field, direction);
    }
    if let Some(page) = &options.page {
        view.go_to_page(page);
    }

    println!("{}", render_page(&view));
    println!(
        "{}  (page {} of {})",
        view.range_label(),
        view.page_index() + 1,
        view.paginator().total_pages().unwrap_or(0).max(1)
    );

    if options.show_logs {
        println!();
        for entry in logs.get_recent(20) {
            println!("{}", entry.format_for_display());
        }
    }

    Ok(())
}
