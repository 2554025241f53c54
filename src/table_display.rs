use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};

use crate::data::column_schema::{Align, Column, ColumnKind};
use crate::data::data_view::{DataView, ROW_NUMBER_COLUMN};
use crate::data::record::{display_value, Record};

/// Text of one cell as a plain terminal would show it
pub fn cell_text<R: Record>(column: &Column<R>, row: &R) -> String {
    match &column.kind {
        ColumnKind::Text { truncation_limit } => {
            let text = column
                .cell_value(row)
                .and_then(|v| display_value(&v))
                .unwrap_or_default();
            match truncation_limit {
                Some(limit) if text.chars().count() > *limit => {
                    let mut cut: String = text.chars().take(*limit).collect();
                    cut.push('…');
                    cut
                }
                _ => text,
            }
        }
        ColumnKind::Button { label, .. } => format!("[{}]", label(row)),
        ColumnKind::Checkbox { checked } | ColumnKind::Toggle { checked } => {
            if checked(row) { "[x]" } else { "[ ]" }.to_string()
        }
    }
}

fn alignment(align: Align) -> CellAlignment {
    match align {
        Align::Left => CellAlignment::Left,
        Align::Center => CellAlignment::Center,
        Align::Right => CellAlignment::Right,
    }
}

/// Render the current page of a view: visible columns in order, with a
/// row number column when the view shows one
pub fn render_page<R: Record>(view: &DataView<R>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let show_numbers = view
        .display_columns()
        .iter()
        .any(|c| c == ROW_NUMBER_COLUMN);
    let columns: Vec<&Column<R>> = view.columns().visible().collect();

    let mut headers = Vec::new();
    if show_numbers {
        headers.push(Cell::new(ROW_NUMBER_COLUMN).add_attribute(Attribute::Bold));
    }
    headers.extend(
        columns
            .iter()
            .map(|c| Cell::new(&c.header).add_attribute(Attribute::Bold)),
    );
    table.set_header(headers);

    for (index, row) in view.page_rows().into_iter().enumerate() {
        let mut cells = Vec::new();
        if show_numbers {
            cells.push(Cell::new(view.row_number(index)).set_alignment(CellAlignment::Right));
        }
        cells.extend(
            columns
                .iter()
                .map(|c| Cell::new(cell_text(c, row)).set_alignment(alignment(c.align))),
        );
        table.add_row(cells);
    }

    table
}
