//! Load rows from JSON and CSV files

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use serde_json::{Map, Number, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Load a JSON file holding an array of objects
pub fn load_json_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Value>> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open JSON file: {:?}", path.as_ref()))?;
    let reader = BufReader::new(file);

    let data: Value = serde_json::from_reader(reader).with_context(|| "Failed to parse JSON file")?;
    let Value::Array(rows) = data else {
        bail!("JSON data must be an array of objects");
    };
    if let Some(position) = rows.iter().position(|row| !row.is_object()) {
        bail!("JSON array element {} is not an object", position);
    }

    info!(target: "view", "Loaded {} rows from {:?}", rows.len(), path.as_ref());
    Ok(rows)
}

/// Load a CSV file with a header row.
///
/// Cells are typed from their text (empty as null, then bool, integer,
/// float, string). Dotted headers such as `address.city` build nested
/// objects, so the rows flatten back into the same column paths.
pub fn load_csv_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Value>> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path.as_ref()))?;

    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read CSV record {}", line + 1))?;
        let mut row = Map::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            insert_path(&mut row, header, infer_cell(cell));
        }
        rows.push(Value::Object(row));
    }

    info!(target: "view", "Loaded {} rows from {:?}", rows.len(), path.as_ref());
    Ok(rows)
}

/// Pick a loader from the file extension
pub fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Value>> {
    let extension = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("json") => load_json_rows(path),
        Some("csv") => load_csv_rows(path),
        _ => bail!("Unsupported file type: {:?} (expected .json or .csv)", path.as_ref()),
    }
}

fn infer_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if cell.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if cell.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Some(n) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(cell.to_string())
}

fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        Some((head, rest)) if !head.is_empty() && !rest.is_empty() => {
            let child = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
        _ => {
            target.insert(path.to_string(), value);
        }
    }
}
