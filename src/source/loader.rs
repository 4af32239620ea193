//! Table loading from exported files.
//!
//! Two formats are understood: delimited text (CSV) and the JSON shape
//! returned by spreadsheet value APIs, `{"values": [[...], ...]}`.

use super::Table;
use anyhow::{anyhow, bail, Context, Result};
use csv::ReaderBuilder;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Load a table, picking the format from the file extension.
pub fn load_table(path: &Path, delimiter: u8) -> Result<Table> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let table = if is_json {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;
        parse_json_table(&content)
            .with_context(|| format!("Failed to parse JSON table: {}", path.display()))?
    } else {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_path(path)
            .with_context(|| format!("Failed to open input file: {}", path.display()))?;
        read_csv(reader)
            .with_context(|| format!("Failed to parse CSV table: {}", path.display()))?
    };

    info!(
        "Loaded {} rows with {} columns from {}",
        table.rows.len(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Table> {
    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result?;
        grid.push(record.iter().map(String::from).collect::<Vec<_>>());
    }
    debug!("Read {} CSV lines", grid.len());
    Ok(Table::from_grid(grid))
}

/// Parse either `{"values": [[...]]}` or a bare array of rows.
pub fn parse_json_table(content: &str) -> Result<Table> {
    let value: Value = serde_json::from_str(content)?;

    let rows: &[Value] = match &value {
        Value::Object(map) => match map.get("values") {
            Some(Value::Array(rows)) => rows.as_slice(),
            // A sheet without data comes back without a `values` key.
            None => &[],
            Some(_) => bail!("`values` must be an array of rows"),
        },
        Value::Array(rows) => rows.as_slice(),
        _ => bail!("expected an object with `values` or an array of rows"),
    };

    let mut grid = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let cells = row
            .as_array()
            .ok_or_else(|| anyhow!("row {} is not an array", i + 1))?;
        grid.push(cells.iter().map(cell_text).collect::<Vec<_>>());
    }

    Ok(Table::from_grid(grid))
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
