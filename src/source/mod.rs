//! Input tables and their conversion into records.
//!
//! A table is the raw grid exported from the performance spreadsheet: the
//! first row holds the headers, every other row maps positionally onto them.

pub mod columns;
pub mod loader;

pub use columns::{ColumnMapping, Field};
pub use loader::load_table;

use crate::models::Record;

/// Header row plus data rows, all as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Split a raw grid into headers and rows. An empty grid has neither.
    pub fn from_grid(mut grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return Self::default();
        }
        let headers = grid.remove(0);
        Self {
            headers,
            rows: grid,
        }
    }

    /// Convert every non-blank row into a record.
    pub fn records(&self, mapping: &ColumnMapping) -> Vec<Record> {
        self.rows
            .iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .map(|row| {
                let cell = |field: Field| {
                    mapping
                        .get(field)
                        .and_then(|i| row.get(i))
                        .map(String::as_str)
                };
                Record::new(
                    cell(Field::Business),
                    cell(Field::Campaign),
                    cell(Field::Quadrant),
                )
                .with_csat(cell(Field::Csat))
                .with_adherence(cell(Field::Adherence))
                .with_promoters(cell(Field::Promoters))
                .with_detractors(cell(Field::Detractors))
            })
            .collect()
    }
}
