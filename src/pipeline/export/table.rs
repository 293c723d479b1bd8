use serde_json::Value;

use crate::models::BatchRecord;
use crate::pipeline::batch::title_case;

/// Placeholder for missing or blank cells.
pub const BLANK_CELL: &str = "-";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Rectangular view of a batch: one row per record, serial order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` in the named column.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }
}

/// Build the export table.
///
/// Columns are the union of all record keys in first-seen order. Missing,
/// null and whitespace-only values become `-`; lists are joined with `", "`;
/// nested objects are written as JSON; every text cell is then title-cased.
pub fn normalize_records(records: &[BatchRecord]) -> Table {
    let maps: Vec<_> = records.iter().map(BatchRecord::to_map).collect();

    let mut columns: Vec<String> = Vec::new();
    for map in &maps {
        for key in map.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = maps
        .iter()
        .map(|map| {
            columns
                .iter()
                .map(|column| normalize_cell(map.get(column)))
                .collect()
        })
        .collect();

    Table { columns, rows }
}

fn normalize_cell(value: Option<&Value>) -> Cell {
    let text = match value {
        None | Some(Value::Null) => return blank(),
        Some(Value::Bool(b)) => return Cell::Bool(*b),
        Some(Value::Number(n)) => {
            return match n.as_f64() {
                Some(f) => Cell::Number(f),
                None => text_cell(n.to_string()),
            }
        }
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Some(object @ Value::Object(_)) => object.to_string(),
    };
    text_cell(text)
}

fn text_cell(text: String) -> Cell {
    if text.trim().is_empty() {
        blank()
    } else {
        Cell::Text(title_case(&text))
    }
}

fn blank() -> Cell {
    Cell::Text(BLANK_CELL.to_string())
}
