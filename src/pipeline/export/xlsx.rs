use std::path::Path;

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook};

use super::table::{Cell, Table};
use super::ExportError;

/// `output_<YYYY-MM-DD_HH-MM>.xlsx`
pub fn export_filename(now: NaiveDateTime) -> String {
    format!("output_{}.xlsx", now.format("%Y-%m-%d_%H-%M"))
}

/// Write `table` as a single sheet: bold header row, one row per record.
pub fn write_xlsx(table: &Table, path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let header = Format::new().set_bold();

    for (index, name) in table.columns.iter().enumerate() {
        sheet.write_string_with_format(0, column(index)?, name, &header)?;
    }

    for (row_index, row) in table.rows.iter().enumerate() {
        let row_number = u32::try_from(row_index + 1)
            .map_err(|_| ExportError::TooLarge(format!("{} rows", table.rows.len())))?;
        for (index, cell) in row.iter().enumerate() {
            let col = column(index)?;
            match cell {
                Cell::Text(text) => sheet.write_string(row_number, col, text)?,
                Cell::Number(n) => sheet.write_number(row_number, col, *n)?,
                Cell::Bool(b) => sheet.write_boolean(row_number, col, *b)?,
            };
        }
    }

    workbook.save(path)?;
    tracing::info!(
        path = %path.display(),
        rows = table.rows.len(),
        columns = table.columns.len(),
        "Wrote spreadsheet"
    );
    Ok(())
}

fn column(index: usize) -> Result<u16, ExportError> {
    u16::try_from(index).map_err(|_| ExportError::TooLarge(format!("column {index}")))
}
