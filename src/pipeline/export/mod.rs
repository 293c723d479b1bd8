//! Batch Reporter: records → normalized table → `.xlsx`.

pub mod table;
pub mod xlsx;

pub use table::*;
pub use xlsx::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table too large: {0}")]
    TooLarge(String),
}
