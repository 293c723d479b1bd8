//! Batch orchestration: one directory of CVs in, one ordered list of records out.
//!
//! Documents are handled strictly one at a time. Each gets exactly one serial
//! number and exactly one record, and a fixed pause follows every document so
//! the LLM service never sees more than its configured request rate.

pub mod discovery;
pub mod pacing;
pub mod rename;
pub mod runner;

pub use discovery::*;
pub use pacing::*;
pub use rename::*;
pub use runner::*;

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::export::ExportError;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Directory '{}' does not exist", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
}
