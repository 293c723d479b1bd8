//! BatchRunner: drives one directory through extract → model → parse → record.
//!
//! Runs sequentially (one LLM call at a time); the pause after every document
//! is the only rate control.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime};

use super::discovery::discover_documents;
use super::pacing::Pacer;
use super::rename::rename_after_candidate;
use super::BatchError;
use crate::config::{DiscoveryOrder, ExtractorConfig};
use crate::models::{BatchRecord, Document, ErrorRecord};
use crate::pipeline::export::{export_filename, normalize_records, write_xlsx};
use crate::pipeline::extraction::TextExtractor;
use crate::pipeline::structuring::{parse_candidate_response, request_candidate_fields, LlmClient};

/// Progress notifications, emitted in processing order.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    Processing {
        serial_no: u32,
        file_name: String,
    },
    Recorded {
        serial_no: u32,
    },
    Failed {
        serial_no: u32,
        error: String,
    },
    Renamed {
        serial_no: u32,
        from: String,
        to: String,
    },
    RenameFailed {
        serial_no: u32,
        error: String,
    },
    Pausing {
        delay: Duration,
    },
    Completed {
        records: usize,
        failures: usize,
    },
}

/// Everything one run produced, records in serial order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<BatchRecord>,
    pub renamed: Vec<(PathBuf, PathBuf)>,
    pub failures: usize,
}

impl BatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write `output_<timestamp>.xlsx` into `output_dir`. `None` when there is
    /// nothing to write.
    pub fn export(&self, output_dir: &Path, now: NaiveDateTime) -> Result<Option<PathBuf>, BatchError> {
        if self.is_empty() {
            return Ok(None);
        }
        let table = normalize_records(&self.records);
        let path = output_dir.join(export_filename(now));
        write_xlsx(&table, &path)?;
        Ok(Some(path))
    }
}

/// Result of handling a single document.
struct DocumentOutcome {
    record: BatchRecord,
    renamed: Option<Result<PathBuf, String>>,
}

/// Orchestrates a full extraction batch run.
pub struct BatchRunner {
    extractor: Box<dyn TextExtractor + Send + Sync>,
    llm: Box<dyn LlmClient + Send + Sync>,
    pacer: Box<dyn Pacer + Send + Sync>,
    model: String,
    delay: Duration,
    order: DiscoveryOrder,
    today: Option<NaiveDate>,
}

impl BatchRunner {
    pub fn new(
        extractor: Box<dyn TextExtractor + Send + Sync>,
        llm: Box<dyn LlmClient + Send + Sync>,
        pacer: Box<dyn Pacer + Send + Sync>,
        config: &ExtractorConfig,
    ) -> Self {
        Self {
            extractor,
            llm,
            pacer,
            model: config.model.clone(),
            delay: config.min_delay(),
            order: config.discovery_order,
            today: None,
        }
    }

    /// Pin the InsertDate used for prompts and error records.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn run(&self, dir: &Path) -> Result<BatchOutcome, BatchError> {
        self.run_with_progress(dir, &|_| {})
    }

    /// Process every supported document in `dir`. Fails only when `dir` is
    /// not a readable directory; per-document problems become error records.
    pub fn run_with_progress(
        &self,
        dir: &Path,
        progress: &dyn Fn(BatchEvent),
    ) -> Result<BatchOutcome, BatchError> {
        let documents = discover_documents(dir, self.order)?;
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());

        tracing::info!(
            dir = %dir.display(),
            documents = documents.len(),
            delay_ms = self.delay.as_millis() as u64,
            "Starting batch"
        );
        progress(BatchEvent::Started {
            total: documents.len(),
        });

        let mut outcome = BatchOutcome::default();

        for document in &documents {
            let serial_no = document.serial_no;
            progress(BatchEvent::Processing {
                serial_no,
                file_name: document.file_name(),
            });

            let handled = catch_unwind(AssertUnwindSafe(|| self.process_document(document, today)))
                .unwrap_or_else(|panic| {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(serial = serial_no, panic = %message, "Document handling panicked");
                    DocumentOutcome {
                        record: error_record(today, serial_no, format!("Unexpected failure: {message}")),
                        renamed: None,
                    }
                });

            match &handled.record {
                BatchRecord::Error(e) => {
                    outcome.failures += 1;
                    progress(BatchEvent::Failed {
                        serial_no,
                        error: e.error.clone(),
                    });
                }
                BatchRecord::Candidate { .. } => progress(BatchEvent::Recorded { serial_no }),
            }
            outcome.records.push(handled.record);

            match handled.renamed {
                Some(Ok(target)) => {
                    progress(BatchEvent::Renamed {
                        serial_no,
                        from: document.file_name(),
                        to: file_name_of(&target),
                    });
                    outcome.renamed.push((document.path.clone(), target));
                }
                Some(Err(error)) => progress(BatchEvent::RenameFailed { serial_no, error }),
                None => {}
            }

            progress(BatchEvent::Pausing { delay: self.delay });
            self.pacer.pause(self.delay);
        }

        tracing::info!(
            records = outcome.records.len(),
            failures = outcome.failures,
            renamed = outcome.renamed.len(),
            "Batch complete"
        );
        progress(BatchEvent::Completed {
            records: outcome.records.len(),
            failures: outcome.failures,
        });

        Ok(outcome)
    }

    fn process_document(&self, document: &Document, today: NaiveDate) -> DocumentOutcome {
        let serial_no = document.serial_no;
        let text = self.extractor.extract(document);
        let reply = request_candidate_fields(
            self.llm.as_ref(),
            &self.model,
            &text.as_prompt_text(),
            serial_no,
            today,
        );

        // A failed call carries the provider's error body, which may itself be JSON
        if reply.is_failure() {
            return DocumentOutcome {
                record: error_record(today, serial_no, format!("Parse failed: {}", reply.as_text())),
                renamed: None,
            };
        }

        let record = match parse_candidate_response(&reply.as_text()) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    serial = serial_no,
                    file = %document.file_name(),
                    error = %e,
                    "Error parsing model response"
                );
                return DocumentOutcome {
                    record: error_record(today, serial_no, format!("Parse failed: {e}")),
                    renamed: None,
                };
            }
        };

        let renamed = match record.name() {
            Some(name) if document.is_pdf() => match rename_after_candidate(&document.path, name) {
                Ok(Some(target)) => Some(Ok(target)),
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(
                        serial = serial_no,
                        path = %document.path.display(),
                        error = %e,
                        "Rename failed, keeping original name"
                    );
                    Some(Err(e.to_string()))
                }
            },
            _ => None,
        };

        DocumentOutcome {
            record: BatchRecord::Candidate { serial_no, record },
            renamed,
        }
    }
}

fn error_record(today: NaiveDate, serial_no: u32, error: String) -> BatchRecord {
    BatchRecord::Error(ErrorRecord {
        insert_date: today,
        serial_no,
        error,
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_string())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
