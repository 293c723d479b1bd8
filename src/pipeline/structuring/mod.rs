pub mod types;
pub mod prompt;
pub mod parser;
pub mod lenient;
pub mod gemini;
pub mod ollama;

pub use types::*;
pub use prompt::*;
pub use parser::*;
pub use lenient::*;
pub use gemini::*;
pub use ollama::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StructuringError {
    #[error("LLM service is not reachable at {0}")]
    Connection(String),

    #[error("LLM provider returned error (status {status}): {body}")]
    ProviderError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Unexpected LLM response: {0}")]
    ResponseShape(String),

    #[error("No API key configured for {0}")]
    MissingApiKey(&'static str),

    #[error("No dictionary-like object found in response")]
    NoObjectFound,

    #[error("Failed to parse dictionary: {0}")]
    Decode(String),
}

impl StructuringError {
    /// True for errors raised while reading the model's reply, as opposed to
    /// errors talking to the model.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::NoObjectFound | Self::Decode(_))
    }
}

/// Shared mapping of transport failures, used by every HTTP client.
pub(crate) fn map_send_error(e: reqwest::Error, base_url: &str, timeout_secs: u64) -> StructuringError {
    if e.is_connect() {
        StructuringError::Connection(base_url.to_string())
    } else if e.is_timeout() {
        StructuringError::HttpClient(format!("Request timed out after {timeout_secs}s"))
    } else {
        StructuringError::HttpClient(e.to_string())
    }
}

pub(crate) fn build_http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, StructuringError> {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| StructuringError::HttpClient(format!("Failed to create HTTP client: {e}")))
}
