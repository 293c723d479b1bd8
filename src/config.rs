use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "CV Extractor";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Gemini Flash free tier: 15 requests per minute.
pub const DEFAULT_REQUEST_LIMIT: u32 = 15;
pub const DEFAULT_TIME_WINDOW_SECS: u64 = 60;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_OLLAMA_MODEL: &str = "llama3";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    "cv_extractor=info,warn".to_string()
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Required environment variable '{0}' is not set")]
    MissingVar(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Which LLM service answers extraction prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }

    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::InvalidValue {
                key: "CVX_LLM_PROVIDER",
                reason: format!("unknown provider '{other}' (expected gemini or ollama)"),
            }),
        }
    }
}

/// Order in which documents are handed serial numbers.
///
/// `Listing` keeps whatever `read_dir` yields, which is not stable across
/// filesystems or runs. `ByName` gives reproducible serial numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryOrder {
    #[default]
    Listing,
    ByName,
}

/// Process-wide configuration, built once in `main` and passed down explicitly.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub provider: LlmProvider,
    pub api_key: Option<String>,
    pub model: String,
    pub llm_base_url: String,
    pub llm_timeout_secs: u64,
    /// Maximum LLM requests allowed per `time_window_secs`.
    pub request_limit: u32,
    pub time_window_secs: u64,
    pub ocr_lang: String,
    pub ocr_dpi: u32,
    pub tesseract_path: PathBuf,
    pub pdftoppm_path: PathBuf,
    pub soffice_path: PathBuf,
    pub discovery_order: DiscoveryOrder,
    pub output_dir: PathBuf,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            llm_base_url: DEFAULT_GEMINI_URL.to_string(),
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            request_limit: DEFAULT_REQUEST_LIMIT,
            time_window_secs: DEFAULT_TIME_WINDOW_SECS,
            ocr_lang: "eng".to_string(),
            ocr_dpi: 300,
            tesseract_path: PathBuf::from("tesseract"),
            pdftoppm_path: PathBuf::from("pdftoppm"),
            soffice_path: PathBuf::from("soffice"),
            discovery_order: DiscoveryOrder::Listing,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ExtractorConfig {
    /// Load configuration from the environment (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let provider = match get("CVX_LLM_PROVIDER") {
            Some(v) => LlmProvider::parse(&v)?,
            None => LlmProvider::Gemini,
        };

        let api_key = get("CVX_API_KEY").or_else(|| get("GEMINI_API_KEY"));
        if provider == LlmProvider::Gemini && api_key.is_none() {
            return Err(ConfigError::MissingVar("CVX_API_KEY"));
        }

        let (default_model, default_url) = match provider {
            LlmProvider::Gemini => (DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL),
            LlmProvider::Ollama => (DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL),
        };

        let request_limit = parse_or("CVX_REQUEST_LIMIT", get("CVX_REQUEST_LIMIT"), defaults.request_limit)?;
        if request_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CVX_REQUEST_LIMIT",
                reason: "must be at least 1".into(),
            });
        }

        let discovery_order = match get("CVX_SORT_DOCUMENTS") {
            Some(v) if parse_bool("CVX_SORT_DOCUMENTS", &v)? => DiscoveryOrder::ByName,
            _ => DiscoveryOrder::Listing,
        };

        Ok(Self {
            provider,
            api_key,
            model: get("CVX_MODEL").unwrap_or_else(|| default_model.to_string()),
            llm_base_url: get("CVX_LLM_BASE_URL").unwrap_or_else(|| default_url.to_string()),
            llm_timeout_secs: parse_or(
                "CVX_LLM_TIMEOUT_SECS",
                get("CVX_LLM_TIMEOUT_SECS"),
                defaults.llm_timeout_secs,
            )?,
            request_limit,
            time_window_secs: parse_or(
                "CVX_TIME_WINDOW_SECS",
                get("CVX_TIME_WINDOW_SECS"),
                defaults.time_window_secs,
            )?,
            ocr_lang: get("CVX_OCR_LANG").unwrap_or(defaults.ocr_lang),
            ocr_dpi: parse_or("CVX_OCR_DPI", get("CVX_OCR_DPI"), defaults.ocr_dpi)?,
            tesseract_path: get("CVX_TESSERACT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.tesseract_path),
            pdftoppm_path: get("CVX_PDFTOPPM_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.pdftoppm_path),
            soffice_path: get("CVX_SOFFICE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.soffice_path),
            discovery_order,
            output_dir: get("CVX_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        })
    }

    /// Fixed pause between documents: window length / request limit.
    pub fn min_delay(&self) -> Duration {
        Duration::from_secs(self.time_window_secs) / self.request_limit.max(1)
    }
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key,
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}
