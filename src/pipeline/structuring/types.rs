use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::NaiveDate;

use super::gemini::GeminiClient;
use super::ollama::OllamaClient;
use super::prompt::build_candidate_prompt;
use super::StructuringError;
use crate::config::{ExtractorConfig, LlmProvider};

/// Text-generation backend (allows mocking for tests)
pub trait LlmClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, StructuringError>;
}

impl<C: LlmClient + ?Sized> LlmClient for std::sync::Arc<C> {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, StructuringError> {
        (**self).generate(model, prompt)
    }
}

/// Reply of one model call. Call failures are carried as a value, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    Text(String),
    Failed(String),
}

impl ModelReply {
    /// Text handed to the response parser; failures read `Error from model: <cause>`.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text.as_str()),
            Self::Failed(cause) => Cow::Owned(format!("Error from model: {cause}")),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Ask the model for the candidate fields of one document.
pub fn request_candidate_fields(
    client: &dyn LlmClient,
    model: &str,
    document_text: &str,
    serial_no: u32,
    today: NaiveDate,
) -> ModelReply {
    let prompt = build_candidate_prompt(document_text, serial_no, today);
    match client.generate(model, &prompt) {
        Ok(text) => {
            tracing::debug!(serial = serial_no, reply_length = text.len(), "Model replied");
            ModelReply::Text(text)
        }
        Err(e) => {
            tracing::warn!(serial = serial_no, error = %e, "Model call failed");
            ModelReply::Failed(e.to_string())
        }
    }
}

/// Build the client selected by configuration.
pub fn build_llm_client(
    config: &ExtractorConfig,
) -> Result<Box<dyn LlmClient + Send + Sync>, StructuringError> {
    match config.provider {
        LlmProvider::Gemini => {
            let api_key = config
                .api_key
                .as_deref()
                .ok_or(StructuringError::MissingApiKey("gemini"))?;
            Ok(Box::new(GeminiClient::new(
                &config.llm_base_url,
                api_key,
                config.llm_timeout_secs,
            )?))
        }
        LlmProvider::Ollama => Ok(Box::new(OllamaClient::new(
            &config.llm_base_url,
            config.llm_timeout_secs,
        )?)),
    }
}

/// Mock LLM client for testing: scripted replies in call order.
pub struct MockLlmClient {
    replies: Mutex<Vec<Result<String, String>>>,
    fallback: Result<String, String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    /// Returns the same reply for every call.
    pub fn new(response: &str) -> Self {
        Self::with_fallback(Ok(response.to_string()))
    }

    /// Every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self::with_fallback(Err(message.to_string()))
    }

    /// Replies taken in order; the last one repeats once the script runs out.
    pub fn scripted(replies: Vec<Result<&str, &str>>) -> Self {
        let mut replies: Vec<Result<String, String>> = replies
            .into_iter()
            .map(|r| r.map(str::to_string).map_err(str::to_string))
            .collect();
        let fallback = replies
            .last()
            .cloned()
            .unwrap_or_else(|| Ok(String::new()));
        replies.reverse();
        let mut client = Self::with_fallback(fallback);
        client.replies = Mutex::new(replies);
        client
    }

    fn with_fallback(fallback: Result<String, String>) -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            fallback,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, _model: &str, prompt: &str) -> Result<String, StructuringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop())
            .unwrap_or_else(|| self.fallback.clone());
        next.map_err(StructuringError::HttpClient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn mock_client_returns_configured_response() {
        let client = MockLlmClient::new("test response");
        assert_eq!(client.generate("model", "prompt").unwrap(), "test response");
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn scripted_replies_in_order_then_repeat_last() {
        let client = MockLlmClient::scripted(vec![Ok("one"), Err("quota"), Ok("three")]);
        assert_eq!(client.generate("m", "p").unwrap(), "one");
        assert!(client.generate("m", "p").is_err());
        assert_eq!(client.generate("m", "p").unwrap(), "three");
        assert_eq!(client.generate("m", "p").unwrap(), "three");
    }

    #[test]
    fn request_embeds_serial_and_text_in_prompt() {
        let client = MockLlmClient::new("{}");
        let reply = request_candidate_fields(&client, "m", "Jane Smith CV", 4, today());
        assert_eq!(reply, ModelReply::Text("{}".into()));

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Jane Smith CV"));
        assert!(prompts[0].contains("SerialNo = 4"));
        assert!(prompts[0].contains("InsertDate = 2025-06-01"));
    }

    #[test]
    fn call_failure_becomes_text() {
        let client = MockLlmClient::failing("quota exceeded");
        let reply = request_candidate_fields(&client, "m", "text", 1, today());
        assert!(reply.is_failure());
        assert_eq!(
            reply.as_text(),
            "Error from model: HTTP client error: quota exceeded"
        );
    }

    #[test]
    fn gemini_without_key_is_rejected() {
        let config = ExtractorConfig::default();
        assert!(matches!(
            build_llm_client(&config),
            Err(StructuringError::MissingApiKey("gemini"))
        ));
    }

    #[test]
    fn builds_configured_provider() {
        let mut config = ExtractorConfig::default();
        config.api_key = Some("k".into());
        assert!(build_llm_client(&config).is_ok());

        config.provider = LlmProvider::Ollama;
        config.api_key = None;
        config.llm_base_url = "http://localhost:11434".into();
        assert!(build_llm_client(&config).is_ok());
    }
}
