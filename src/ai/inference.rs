use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CrawlError;

/// Environment variable holding the hosted model credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

// ============================================================================
// TextInference trait
// ============================================================================

/// Prompt in, raw model text out.
pub trait TextInference {
    fn infer_text(&self, prompt: &str) -> Result<String, CrawlError>;
}

impl<T: TextInference + ?Sized> TextInference for Box<T> {
    fn infer_text(&self, prompt: &str) -> Result<String, CrawlError> {
        (**self).infer_text(prompt)
    }
}

// ============================================================================
// OpenAI chat-completions backend
// ============================================================================

#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiBackend {
    /// Backend with default model settings. An empty key is rejected.
    pub fn new(api_key: Option<String>) -> Result<Self, CrawlError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(CrawlError::MissingApiKey {
                env_var: API_KEY_ENV,
            })?;

        Ok(Self {
            endpoint: DEFAULT_OPENAI_ENDPOINT.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            api_key,
            temperature: 0.3,
            max_tokens: 2500,
            timeout: Duration::from_secs(120),
        })
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

impl TextInference for OpenAiBackend {
    fn infer_text(&self, prompt: &str) -> Result<String, CrawlError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(model = %self.model, chars = prompt.len(), "chat completion request");

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|source| CrawlError::InferenceHttp {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let response = client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|source| CrawlError::InferenceHttp {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CrawlError::InferenceStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().map_err(|source| CrawlError::InferenceHttp {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .ok_or_else(|| CrawlError::InferenceStatus {
                status: status.as_u16(),
                body: "response contained no message content".to_string(),
            })
    }
}

// ============================================================================
// Ollama backend
// ============================================================================

#[derive(Debug, Clone)]
pub struct OllamaBackend {
    pub endpoint: String,
    pub model: String,
    /// Output constraint sent as `format`; `None` leaves the model free-form.
    pub format: Option<String>,
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "qwen2.5:1.5b".to_string(),
            format: Some("json".to_string()),
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaBackend {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            ..Self::default()
        }
    }

    /// Drop the JSON output constraint, for one-line answers.
    pub fn plain_text(mut self) -> Self {
        self.format = None;
        self
    }
}

impl TextInference for OllamaBackend {
    fn infer_text(&self, prompt: &str) -> Result<String, CrawlError> {
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: self.format.as_deref(),
        };

        let client = reqwest::blocking::Client::new();
        let response = client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|source| CrawlError::InferenceHttp {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::InferenceStatus {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let body: OllamaResponse = response.json().map_err(|source| CrawlError::InferenceHttp {
            endpoint: self.endpoint.clone(),
            source,
        })?;
        Ok(body.response)
    }
}

// ============================================================================
// Retry wrapper
// ============================================================================

/// Retries the wrapped backend with a linear backoff (`backoff * attempt`).
pub struct RetryingInference<T> {
    pub inner: T,
    pub attempts: u32,
    pub backoff: Duration,
}

impl<T: TextInference> RetryingInference<T> {
    pub fn new(inner: T, attempts: u32, backoff: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            backoff,
        }
    }
}

impl<T: TextInference> TextInference for RetryingInference<T> {
    fn infer_text(&self, prompt: &str) -> Result<String, CrawlError> {
        let mut attempt = 1;
        loop {
            match self.inner.infer_text(prompt) {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.attempts => {
                    warn!("inference attempt {}/{} failed: {}", attempt, self.attempts, e);
                    thread::sleep(self.backoff * attempt);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ============================================================================
// Mock backend (tests and offline runs)
// ============================================================================

pub struct MockTextInference {
    pub response: String,
}

impl MockTextInference {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
        }
    }
}

impl TextInference for MockTextInference {
    fn infer_text(&self, _prompt: &str) -> Result<String, CrawlError> {
        Ok(self.response.clone())
    }
}
