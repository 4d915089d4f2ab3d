use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    /// Node.js bridge process failed to spawn (browser_server.js)
    #[error("Failed to spawn {script} (is Node.js installed?): {source}")]
    SubprocessSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from / writing to the bridge process failed
    #[error("Browser session I/O error: {0}")]
    SessionIO(String),

    /// Bridge answered a command with ok=false or an unexpected payload
    #[error("Browser command '{command}' failed: {error}")]
    SessionProtocol { command: String, error: String },

    /// JSON parsing failed (bridge output, model output, saved files)
    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization failed
    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Every navigation strategy failed for a URL
    #[error("Could not load {url}: {}", attempts.join("; "))]
    PageLoad { url: String, attempts: Vec<String> },

    /// A CSS selector could not be parsed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// The hosted model API is configured without a credential
    #[error("Missing API key: set {env_var} or pass --api-key")]
    MissingApiKey { env_var: &'static str },

    /// HTTP transport failure talking to a model backend
    #[error("Inference request to {endpoint} failed: {source}")]
    InferenceHttp {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Model backend answered with a non-success status or empty body
    #[error("Inference backend error ({status}): {body}")]
    InferenceStatus { status: u16, body: String },

    /// Filesystem operation failed
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file exists but could not be parsed
    #[error("Invalid config file {path}: {message}")]
    Config { path: String, message: String },

    /// Test script could not be executed
    #[error("Failed to run {script}: {message}")]
    ScriptExecution { script: String, message: String },
}

impl CrawlError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CrawlError::Io {
            path: path.into(),
            source,
        }
    }
}
