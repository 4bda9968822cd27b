//! Error types for the paperboy pipeline.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering the LLM, fetch, configuration, state, and output domains.

use std::path::PathBuf;

/// Top-level error type for the paperboy core library.
#[derive(Debug, thiserror::Error)]
pub enum PaperboyError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from paper-source queries.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request to {source_name} failed: {message}")]
    Request { source_name: String, message: String },

    #[error("{source_name} returned HTTP {status}")]
    Status { source_name: String, status: u16 },

    #[error("Failed to parse {source_name} response: {message}")]
    Parse { source_name: String, message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from run-state persistence.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to write state file {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },
}

/// Errors from report delivery.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to write report {path}: {message}")]
    ReportWrite { path: PathBuf, message: String },

    #[error("Email send failed: {message}")]
    MailSend { message: String },
}

/// A type alias for results using the top-level `PaperboyError`.
pub type Result<T> = std::result::Result<T, PaperboyError>;
