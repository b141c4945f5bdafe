use std::time::Duration;
use thiserror::Error;

/// Error categorization for the acquisition and rendering pipeline
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (permanent failures)
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Credential error: {0}")]
    Credentials(#[from] envy::Error),

    // I/O errors (potentially transient)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors (usually permanent)
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    // Network errors (transient - should retry)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from a remote API
    #[error("{service} returned HTTP {status}: {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Rate limit exceeded: retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },

    #[error("Operation '{operation}' gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last_error: Box<Error>,
    },

    // Client errors (permanent - don't retry)
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    // Circuit breaker errors
    #[error("Circuit breaker open for service: {service}")]
    CircuitBreakerOpen { service: String },

    // Parse errors
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    /// Web page to PDF conversion failed
    #[error("PDF rendering failed for {url}: {reason}")]
    Render { url: String, reason: String },

    /// The generated script does not match the turn schema
    #[error("Script error: {0}")]
    Script(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("WAV export error: {0}")]
    Wav(#[from] hound::Error),
}

/// Error categorization for retry strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Permanent errors - should not retry
    Permanent,
    /// Transient errors - safe to retry
    Transient,
    /// Rate limited - retry with backoff
    RateLimited,
    /// Circuit breaker triggered - stop retrying temporarily
    CircuitBreaker,
}

impl Error {
    /// Categorize error for retry logic
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_)
            | Self::Credentials(_)
            | Self::InvalidInput { .. }
            | Self::Parse { .. }
            | Self::Serde(_)
            | Self::Script(_)
            | Self::Audio(_)
            | Self::Wav(_)
            | Self::RetriesExhausted { .. } => ErrorCategory::Permanent,

            Self::RateLimitExceeded { .. } => ErrorCategory::RateLimited,

            Self::CircuitBreakerOpen { .. } => ErrorCategory::CircuitBreaker,

            Self::Api { status, .. } => match *status {
                429 => ErrorCategory::RateLimited,
                400..=499 => ErrorCategory::Permanent,
                _ => ErrorCategory::Transient,
            },

            Self::Http(_)
            | Self::Io(_)
            | Self::Render { .. }
            | Self::Synthesis(_) => ErrorCategory::Transient,
        }
    }

    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transient | ErrorCategory::RateLimited
        )
    }

    /// Get suggested retry delay for rate limited errors
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Check if error indicates a need for circuit breaker
    #[must_use]
    pub fn should_trigger_circuit_breaker(&self) -> bool {
        match self {
            Self::RateLimitExceeded { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
