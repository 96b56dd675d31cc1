//! Unified error types for structured extraction.
//!
//! Two distinct failure channels are kept apart so callers can tell
//! "the model produced invalid data after N tries" from "the backend
//! itself failed" without inspecting free-text messages:
//!
//! - [`ExtractError::ExhaustedRetries`] — the validation-retry budget ran
//!   out; carries the final violations and attempt count.
//! - [`ExtractError::Backend`] / [`ExtractError::BackendTimeout`] —
//!   infrastructure failures, surfaced immediately and never counted
//!   against the validation-retry budget.

use std::time::Duration;

use crate::validate::Violation;

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// The terminal error type for an extraction call.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExtractError {
    /// Completion backend failure (auth, rate limit, network, ...).
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// The backend call exceeded the caller-supplied timeout.
    #[error("Backend call timed out after {elapsed:?}")]
    BackendTimeout {
        /// The timeout that was exceeded.
        elapsed: Duration,
    },

    /// Every attempt produced output that failed validation.
    #[error("Output failed validation after {attempts} attempt(s): {}", format_violations(.violations))]
    ExhaustedRetries {
        /// Number of attempts actually made.
        attempts: u32,
        /// Violations from the final attempt.
        violations: Vec<Violation>,
        /// Raw backend output from the final attempt, if any.
        raw_output: Option<String>,
    },

    /// The request carried no messages to send.
    #[error("Conversation must contain at least one message")]
    EmptyConversation,
}

impl ExtractError {
    /// Returns `true` if this error came from the backend rather than
    /// from validation.
    #[must_use]
    pub const fn is_backend_failure(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::BackendTimeout { .. })
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error type for completion backend operations.
///
/// Each variant represents a distinct failure mode, enabling callers to
/// pattern-match on specific cases (e.g., retrying transient errors with
/// their own policy).
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum BackendError {
    /// Authentication or authorization failure.
    #[error("[{provider}] {message}")]
    Auth {
        /// Provider name (e.g., "openai").
        provider: String,
        /// Error description.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("[{provider}] Rate limit exceeded. Please retry after some time.")]
    RateLimited {
        /// Provider name.
        provider: String,
    },

    /// Response format error.
    #[error("Expected {expected}, got {got}")]
    ResponseFormat {
        /// Expected format description.
        expected: String,
        /// Actual format received.
        got: String,
    },

    /// Network or connection error.
    #[error("{0}")]
    Network(String),

    /// HTTP status error.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Provider-specific error.
    #[error("[{provider}] {message}")]
    Provider {
        /// Provider name.
        provider: String,
        /// Error description.
        message: String,
        /// Optional error code from the provider.
        code: Option<String>,
    },

    /// Internal error.
    #[error("{0}")]
    Internal(String),
}

impl BackendError {
    /// Create an authentication error.
    #[must_use]
    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Auth {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a rate limit error.
    #[must_use]
    pub fn rate_limited(provider: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
        }
    }

    /// Create a response format error.
    #[must_use]
    pub fn response_format(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::ResponseFormat {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create an HTTP status error.
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a provider-specific error.
    #[must_use]
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Create a provider error with an error code.
    #[must_use]
    pub fn provider_code(
        provider: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a transient error a caller might retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("Request timed out")
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {err}"))
        } else {
            Self::network(err.to_string())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_retries_lists_violations() {
        let err = ExtractError::ExhaustedRetries {
            attempts: 3,
            violations: vec![
                Violation::new("age", "must be positive"),
                Violation::new("address.street", "expected a string"),
            ],
            raw_output: None,
        };
        let text = err.to_string();
        assert!(text.contains("3 attempt(s)"));
        assert!(text.contains("age: must be positive"));
        assert!(text.contains("address.street: expected a string"));
    }

    #[test]
    fn backend_failures_are_distinguishable() {
        let backend = ExtractError::Backend(BackendError::rate_limited("openai"));
        let timeout = ExtractError::BackendTimeout {
            elapsed: Duration::from_secs(30),
        };
        let exhausted = ExtractError::ExhaustedRetries {
            attempts: 1,
            violations: vec![],
            raw_output: None,
        };

        assert!(backend.is_backend_failure());
        assert!(timeout.is_backend_failure());
        assert!(!exhausted.is_backend_failure());
    }

    #[test]
    fn retryable_classification() {
        assert!(BackendError::rate_limited("openai").is_retryable());
        assert!(BackendError::network("connection reset").is_retryable());
        assert!(!BackendError::auth("openai", "bad key").is_retryable());
        assert!(!BackendError::http_status(500, "oops").is_retryable());
    }
}
