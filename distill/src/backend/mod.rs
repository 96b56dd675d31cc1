//! Completion backend abstraction.
//!
//! A [`CompletionBackend`] turns a conversation plus a schema hint into
//! raw model output. The extractor owns retry-on-validation-failure;
//! retry-on-backend-error, if desired, belongs to the backend itself.
//!
//! # Available backends
//!
//! - [`openai`] — OpenAI-compatible chat completions API
//! - [`mock`] — scripted responses for tests

pub mod mock;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendError;
use crate::message::Message;
use crate::schema::SchemaHint;

pub use mock::MockBackend;
pub use openai::{OpenAI, OpenAIConfig};

/// Sampling parameters for a completion call.
#[derive(Debug, Clone, Default)]
pub struct GenerateParams {
    /// Model identifier (e.g., "gpt-4o-mini"). Empty means the backend's
    /// default model.
    pub model: String,
    /// Sampling temperature (0.0 to 2.0).
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Caller-supplied per-call timeout. `None` means no timeout beyond
    /// whatever the backend's own client enforces.
    pub timeout: Option<Duration>,
}

/// Raw output of one completion call, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutput {
    /// Free-form text, expected to contain a JSON document.
    Text(String),
    /// A tool-call payload whose arguments already are structured JSON.
    ToolCall(Value),
}

impl RawOutput {
    /// Render the output as text for corrective feedback.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::ToolCall(args) => args.to_string(),
        }
    }
}

/// Trait for backends that can generate completions for an extraction
/// attempt.
///
/// Implementations must be safe for concurrent use; the extractor holds
/// no shared mutable state across calls.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Generate one completion for the given conversation and schema hint.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] for infrastructure failures (auth, rate
    /// limit, network, malformed provider response). These are surfaced
    /// to the extraction caller immediately, never retried here.
    async fn complete(
        &self,
        messages: &[Message],
        hint: &SchemaHint,
        params: &GenerateParams,
    ) -> Result<RawOutput, BackendError>;

    /// Name of this backend, used in error messages and logging.
    fn name(&self) -> &'static str;
}

/// Type alias for an Arc-wrapped backend.
pub type SharedBackend = Arc<dyn CompletionBackend>;
