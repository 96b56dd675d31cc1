//! The retrying structured-extraction core.
//!
//! [`Extractor::extract`] renders a [`Schema`] into a backend hint,
//! issues one completion call per attempt, parses and validates the
//! output, and on failure re-prompts the model with corrective feedback
//! until the output validates or the attempt budget runs out.
//!
//! Each call is independent and stateless: nothing is cached, no
//! conversation state is retained past the call, and concurrent callers
//! share nothing but the backend client.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{CompletionBackend, GenerateParams, RawOutput, SharedBackend};
use crate::error::{ExtractError, Result};
use crate::message::Message;
use crate::schema::Schema;
use crate::validate::{ROOT_PATH, ValidationOutcome, Violation, validate};

/// Default number of attempts when the request does not set one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// An immutable extraction request: target schema, conversation, sampling
/// parameters, and retry budget.
///
/// `max_attempts` counts total attempts, not retries; both `0` and `1`
/// mean a single attempt with no retry, so validation errors surface
/// immediately.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    /// The target record definition.
    pub schema: Schema,
    /// Ordered conversation; must be non-empty.
    pub messages: Vec<Message>,
    /// Sampling parameters forwarded to the backend.
    pub params: GenerateParams,
    /// Attempt budget.
    pub max_attempts: u32,
}

impl ExtractRequest {
    /// Create a new request for the given schema.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            messages: Vec::new(),
            params: GenerateParams::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Add a system message.
    #[must_use]
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    /// Add a user message.
    #[must_use]
    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Add a message.
    #[must_use]
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Set all messages.
    #[must_use]
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    /// Set the model identifier.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.params.model = model.into();
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.params.temperature = Some(temperature);
        self
    }

    /// Set nucleus sampling.
    #[must_use]
    pub const fn top_p(mut self, top_p: f32) -> Self {
        self.params.top_p = Some(top_p);
        self
    }

    /// Set the maximum tokens to generate.
    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.params.max_tokens = Some(max_tokens);
        self
    }

    /// Set the per-call backend timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.params.timeout = Some(timeout);
        self
    }

    /// Set the attempt budget.
    #[must_use]
    pub const fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// A validated extraction result.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The normalized instance; satisfies every constraint declared on
    /// the schema.
    pub value: Value,
    /// Number of attempts it took.
    pub attempts: u32,
}

impl Extraction {
    /// Deserialize the validated instance into a concrete Rust type.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the instance does not map onto `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.value.clone())
    }
}

/// Structured extractor over a completion backend.
#[derive(Clone)]
pub struct Extractor {
    backend: SharedBackend,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Extractor {
    /// Create an extractor over the given backend.
    #[must_use]
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// Create an extractor from a concrete backend value.
    #[must_use]
    pub fn from_backend(backend: impl CompletionBackend + 'static) -> Self {
        Self::new(Arc::new(backend))
    }

    /// Run the validate-and-retry extraction loop.
    ///
    /// Returns a validated [`Extraction`] on success. Backend failures
    /// and timeouts surface immediately as [`ExtractError::Backend`] and
    /// [`ExtractError::BackendTimeout`]; they never consume validation
    /// attempts. When every attempt produces invalid output the call
    /// ends in [`ExtractError::ExhaustedRetries`].
    ///
    /// # Errors
    ///
    /// See [`ExtractError`] for the full taxonomy.
    pub async fn extract(&self, request: &ExtractRequest) -> Result<Extraction> {
        if request.messages.is_empty() {
            return Err(ExtractError::EmptyConversation);
        }

        let hint = request.schema.to_hint();
        let budget = request.max_attempts.max(1);
        let mut conversation = request.messages.clone();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(
                backend = self.backend.name(),
                schema = %request.schema.name,
                attempt,
                budget,
                "requesting completion"
            );

            let call = self.backend.complete(&conversation, &hint, &request.params);
            let raw = match request.params.timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| ExtractError::BackendTimeout { elapsed: limit })??,
                None => call.await?,
            };

            let outcome = match parse_candidate(&raw) {
                Ok(candidate) => validate(&request.schema, &candidate),
                Err(violation) => ValidationOutcome::Invalid(vec![violation]),
            };

            match outcome {
                ValidationOutcome::Valid(value) => {
                    debug!(attempt, "extraction validated");
                    return Ok(Extraction { value, attempts: attempt });
                }
                ValidationOutcome::Invalid(violations) => {
                    warn!(
                        attempt,
                        violations = violations.len(),
                        "attempt failed validation"
                    );

                    if attempt >= budget {
                        return Err(ExtractError::ExhaustedRetries {
                            attempts: attempt,
                            violations,
                            raw_output: Some(raw.as_text()),
                        });
                    }

                    conversation.extend(corrective_feedback(&raw.as_text(), &violations));
                }
            }
        }
    }
}

/// Parse raw backend output into a JSON candidate.
///
/// Malformed output is a validation-channel failure (retried like any
/// other violation), not a backend error.
fn parse_candidate(raw: &RawOutput) -> std::result::Result<Value, Violation> {
    match raw {
        RawOutput::ToolCall(args) => Ok(args.clone()),
        RawOutput::Text(text) => serde_json::from_str(strip_code_fences(text)).map_err(|e| {
            Violation::new(ROOT_PATH, format!("response was not valid JSON: {e}"))
        }),
    }
}

/// Strip a single outer markdown code fence, if present.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

/// Build the corrective follow-up for a failed attempt: the prior raw
/// output as an assistant turn, then a user message enumerating every
/// violated field. Pure function of its inputs.
#[must_use]
pub fn corrective_feedback(raw: &str, violations: &[Violation]) -> [Message; 2] {
    let mut feedback = String::from(
        "The previous response failed validation. Fix the following issues and \
         respond again with a single JSON object matching the schema:\n",
    );
    for violation in violations {
        feedback.push_str("- ");
        feedback.push_str(&violation.path);
        feedback.push_str(": ");
        feedback.push_str(&violation.message);
        feedback.push('\n');
    }

    [Message::assistant(raw), Message::user(feedback)]
}
