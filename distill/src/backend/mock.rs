//! Mock backend implementation for testing.
//!
//! Returns predefined responses in sequence, useful for unit testing the
//! extraction loop without making real API calls.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{CompletionBackend, GenerateParams, RawOutput};
use crate::error::BackendError;
use crate::message::Message;
use crate::schema::SchemaHint;

/// A scripted backend for testing.
///
/// Serves its responses in sequence, cycling when exhausted, and records
/// the conversation length of each call so tests can assert on how the
/// extractor re-prompts.
#[derive(Debug, Default)]
pub struct MockBackend {
    responses: Vec<RawOutput>,
    cursor: AtomicUsize,
    seen_message_counts: Mutex<Vec<usize>>,
}

impl MockBackend {
    /// Create a mock backend serving the given text responses in order.
    #[must_use]
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: responses
                .into_iter()
                .map(|s| RawOutput::Text(s.into()))
                .collect(),
            cursor: AtomicUsize::new(0),
            seen_message_counts: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock backend serving arbitrary raw outputs.
    #[must_use]
    pub fn with_outputs(responses: Vec<RawOutput>) -> Self {
        Self {
            responses,
            cursor: AtomicUsize::new(0),
            seen_message_counts: Mutex::new(Vec::new()),
        }
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Conversation lengths observed per call.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn message_counts(&self) -> Vec<usize> {
        self.seen_message_counts
            .lock()
            .expect("mock lock poisoned")
            .clone()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(
        &self,
        messages: &[Message],
        _hint: &SchemaHint,
        _params: &GenerateParams,
    ) -> Result<RawOutput, BackendError> {
        self.seen_message_counts
            .lock()
            .map_err(|_| BackendError::internal("mock lock poisoned"))?
            .push(messages.len());

        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(index % self.responses.len().max(1))
            .cloned()
            .ok_or_else(|| BackendError::internal("mock backend has no responses"))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    #[tokio::test]
    async fn cycles_through_responses() {
        let backend = MockBackend::new(["first", "second"]);
        let hint = Schema::new("T").to_hint();
        let params = GenerateParams::default();
        let messages = vec![Message::user("hi")];

        for expected in ["first", "second", "first"] {
            let output = backend.complete(&messages, &hint, &params).await.unwrap();
            assert_eq!(output, RawOutput::Text(expected.to_owned()));
        }
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn records_conversation_lengths() {
        let backend = MockBackend::new(["{}"]);
        let hint = Schema::new("T").to_hint();
        let params = GenerateParams::default();

        let one = vec![Message::user("a")];
        let three = vec![
            Message::user("a"),
            Message::assistant("b"),
            Message::user("c"),
        ];
        backend.complete(&one, &hint, &params).await.unwrap();
        backend.complete(&three, &hint, &params).await.unwrap();

        assert_eq!(backend.message_counts(), vec![1, 3]);
    }
}
