//! OpenAI-compatible completion backend.
//!
//! Works against the OpenAI chat completions API and any server that
//! speaks the same protocol. The schema hint is passed as a
//! `response_format: json_schema` payload so conforming servers constrain
//! their output to the target shape.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CompletionBackend, GenerateParams, RawOutput};
use crate::error::BackendError;
use crate::message::Message;
use crate::schema::SchemaHint;

/// Configuration for the OpenAI backend.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL for the API (defaults to OpenAI's API).
    pub base_url: String,
    /// Default model to use when the request does not name one.
    pub model: String,
    /// Optional organization ID.
    pub organization: Option<String>,
    /// HTTP client timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl OpenAIConfig {
    /// Default OpenAI API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    /// Creates a new configuration with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            model: Self::DEFAULT_MODEL.to_owned(),
            organization: None,
            timeout_secs: Some(120),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads from:
    /// - `OPENAI_API_KEY` - Required API key
    /// - `OPENAI_BASE_URL` - Optional base URL
    /// - `OPENAI_MODEL` - Optional default model
    /// - `OPENAI_ORGANIZATION` - Optional organization ID
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Auth`] if `OPENAI_API_KEY` is not set.
    pub fn from_env() -> Result<Self, BackendError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            BackendError::auth("openai", "OPENAI_API_KEY environment variable not set")
        })?;

        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_owned());
        let model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_owned());
        let organization = std::env::var("OPENAI_ORGANIZATION").ok();

        Ok(Self {
            api_key,
            base_url,
            model,
            organization,
            timeout_secs: Some(120),
        })
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the default model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

/// OpenAI chat completion request body.
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    response_format: WireResponseFormat,
}

/// OpenAI message format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireResponseFormat {
    JsonSchema { json_schema: Value },
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
    code: Option<String>,
}

/// OpenAI-compatible API client.
#[derive(Debug, Clone)]
pub struct OpenAI {
    config: Arc<OpenAIConfig>,
    client: Client,
}

impl OpenAI {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client cannot
    /// be constructed.
    pub fn new(config: OpenAIConfig) -> Result<Self, BackendError> {
        if config.api_key.is_empty() {
            return Err(BackendError::auth("openai", "API key is required"));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder
            .build()
            .map_err(|e| BackendError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Create a client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` is unset.
    pub fn from_env() -> Result<Self, BackendError> {
        Self::new(OpenAIConfig::from_env()?)
    }

    /// Get the default model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json");

        if let Some(org) = &self.config.organization {
            req = req.header("OpenAI-Organization", org);
        }

        req
    }

    fn build_body(
        &self,
        messages: &[Message],
        hint: &SchemaHint,
        params: &GenerateParams,
    ) -> ChatCompletionRequest {
        let model = if params.model.is_empty() {
            self.config.model.clone()
        } else {
            params.model.clone()
        };

        ChatCompletionRequest {
            model,
            messages: messages
                .iter()
                .map(|msg| WireMessage {
                    role: msg.role.as_str().to_owned(),
                    content: Some(msg.content.clone()),
                    tool_calls: None,
                })
                .collect(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            response_format: WireResponseFormat::JsonSchema {
                json_schema: serde_json::json!({
                    "name": hint.name,
                    "schema": hint.schema,
                    "strict": true,
                }),
            },
        }
    }

    fn parse_error(status: u16, body: &str) -> BackendError {
        if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
            let error = error_response.error;
            let code = error.code.unwrap_or_else(|| error.error_type.clone());

            return match status {
                401 => BackendError::auth("openai", error.message),
                429 => BackendError::rate_limited("openai"),
                _ => BackendError::provider_code("openai", code, error.message),
            };
        }

        BackendError::http_status(status, body.to_owned())
    }

    fn parse_response(response: ChatCompletionResponse) -> Result<RawOutput, BackendError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::response_format("at least one choice", "empty choices"))?;

        // A tool-call payload already carries structured JSON arguments.
        if let Some(call) = choice.message.tool_calls.and_then(|c| c.into_iter().next()) {
            let args: Value = serde_json::from_str(&call.function.arguments).map_err(|e| {
                BackendError::response_format("JSON tool-call arguments", e.to_string())
            })?;
            return Ok(RawOutput::ToolCall(args));
        }

        choice
            .message
            .content
            .map(RawOutput::Text)
            .ok_or_else(|| BackendError::response_format("text content", "empty message"))
    }
}

#[async_trait]
impl CompletionBackend for OpenAI {
    async fn complete(
        &self,
        messages: &[Message],
        hint: &SchemaHint,
        params: &GenerateParams,
    ) -> Result<RawOutput, BackendError> {
        let url = self.chat_url();
        let body = self.build_body(messages, hint, params);

        let response = self.build_request(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &error_text));
        }

        let response_text = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| {
                BackendError::response_format("valid chat completion response", e.to_string())
            })?;

        Self::parse_response(parsed)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldType, Schema};

    fn client() -> OpenAI {
        OpenAI::new(OpenAIConfig::new("test-key").with_model("gpt-4o-mini")).unwrap()
    }

    fn hint() -> SchemaHint {
        Schema::new("UserInfo")
            .field(Field::new("name", FieldType::String))
            .to_hint()
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = OpenAI::new(OpenAIConfig {
            api_key: String::new(),
            base_url: OpenAIConfig::DEFAULT_BASE_URL.to_owned(),
            model: OpenAIConfig::DEFAULT_MODEL.to_owned(),
            organization: None,
            timeout_secs: None,
        });
        assert!(matches!(err, Err(BackendError::Auth { .. })));
    }

    #[test]
    fn body_carries_schema_as_response_format() {
        let messages = vec![Message::user("Hey, I'm John Doe.")];
        let body = client().build_body(&messages, &hint(), &GenerateParams::default());

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["name"], "UserInfo");
        assert_eq!(json["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn request_model_overrides_default() {
        let params = GenerateParams {
            model: "gpt-4o".to_owned(),
            ..Default::default()
        };
        let body = client().build_body(&[Message::user("hi")], &hint(), &params);
        assert_eq!(body.model, "gpt-4o");
    }

    #[test]
    fn error_status_maps_to_variants() {
        let auth = OpenAI::parse_error(
            401,
            r#"{"error":{"message":"bad key","type":"invalid_request_error","code":null}}"#,
        );
        assert!(matches!(auth, BackendError::Auth { .. }));

        let limited = OpenAI::parse_error(
            429,
            r#"{"error":{"message":"slow down","type":"rate_limit_error","code":null}}"#,
        );
        assert!(matches!(limited, BackendError::RateLimited { .. }));

        let opaque = OpenAI::parse_error(500, "not json");
        assert!(matches!(opaque, BackendError::HttpStatus { status: 500, .. }));
    }

    #[test]
    fn tool_call_arguments_become_structured_output() {
        let response = ChatCompletionResponse {
            choices: vec![Choice {
                message: WireMessage {
                    role: "assistant".to_owned(),
                    content: None,
                    tool_calls: Some(vec![WireToolCall {
                        id: "call_1".to_owned(),
                        call_type: "function".to_owned(),
                        function: WireFunctionCall {
                            name: "UserInfo".to_owned(),
                            arguments: r#"{"name":"John Doe"}"#.to_owned(),
                        },
                    }]),
                },
            }],
        };

        let output = OpenAI::parse_response(response).unwrap();
        assert_eq!(
            output,
            RawOutput::ToolCall(serde_json::json!({ "name": "John Doe" }))
        );
    }

    #[test]
    fn empty_choices_is_a_format_error() {
        let err = OpenAI::parse_response(ChatCompletionResponse { choices: vec![] });
        assert!(matches!(err, Err(BackendError::ResponseFormat { .. })));
    }
}
