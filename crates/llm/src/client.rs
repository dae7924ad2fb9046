//! HTTP client for the language-model service.
//!
//! Speaks the OpenAI-compatible chat-completions protocol. Every call
//! carries a stage-scoped idempotency key so a redelivered submission
//! repeats the same request rather than charging for a new one.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the language-model service.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: String,
    pub api_key: String,
    /// Model identifier passed through in every request.
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Build(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Model identifier this client sends requests for.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one prompt and return the completion text.
    ///
    /// Deterministic settings (temperature 0) so repeating a request
    /// under the same idempotency key yields the same conversion.
    pub async fn complete(
        &self,
        prompt: &str,
        idempotency_key: &str,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("Idempotency-Key", idempotency_key)
            .json(&request)
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status(status.as_u16()));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".into()))
    }
}

/// Errors from the language-model service.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The request exceeded its timeout.
    #[error("request timed out")]
    Timeout,

    /// The service could not be reached.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The service answered with a non-success HTTP status.
    #[error("service returned HTTP {0}")]
    Status(u16),

    /// The response body did not match the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The HTTP client could not be constructed.
    #[error("client build error: {0}")]
    Build(String),
}

impl LlmError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::InvalidResponse(err.to_string())
        }
    }

    /// Whether retrying could plausibly succeed: timeouts, connection
    /// failures, and 5xx statuses. Client errors (4xx) and malformed
    /// responses are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) => true,
            Self::Status(code) => *code >= 500,
            Self::InvalidResponse(_) | Self::Build(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        assert!(LlmError::Timeout.is_transient());
        assert!(LlmError::Connect("refused".into()).is_transient());
        assert!(LlmError::Status(500).is_transient());
        assert!(LlmError::Status(503).is_transient());
    }

    #[test]
    fn client_errors_are_permanent() {
        assert!(!LlmError::Status(400).is_transient());
        assert!(!LlmError::Status(401).is_transient());
        assert!(!LlmError::InvalidResponse("garbage".into()).is_transient());
    }
}
