//! HTTP client for the proof-checker service.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the proof-checker service.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Base URL, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Per-request timeout. Checking a script can take a while.
    pub timeout: Duration,
}

/// Client for the proof-checker service.
pub struct CheckerClient {
    http: reqwest::Client,
    config: CheckerConfig,
}

#[derive(Serialize)]
struct CheckRequest<'a> {
    code: &'a str,
}

/// Raw response from a check run.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckerResponse {
    pub success: bool,
    #[serde(default)]
    pub diagnostics: Vec<RawDiagnostic>,
}

/// One diagnostic as reported by the checker.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDiagnostic {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    #[serde(default = "default_severity")]
    pub severity: String,
}

fn default_severity() -> String {
    "error".to_string()
}

impl CheckerClient {
    pub fn new(config: CheckerConfig) -> Result<Self, CheckerError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CheckerError::Build(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Run the checker over one formal script.
    ///
    /// A `success = false` response with diagnostics is a normal result
    /// (the proof did not verify); only transport and HTTP-level
    /// problems surface as errors here.
    pub async fn check(
        &self,
        script: &str,
        idempotency_key: &str,
    ) -> Result<CheckerResponse, CheckerError> {
        let response = self
            .http
            .post(format!("{}/check", self.config.base_url))
            .header("Idempotency-Key", idempotency_key)
            .json(&CheckRequest { code: script })
            .send()
            .await
            .map_err(CheckerError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckerError::Status(status.as_u16()));
        }

        response
            .json::<CheckerResponse>()
            .await
            .map_err(|e| CheckerError::InvalidResponse(e.to_string()))
    }
}

/// Errors from the proof-checker service.
#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("service returned HTTP {0}")]
    Status(u16),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("client build error: {0}")]
    Build(String),
}

impl CheckerError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::InvalidResponse(err.to_string())
        }
    }

    /// Whether retrying could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) => true,
            Self::Status(code) => *code >= 500,
            Self::InvalidResponse(_) | Self::Build(_) => false,
        }
    }

    /// Whether the service rejected the script itself (as opposed to
    /// failing to run). Maps to the `invalid_script` failure reason.
    pub fn is_script_rejection(&self) -> bool {
        matches!(self, Self::Status(400) | Self::Status(422))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parses_with_defaults() {
        let response: CheckerResponse = serde_json::from_str(
            r#"{"success": false, "diagnostics": [{"message": "type mismatch", "line": 3, "column": 10}]}"#,
        )
        .unwrap();
        assert!(!response.success);
        assert_eq!(response.diagnostics[0].severity, "error");
        assert_eq!(response.diagnostics[0].line, Some(3));
    }

    #[test]
    fn response_without_diagnostics_parses() {
        let response: CheckerResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(response.success);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn script_rejection_is_permanent() {
        assert!(CheckerError::Status(422).is_script_rejection());
        assert!(!CheckerError::Status(422).is_transient());
        assert!(!CheckerError::Status(503).is_script_rejection());
        assert!(CheckerError::Status(503).is_transient());
    }
}
