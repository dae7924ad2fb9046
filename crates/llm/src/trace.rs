//! Best-effort generation tracing.
//!
//! Records each model call (prompt, raw output, template identity) with
//! the observability collaborator for audit. A failure to record is
//! logged and swallowed; observability must never fail the pipeline.

use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

/// One model generation to record.
#[derive(Debug, Serialize)]
pub struct GenerationRecord<'a> {
    /// Logical trace name, e.g. `latex_to_formal`.
    pub trace_name: &'a str,
    pub submission_id: Uuid,
    pub template_name: &'a str,
    pub template_version: i32,
    pub model: &'a str,
    pub input: &'a str,
    pub output: &'a str,
}

/// Sink posting generation records to the observability service.
pub struct TraceSink {
    http: Option<reqwest::Client>,
    base_url: String,
    api_key: String,
}

impl TraceSink {
    pub fn new(base_url: String, api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .ok();
        Self {
            http,
            base_url,
            api_key,
        }
    }

    /// A sink that records nothing. Used when tracing is unconfigured
    /// and in tests.
    pub fn disabled() -> Self {
        Self {
            http: None,
            base_url: String::new(),
            api_key: String::new(),
        }
    }

    /// Record one generation. Never returns an error.
    pub async fn record_generation(&self, record: GenerationRecord<'_>) {
        let Some(http) = &self.http else {
            return;
        };

        let result = http
            .post(format!("{}/api/v1/traces", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&record)
            .send()
            .await;

        match result {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(
                    trace_name = record.trace_name,
                    submission_id = %record.submission_id,
                    status = response.status().as_u16(),
                    "Observability service rejected trace",
                );
            }
            Err(err) => {
                tracing::warn!(
                    trace_name = record.trace_name,
                    submission_id = %record.submission_id,
                    error = %err,
                    "Failed to record trace",
                );
            }
            Ok(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_sink_is_a_no_op() {
        let sink = TraceSink::disabled();
        // Must return without attempting any I/O.
        sink.record_generation(GenerationRecord {
            trace_name: "latex_to_formal",
            submission_id: Uuid::now_v7(),
            template_name: "latex_to_formal",
            template_version: 1,
            model: "test-model",
            input: "in",
            output: "out",
        })
        .await;
    }
}
