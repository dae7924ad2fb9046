//! Retry controller for stage calls.
//!
//! Wraps one external call in the bounded retry loop described by a
//! [`RetryPolicy`]. Transient failures are retried with jittered
//! exponential backoff; permanent failures surface immediately; running
//! out of attempts converts the last transient failure into a permanent
//! `retries_exhausted` stage failure, never a silent drop.

use std::future::Future;

use lemma_core::retry::RetryPolicy;
use lemma_core::stage::{FailureReason, Stage, StageFailure};

use crate::services::ServiceError;

/// Invoke `op` with retries. `op` receives the 1-based attempt number.
pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    stage: Stage,
    mut op: F,
) -> Result<T, StageFailure>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut last_error = String::new();

    for attempt in 1..=policy.max_attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(ServiceError::ScriptRejected(message)) => {
                return Err(StageFailure::new(stage, FailureReason::InvalidScript, message));
            }
            Err(ServiceError::Rejected(message)) => {
                return Err(StageFailure::new(
                    stage,
                    FailureReason::UpstreamRejected,
                    message,
                ));
            }
            Err(ServiceError::Transient(message)) => {
                tracing::warn!(
                    stage = %stage,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %message,
                    "Transient stage failure",
                );
                last_error = message;
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
            }
        }
    }

    Err(StageFailure::new(
        stage,
        FailureReason::RetriesExhausted,
        format!(
            "{} attempts failed; last error: {last_error}",
            policy.max_attempts
        ),
    ))
}
