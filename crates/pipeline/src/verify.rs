//! Verification stage: run the formal script through the proof checker.

use lemma_core::stage::{Stage, StageFailure};
use lemma_core::verdict::VerificationReport;
use uuid::Uuid;

use crate::retry::with_retries;
use crate::runner::{stage_key, SubmissionPipeline};

impl SubmissionPipeline {
    /// Check one formal script.
    ///
    /// An unreachable checker is transient and retried; a checker that
    /// rejects the script itself fails permanently with
    /// `invalid_script`. The report's validity policy lives in
    /// `lemma-checker`.
    pub(crate) async fn verify(
        &self,
        submission_id: Uuid,
        script: &str,
    ) -> Result<VerificationReport, StageFailure> {
        let key = stage_key(submission_id, Stage::Verification);
        with_retries(&self.retry, Stage::Verification, |_| {
            self.checker.check(script, &key)
        })
        .await
    }
}
