//! Drives one claimed submission through the pipeline to a terminal
//! state.

use std::sync::Arc;

use lemma_core::aggregate::{aggregate, PipelineOutcome};
use lemma_core::progress::{PROGRESS_CONVERTED, PROGRESS_CONVERTING, PROGRESS_VERIFIED};
use lemma_core::retry::RetryPolicy;
use lemma_core::stage::{FailureReason, Stage, StageFailure};
use lemma_core::status::SubmissionStatus;
use lemma_core::store::{ProblemCatalog, StoreError, SubmissionStore};
use lemma_core::submission::Submission;
use lemma_core::verdict::Evaluation;
use lemma_llm::TraceSink;
use uuid::Uuid;

use crate::services::{ModelService, ProofChecker, TemplateStore};

/// Stage-scoped idempotency key, sent to external services so a
/// redelivered submission repeats the same request.
pub fn stage_key(submission_id: Uuid, stage: Stage) -> String {
    format!("{submission_id}:{stage}")
}

/// The evaluation pipeline with its external-service dependencies.
///
/// One instance is shared by every worker in the pool; all state lives
/// in the store.
pub struct SubmissionPipeline {
    pub(crate) model: Arc<dyn ModelService>,
    pub(crate) checker: Arc<dyn ProofChecker>,
    pub(crate) templates: Arc<dyn TemplateStore>,
    pub(crate) tracer: TraceSink,
    pub(crate) retry: RetryPolicy,
}

impl SubmissionPipeline {
    pub fn new(
        model: Arc<dyn ModelService>,
        checker: Arc<dyn ProofChecker>,
        templates: Arc<dyn TemplateStore>,
        tracer: TraceSink,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            model,
            checker,
            templates,
            tracer,
            retry,
        }
    }

    /// Process a freshly claimed submission to a terminal state.
    ///
    /// Stages run strictly sequentially. A lost claim (lease expired and
    /// the submission was redelivered) aborts quietly: the new holder
    /// owns the run. Store backend errors propagate so the worker can
    /// log them; the submission is then recovered by the lease sweep.
    pub async fn process(
        &self,
        store: &dyn SubmissionStore,
        catalog: &dyn ProblemCatalog,
        submission: &Submission,
    ) -> Result<(), StoreError> {
        let id = submission.id;

        if !advance(
            store,
            id,
            SubmissionStatus::Claimed,
            SubmissionStatus::Converting,
            PROGRESS_CONVERTING,
        )
        .await?
        {
            return Ok(());
        }

        // Problem statement for the conversion prompt.
        let problem = match catalog.find_problem(submission.problem_id).await? {
            Some(problem) => problem,
            None => {
                let failure = StageFailure::new(
                    Stage::Conversion,
                    FailureReason::ProblemNotFound,
                    format!("problem {} not found", submission.problem_id),
                );
                let evaluation = aggregate(&PipelineOutcome::ConversionFailed(failure));
                return finish(store, id, &evaluation, Terminal::Failed).await;
            }
        };

        // Guardrail: reject text that is not a proof attempt before
        // spending conversion and verification effort on it.
        match self.guardrail(submission).await {
            Ok(None) => {}
            Ok(Some(reason)) => {
                tracing::info!(submission_id = %id, reason = %reason, "Guardrail rejected submission");
                let evaluation = aggregate(&PipelineOutcome::GuardrailRejected { reason });
                return finish(store, id, &evaluation, Terminal::Completed).await;
            }
            Err(failure) => {
                tracing::warn!(submission_id = %id, error = %failure, "Guardrail stage failed");
                let evaluation = aggregate(&PipelineOutcome::ConversionFailed(failure));
                return finish(store, id, &evaluation, Terminal::Failed).await;
            }
        }

        // Conversion.
        let script = match self.convert(submission, &problem).await {
            Ok(script) => script,
            Err(failure) => {
                tracing::warn!(submission_id = %id, error = %failure, "Conversion stage failed");
                let evaluation = aggregate(&PipelineOutcome::ConversionFailed(failure));
                return finish(store, id, &evaluation, Terminal::Failed).await;
            }
        };

        if !advance(
            store,
            id,
            SubmissionStatus::Converting,
            SubmissionStatus::Verifying,
            PROGRESS_CONVERTED,
        )
        .await?
        {
            return Ok(());
        }

        // Verification.
        let report = match self.verify(id, &script).await {
            Ok(report) => report,
            Err(failure) => {
                tracing::warn!(submission_id = %id, error = %failure, "Verification stage failed");
                let evaluation = aggregate(&PipelineOutcome::VerificationFailed(failure));
                return finish(store, id, &evaluation, Terminal::Failed).await;
            }
        };

        match store.update_progress(id, PROGRESS_VERIFIED).await {
            Ok(()) => {}
            Err(StoreError::Conflict(message)) => {
                tracing::warn!(submission_id = %id, %message, "Claim lost, abandoning run");
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        let mut evaluation = aggregate(&PipelineOutcome::Verified(report));
        self.enrich_feedback(submission, &mut evaluation).await;

        tracing::info!(
            submission_id = %id,
            verdict = evaluation.verdict.as_str(),
            "Submission evaluated",
        );
        finish(store, id, &evaluation, Terminal::Completed).await
    }
}

enum Terminal {
    Completed,
    Failed,
}

/// Conditional stage transition. `Ok(false)` means the claim was lost
/// (redelivered to another worker); the caller stops without error.
async fn advance(
    store: &dyn SubmissionStore,
    id: Uuid,
    from: SubmissionStatus,
    to: SubmissionStatus,
    progress_floor: i16,
) -> Result<bool, StoreError> {
    match store.transition(id, from, to, progress_floor).await {
        Ok(()) => Ok(true),
        Err(StoreError::Conflict(message)) => {
            tracing::warn!(submission_id = %id, %message, "Claim lost, abandoning run");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// Record the terminal result. A conflict here means another worker
/// already terminated the submission after redelivery; that result
/// stands.
async fn finish(
    store: &dyn SubmissionStore,
    id: Uuid,
    evaluation: &Evaluation,
    terminal: Terminal,
) -> Result<(), StoreError> {
    let result = match terminal {
        Terminal::Completed => store.complete(id, evaluation).await,
        Terminal::Failed => store.fail(id, evaluation).await,
    };
    match result {
        Ok(()) => Ok(()),
        Err(StoreError::Conflict(message)) => {
            tracing::warn!(submission_id = %id, %message, "Terminal write lost to another worker");
            Ok(())
        }
        Err(err) => Err(err),
    }
}
