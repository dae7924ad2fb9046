//! Feedback enrichment.
//!
//! After aggregation produces the verdict and its deterministic
//! feedback, the pipeline asks the model for a short constructive
//! paragraph and appends it. Strictly best-effort: any failure keeps
//! the deterministic feedback, and the verdict is never touched.

use lemma_core::stage::Stage;
use lemma_core::submission::Submission;
use lemma_core::verdict::{Evaluation, Verdict};
use lemma_llm::prompts::TEMPLATE_FEEDBACK;

use crate::runner::{stage_key, SubmissionPipeline};

impl SubmissionPipeline {
    /// Append model-generated feedback to an evaluation, when possible.
    ///
    /// Skipped for `error` verdicts: there is nothing useful to say
    /// about a proof the pipeline never finished judging.
    pub(crate) async fn enrich_feedback(
        &self,
        submission: &Submission,
        evaluation: &mut Evaluation,
    ) {
        if evaluation.verdict == Verdict::Error {
            return;
        }

        let template = match self.template(Stage::Feedback, TEMPLATE_FEEDBACK).await {
            Ok(template) => template,
            Err(err) => {
                tracing::warn!(
                    submission_id = %submission.id,
                    error = %err,
                    "Feedback template unavailable, keeping deterministic feedback",
                );
                return;
            }
        };

        let validation_status = match evaluation.verdict {
            Verdict::Accepted => "passed",
            _ => "failed",
        };
        let errors = evaluation
            .report
            .as_ref()
            .map(|report| serde_json::json!(report.diagnostics).to_string())
            .unwrap_or_else(|| "[]".to_string());

        let prompt = template.compile(&[
            ("solution", &submission.proof_latex),
            ("validation_status", validation_status),
            ("errors", &errors),
        ]);
        let key = stage_key(submission.id, Stage::Feedback);

        // Single attempt: feedback is not worth a retry loop.
        match self.model.complete(&prompt, &key).await {
            Ok(text) if !text.trim().is_empty() => {
                self.trace(submission.id, &template, &prompt, &text).await;
                evaluation.feedback.push(text.trim().to_string());
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(
                    submission_id = %submission.id,
                    error = %err,
                    "Feedback generation failed, keeping deterministic feedback",
                );
            }
        }
    }
}
