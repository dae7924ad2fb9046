//! Guardrail and conversion stages.
//!
//! Both stages talk to the language-model service with prompts compiled
//! from named, versioned templates. Conversion output is validated for
//! formal-script shape before the checker ever sees it.

use std::sync::LazyLock;

use lemma_core::stage::{FailureReason, Stage, StageFailure};
use lemma_core::submission::{Problem, Submission};
use lemma_llm::prompts::{TEMPLATE_GUARDRAIL, TEMPLATE_LATEX_TO_FORMAL};
use lemma_llm::{GenerationRecord, PromptTemplate};
use regex::Regex;
use uuid::Uuid;

use crate::retry::with_retries;
use crate::runner::{stage_key, SubmissionPipeline};

/// A plausible formal script must contain at least one top-level
/// declaration.
static DECLARATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(theorem|lemma|example|def|abbrev|instance)\b").expect("valid regex")
});

/// Validate and normalise raw model output into a formal script.
///
/// Strips a surrounding Markdown code fence if present, then requires
/// non-empty text with a recognisable top-level declaration. Returns
/// `None` for anything else.
pub fn validate_formal_script(raw: &str) -> Option<String> {
    let cleaned = strip_code_fence(raw.trim()).trim();
    if cleaned.is_empty() || !DECLARATION_RE.is_match(cleaned) {
        return None;
    }
    Some(cleaned.to_string())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the fence line (which may carry a language tag) and the
    // closing fence.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => return text,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body)
}

impl SubmissionPipeline {
    /// Fetch a template, mapping provider failures to a stage failure.
    pub(crate) async fn template(
        &self,
        stage: Stage,
        name: &str,
    ) -> Result<PromptTemplate, StageFailure> {
        self.templates.get(name).await.map_err(|err| {
            StageFailure::new(
                stage,
                FailureReason::TemplateMissing,
                format!("template '{name}': {err}"),
            )
        })
    }

    /// Best-effort generation trace.
    pub(crate) async fn trace(
        &self,
        submission_id: Uuid,
        template: &PromptTemplate,
        input: &str,
        output: &str,
    ) {
        self.tracer
            .record_generation(GenerationRecord {
                trace_name: &template.name,
                submission_id,
                template_name: &template.name,
                template_version: template.version,
                model: self.model.model(),
                input,
                output,
            })
            .await;
    }

    /// Ask the model whether the text is a genuine proof attempt.
    ///
    /// Returns `Some(reason)` when the submission should be rejected
    /// without conversion, `None` when it may proceed.
    pub(crate) async fn guardrail(
        &self,
        submission: &Submission,
    ) -> Result<Option<String>, StageFailure> {
        let template = self.template(Stage::Guardrail, TEMPLATE_GUARDRAIL).await?;
        let prompt = template.compile(&[("solution", &submission.proof_latex)]);
        let key = stage_key(submission.id, Stage::Guardrail);

        let output = with_retries(&self.retry, Stage::Guardrail, |_| {
            self.model.complete(&prompt, &key)
        })
        .await?;
        self.trace(submission.id, &template, &prompt, &output).await;

        let verdict = output.trim();
        if verdict.starts_with("VALID") {
            Ok(None)
        } else if let Some(reason) = verdict.strip_prefix("INVALID") {
            let reason = reason.trim_start_matches(':').trim();
            Ok(Some(if reason.is_empty() {
                "the text does not appear to be a mathematical proof".to_string()
            } else {
                reason.to_string()
            }))
        } else {
            // The guardrail itself answered off-protocol; reject rather
            // than pass unvetted text to conversion.
            Ok(Some("Unable to validate submission format".to_string()))
        }
    }

    /// Convert the LaTeX proof into a formal script.
    pub(crate) async fn convert(
        &self,
        submission: &Submission,
        problem: &Problem,
    ) -> Result<String, StageFailure> {
        let template = self
            .template(Stage::Conversion, TEMPLATE_LATEX_TO_FORMAL)
            .await?;
        let prompt = template.compile(&[
            ("problem", &problem.statement_latex),
            ("solution", &submission.proof_latex),
        ]);
        let key = stage_key(submission.id, Stage::Conversion);

        let output = with_retries(&self.retry, Stage::Conversion, |_| {
            self.model.complete(&prompt, &key)
        })
        .await?;
        self.trace(submission.id, &template, &prompt, &output).await;

        validate_formal_script(&output).ok_or_else(|| {
            StageFailure::new(
                Stage::Conversion,
                FailureReason::UnparseableConversion,
                format!(
                    "model output is not a formal script ({} chars, no top-level declaration)",
                    output.len()
                ),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_script_passes_validation() {
        let script = "theorem add_zero (n : Nat) : n + 0 = n := by simp";
        assert_eq!(validate_formal_script(script).unwrap(), script);
    }

    #[test]
    fn fenced_script_is_unwrapped() {
        let raw = "```lean\ntheorem t : True := trivial\n```";
        assert_eq!(
            validate_formal_script(raw).unwrap(),
            "theorem t : True := trivial"
        );
    }

    #[test]
    fn fence_without_language_tag_is_unwrapped() {
        let raw = "```\nlemma l : True := trivial\n```";
        assert_eq!(
            validate_formal_script(raw).unwrap(),
            "lemma l : True := trivial"
        );
    }

    #[test]
    fn prose_is_rejected() {
        assert!(validate_formal_script("I think the proof is correct.").is_none());
    }

    #[test]
    fn empty_output_is_rejected() {
        assert!(validate_formal_script("").is_none());
        assert!(validate_formal_script("   \n  ").is_none());
        assert!(validate_formal_script("```lean\n```").is_none());
    }

    #[test]
    fn indented_declaration_is_accepted() {
        let raw = "  theorem t : True := trivial";
        assert!(validate_formal_script(raw).is_some());
    }

    #[test]
    fn declaration_keyword_inside_word_is_rejected() {
        assert!(validate_formal_script("deft hands prove nothing").is_none());
    }
}
