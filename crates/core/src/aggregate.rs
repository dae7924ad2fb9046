//! Verdict aggregation.
//!
//! [`aggregate`] is a pure function from stage outcomes to the final
//! [`Evaluation`]: no external calls, deterministic given its input. The
//! pipeline may later replace the feedback strings with richer generated
//! text, but never the verdict.

use crate::stage::StageFailure;
use crate::verdict::{CheckStatus, Evaluation, Verdict, VerificationReport};

/// How one submission's run through the stages ended.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// The guardrail judged the text not to be a proof attempt.
    GuardrailRejected { reason: String },
    /// Conversion failed permanently (or exhausted retries).
    ConversionFailed(StageFailure),
    /// Verification failed permanently (or exhausted retries).
    VerificationFailed(StageFailure),
    /// The checker produced a report.
    Verified(VerificationReport),
}

/// Combine stage outcomes into the final verdict and baseline feedback.
pub fn aggregate(outcome: &PipelineOutcome) -> Evaluation {
    match outcome {
        PipelineOutcome::GuardrailRejected { reason } => Evaluation {
            verdict: Verdict::Rejected,
            report: Some(VerificationReport::guardrail_rejection(reason)),
            feedback: vec![format!(
                "Submission rejected: {reason}. Please provide a valid mathematical proof."
            )],
        },

        PipelineOutcome::ConversionFailed(failure)
        | PipelineOutcome::VerificationFailed(failure) => Evaluation {
            verdict: Verdict::Error,
            report: None,
            feedback: vec![format!(
                "Evaluation could not be completed: the {} stage failed ({}). {}",
                failure.stage,
                failure.reason.code(),
                failure.reason.describe(),
            )],
        },

        PipelineOutcome::Verified(report) => {
            if report.is_valid {
                Evaluation {
                    verdict: Verdict::Accepted,
                    report: Some(report.clone()),
                    feedback: vec![
                        "The proof was converted and verified successfully.".to_string(),
                    ],
                }
            } else {
                Evaluation {
                    verdict: Verdict::Rejected,
                    report: Some(report.clone()),
                    feedback: rejection_feedback(report),
                }
            }
        }
    }
}

/// List the diagnostics and open goals as user-readable lines.
fn rejection_feedback(report: &VerificationReport) -> Vec<String> {
    let mut feedback = vec![match report.status {
        CheckStatus::HasErrors => "The formal proof has errors.".to_string(),
        CheckStatus::Incomplete => "The formal proof is incomplete.".to_string(),
        _ => "The formal proof could not be verified.".to_string(),
    }];

    for diag in &report.diagnostics {
        feedback.push(match diag.line {
            Some(line) => format!("Error at line {line}: {}", diag.message),
            None => format!("Error: {}", diag.message),
        });
    }
    for goal in &report.open_goals {
        feedback.push(format!("Unsolved goal: {goal}"));
    }

    feedback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{FailureReason, Stage};
    use crate::verdict::Diagnostic;

    fn report(diagnostics: Vec<Diagnostic>, open_goals: Vec<String>) -> VerificationReport {
        let has_errors = !diagnostics.is_empty();
        let incomplete = !open_goals.is_empty();
        VerificationReport {
            is_valid: !has_errors && !incomplete,
            status: if has_errors {
                CheckStatus::HasErrors
            } else if incomplete {
                CheckStatus::Incomplete
            } else {
                CheckStatus::Proved
            },
            diagnostics,
            open_goals,
        }
    }

    #[test]
    fn valid_report_is_accepted() {
        let evaluation = aggregate(&PipelineOutcome::Verified(report(vec![], vec![])));
        assert_eq!(evaluation.verdict, Verdict::Accepted);
        assert_eq!(evaluation.report.unwrap().status, CheckStatus::Proved);
    }

    #[test]
    fn open_goal_is_rejected_and_listed() {
        let evaluation = aggregate(&PipelineOutcome::Verified(report(
            vec![],
            vec!["n : Nat |- n + 0 = n".to_string()],
        )));
        assert_eq!(evaluation.verdict, Verdict::Rejected);
        assert!(evaluation
            .feedback
            .iter()
            .any(|line| line.contains("n + 0 = n")));
    }

    #[test]
    fn conversion_failure_is_error_with_reason_code() {
        let failure = StageFailure::new(
            Stage::Conversion,
            FailureReason::UnparseableConversion,
            "no declaration found",
        );
        let evaluation = aggregate(&PipelineOutcome::ConversionFailed(failure));
        assert_eq!(evaluation.verdict, Verdict::Error);
        assert!(evaluation.report.is_none());
        assert!(evaluation.feedback[0].contains("unparseable_conversion"));
        assert!(evaluation.feedback[0].contains("conversion"));
    }

    #[test]
    fn exhausted_retries_mention_retries() {
        let failure = StageFailure::new(
            Stage::Verification,
            FailureReason::RetriesExhausted,
            "3 attempts timed out",
        );
        let evaluation = aggregate(&PipelineOutcome::VerificationFailed(failure));
        assert_eq!(evaluation.verdict, Verdict::Error);
        assert!(evaluation.feedback[0].contains("retries_exhausted"));
    }

    #[test]
    fn guardrail_rejection_carries_reason() {
        let evaluation = aggregate(&PipelineOutcome::GuardrailRejected {
            reason: "not a mathematical text".to_string(),
        });
        assert_eq!(evaluation.verdict, Verdict::Rejected);
        let report = evaluation.report.unwrap();
        assert_eq!(report.status, CheckStatus::GuardrailFailed);
        assert!(evaluation.feedback[0].contains("not a mathematical text"));
    }

    #[test]
    fn aggregate_is_deterministic() {
        let outcome = PipelineOutcome::Verified(report(
            vec![Diagnostic {
                message: "type mismatch".to_string(),
                line: Some(3),
                column: Some(7),
                severity: "error".to_string(),
            }],
            vec![],
        ));
        assert_eq!(aggregate(&outcome), aggregate(&outcome));
    }
}
