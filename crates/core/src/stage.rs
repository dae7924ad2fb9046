//! Pipeline stage identifiers and failure records.

use std::fmt;

/// A stage of the evaluation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Guardrail,
    Conversion,
    Verification,
    Feedback,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guardrail => "guardrail",
            Self::Conversion => "conversion",
            Self::Verification => "verification",
            Self::Feedback => "feedback",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stage failed permanently.
///
/// The code is recorded with the terminal result and surfaced in user
/// feedback; the free-form message stays in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The language model did not produce a usable formal script.
    UnparseableConversion,
    /// The proof checker rejected the script outright.
    InvalidScript,
    /// A transient failure persisted through every retry attempt.
    RetriesExhausted,
    /// An external service rejected the request itself (bad credentials,
    /// malformed payload). Not retried.
    UpstreamRejected,
    /// The referenced problem statement could not be found.
    ProblemNotFound,
    /// The named prompt template was unavailable.
    TemplateMissing,
}

impl FailureReason {
    /// Stable machine-readable reason code.
    pub fn code(self) -> &'static str {
        match self {
            Self::UnparseableConversion => "unparseable_conversion",
            Self::InvalidScript => "invalid_script",
            Self::RetriesExhausted => "retries_exhausted",
            Self::UpstreamRejected => "upstream_rejected",
            Self::ProblemNotFound => "problem_not_found",
            Self::TemplateMissing => "template_missing",
        }
    }

    /// Short user-facing explanation. Never echoes raw service errors.
    pub fn describe(self) -> &'static str {
        match self {
            Self::UnparseableConversion => {
                "The language model did not produce a usable formal proof script."
            }
            Self::InvalidScript => "The proof checker rejected the generated script.",
            Self::RetriesExhausted => {
                "An external service did not respond after repeated retries."
            }
            Self::UpstreamRejected => "An external service rejected the request.",
            Self::ProblemNotFound => "The referenced problem could not be found.",
            Self::TemplateMissing => "A required prompt template was unavailable.",
        }
    }
}

/// A permanent stage failure. Ends the submission in `Failed` (or, for
/// guardrail rejections, `Completed` with a rejected verdict).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{stage} failed ({}): {message}", .reason.code())]
pub struct StageFailure {
    pub stage: Stage,
    pub reason: FailureReason,
    /// Internal detail for logs. Not shown to users verbatim.
    pub message: String,
}

impl StageFailure {
    pub fn new(stage: Stage, reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            stage,
            reason,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_stage_and_code() {
        let failure = StageFailure::new(
            Stage::Conversion,
            FailureReason::UnparseableConversion,
            "model returned prose",
        );
        let text = failure.to_string();
        assert!(text.contains("conversion"));
        assert!(text.contains("unparseable_conversion"));
    }

    #[test]
    fn reason_codes_are_stable() {
        assert_eq!(FailureReason::UnparseableConversion.code(), "unparseable_conversion");
        assert_eq!(FailureReason::InvalidScript.code(), "invalid_script");
        assert_eq!(FailureReason::RetriesExhausted.code(), "retries_exhausted");
    }
}
