//! Verdict and verification result types.

use serde::{Deserialize, Serialize};

/// Final outcome of one submission, shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Conversion succeeded and the checker verified the script.
    Accepted,
    /// Conversion succeeded but the script did not verify.
    Rejected,
    /// The pipeline itself failed; the proof was never fully judged.
    Error,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Checker-reported status tag for a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Zero errors, zero open goals.
    Proved,
    /// At least one error diagnostic. Takes precedence over `Incomplete`
    /// when both errors and open goals are present.
    HasErrors,
    /// No errors, but open goals remain.
    Incomplete,
    /// The submission never reached the checker: the guardrail rejected
    /// it as not being a mathematical proof attempt.
    GuardrailFailed,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Proved => "proved",
            Self::HasErrors => "has_errors",
            Self::Incomplete => "incomplete",
            Self::GuardrailFailed => "guardrail_failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "proved" => Some(Self::Proved),
            "has_errors" => Some(Self::HasErrors),
            "incomplete" => Some(Self::Incomplete),
            "guardrail_failed" => Some(Self::GuardrailFailed),
            _ => None,
        }
    }
}

/// One diagnostic message from the proof checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub severity: String,
}

/// Structured result of checking one formal script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub is_valid: bool,
    pub status: CheckStatus,
    /// Error diagnostics, in checker order.
    pub diagnostics: Vec<Diagnostic>,
    /// Remaining open goals, in checker order.
    pub open_goals: Vec<String>,
}

impl VerificationReport {
    /// Report for a guardrail rejection: invalid, no checker involvement.
    pub fn guardrail_rejection(reason: &str) -> Self {
        Self {
            is_valid: false,
            status: CheckStatus::GuardrailFailed,
            diagnostics: vec![Diagnostic {
                message: reason.to_string(),
                line: None,
                column: None,
                severity: "error".to_string(),
            }],
            open_goals: Vec::new(),
        }
    }
}

/// The persisted terminal result of a submission: verdict, the
/// verification report when one exists, and user-facing feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub report: Option<VerificationReport>,
    pub feedback: Vec<String>,
}
