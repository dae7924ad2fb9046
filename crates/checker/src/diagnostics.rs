//! Turn raw checker diagnostics into a structured verification report.

use lemma_core::verdict::{CheckStatus, Diagnostic, VerificationReport};

use crate::client::CheckerResponse;

/// Markers identifying an open-goal diagnostic, matched
/// case-insensitively against the message text.
const GOAL_MARKERS: [&str; 2] = ["unsolved goals", "goals remaining"];

/// Build a [`VerificationReport`] from a checker response.
///
/// Validity policy: valid iff there are zero error diagnostics and zero
/// open goals. Errors take precedence over open goals for the status
/// tag when both are present.
pub fn parse_report(response: &CheckerResponse) -> VerificationReport {
    let diagnostics: Vec<Diagnostic> = response
        .diagnostics
        .iter()
        .filter(|d| d.severity == "error")
        .map(|d| Diagnostic {
            message: d.message.clone(),
            line: d.line,
            column: d.column,
            severity: d.severity.clone(),
        })
        .collect();

    let open_goals: Vec<String> = response
        .diagnostics
        .iter()
        .filter(|d| {
            let lower = d.message.to_lowercase();
            GOAL_MARKERS.iter().any(|marker| lower.contains(marker))
        })
        .map(|d| d.message.clone())
        .collect();

    let is_valid = response.success && diagnostics.is_empty() && open_goals.is_empty();
    let status = if !diagnostics.is_empty() {
        CheckStatus::HasErrors
    } else if !open_goals.is_empty() {
        CheckStatus::Incomplete
    } else {
        CheckStatus::Proved
    };

    VerificationReport {
        is_valid,
        status,
        diagnostics,
        open_goals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RawDiagnostic;

    fn diag(message: &str, severity: &str) -> RawDiagnostic {
        RawDiagnostic {
            message: message.to_string(),
            line: Some(1),
            column: Some(1),
            severity: severity.to_string(),
        }
    }

    fn response(success: bool, diagnostics: Vec<RawDiagnostic>) -> CheckerResponse {
        CheckerResponse {
            success,
            diagnostics,
        }
    }

    #[test]
    fn clean_run_is_proved() {
        let report = parse_report(&response(true, vec![]));
        assert!(report.is_valid);
        assert_eq!(report.status, CheckStatus::Proved);
        assert!(report.diagnostics.is_empty());
        assert!(report.open_goals.is_empty());
    }

    #[test]
    fn open_goal_only_is_incomplete() {
        let report = parse_report(&response(
            false,
            vec![diag("unsolved goals: ⊢ n + 0 = n", "warning")],
        ));
        assert!(!report.is_valid);
        assert_eq!(report.status, CheckStatus::Incomplete);
        assert_eq!(report.open_goals.len(), 1);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn errors_take_precedence_over_goals() {
        let report = parse_report(&response(
            false,
            vec![
                diag("type mismatch at application", "error"),
                diag("unsolved goals: ⊢ False", "warning"),
            ],
        ));
        assert!(!report.is_valid);
        assert_eq!(report.status, CheckStatus::HasErrors);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.open_goals.len(), 1);
    }

    #[test]
    fn goal_reported_as_error_counts_as_both() {
        // Some checkers report unsolved goals with error severity.
        let report = parse_report(&response(false, vec![diag("unsolved goals: ⊢ P", "error")]));
        assert_eq!(report.status, CheckStatus::HasErrors);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.open_goals.len(), 1);
    }

    #[test]
    fn warnings_alone_do_not_invalidate() {
        let report = parse_report(&response(
            true,
            vec![diag("declaration uses sorry-free simp", "warning")],
        ));
        assert!(report.is_valid);
        assert_eq!(report.status, CheckStatus::Proved);
    }

    #[test]
    fn success_flag_false_without_diagnostics_is_invalid() {
        // The checker declared failure without details; never report
        // such a run as proved-and-valid.
        let report = parse_report(&response(false, vec![]));
        assert!(!report.is_valid);
        assert_eq!(report.status, CheckStatus::Proved);
    }
}
