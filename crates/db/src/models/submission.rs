//! Submission and submission-result row types.

use lemma_core::status::{StatusId, SubmissionStatus};
use lemma_core::submission::Submission;
use lemma_core::types::Timestamp;
use lemma_core::verdict::{CheckStatus, Evaluation, Verdict, VerificationReport};
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `submissions` table.
#[derive(Debug, Clone, FromRow)]
pub struct SubmissionRow {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub proof_latex: String,
    pub status_id: StatusId,
    pub progress: i16,
    pub worker_id: Option<String>,
    pub claimed_at: Option<Timestamp>,
    pub lease_expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub evaluated_at: Option<Timestamp>,
}

impl SubmissionRow {
    /// Convert into the domain type. Fails on a status id the
    /// application does not know, which indicates schema drift.
    pub fn into_domain(self) -> Result<Submission, String> {
        let status = SubmissionStatus::from_id(self.status_id)
            .ok_or_else(|| format!("unknown status id {} for submission {}", self.status_id, self.id))?;
        Ok(Submission {
            id: self.id,
            problem_id: self.problem_id,
            proof_latex: self.proof_latex,
            status,
            progress: self.progress,
            worker_id: self.worker_id,
            claimed_at: self.claimed_at,
            lease_expires_at: self.lease_expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            evaluated_at: self.evaluated_at,
        })
    }
}

/// A row from the `submission_results` table.
#[derive(Debug, Clone, FromRow)]
pub struct SubmissionResultRow {
    pub submission_id: Uuid,
    pub verdict: String,
    pub is_valid: Option<bool>,
    pub check_status: Option<String>,
    pub diagnostics: Option<serde_json::Value>,
    pub open_goals: Option<serde_json::Value>,
    pub feedback: serde_json::Value,
    pub created_at: Timestamp,
}

impl SubmissionResultRow {
    /// Reassemble the persisted [`Evaluation`].
    pub fn into_domain(self) -> Result<Evaluation, String> {
        let verdict = Verdict::from_str(&self.verdict)
            .ok_or_else(|| format!("unknown verdict '{}'", self.verdict))?;

        let report = match self.check_status {
            Some(status_str) => {
                let status = CheckStatus::from_str(&status_str)
                    .ok_or_else(|| format!("unknown check status '{status_str}'"))?;
                let diagnostics = match self.diagnostics {
                    Some(value) => serde_json::from_value(value)
                        .map_err(|e| format!("bad diagnostics payload: {e}"))?,
                    None => Vec::new(),
                };
                let open_goals = match self.open_goals {
                    Some(value) => serde_json::from_value(value)
                        .map_err(|e| format!("bad open_goals payload: {e}"))?,
                    None => Vec::new(),
                };
                Some(VerificationReport {
                    is_valid: self.is_valid.unwrap_or(false),
                    status,
                    diagnostics,
                    open_goals,
                })
            }
            None => None,
        };

        let feedback = serde_json::from_value(self.feedback)
            .map_err(|e| format!("bad feedback payload: {e}"))?;

        Ok(Evaluation {
            verdict,
            report,
            feedback,
        })
    }
}
