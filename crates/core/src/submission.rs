//! The submission entity as seen by the pipeline and API.

use serde::Serialize;
use uuid::Uuid;

use crate::status::SubmissionStatus;
use crate::types::Timestamp;

/// One user-provided proof awaiting (or having finished) evaluation.
///
/// Created by the intake layer in `Pending`; mutated only by the
/// dispatcher and stage components afterwards. Never deleted by the
/// pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub proof_latex: String,
    #[serde(serialize_with = "serialize_status")]
    pub status: SubmissionStatus,
    /// 0-100, monotonically non-decreasing while non-terminal.
    pub progress: i16,
    /// Identifier of the worker currently (or last) holding the claim.
    pub worker_id: Option<String>,
    pub claimed_at: Option<Timestamp>,
    /// When the current claim lease expires and the submission becomes
    /// reclaimable.
    pub lease_expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Set exactly when the submission reaches a terminal status.
    pub evaluated_at: Option<Timestamp>,
}

fn serialize_status<S: serde::Serializer>(
    status: &SubmissionStatus,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(status.as_str())
}

/// Input for creating a submission.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub problem_id: Uuid,
    pub proof_latex: String,
}

/// A problem statement, read-only from the pipeline's point of view.
/// Catalog management lives outside this system.
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    pub id: Uuid,
    pub title: String,
    pub statement_latex: String,
}
