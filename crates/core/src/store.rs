//! Store traits: the durable record of submissions and their results.
//!
//! The store is the single source of truth for status and progress, and
//! the only place claim exclusivity is enforced. Workers may run as
//! separate processes, so every transition here must be a single atomic
//! conditional update in the backend, never an in-process lock.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::status::SubmissionStatus;
use crate::submission::{NewSubmission, Problem, Submission};
use crate::verdict::Evaluation;

/// Errors from a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A conditional transition found the row in a different state than
    /// expected (claim race lost, or the submission already terminal).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The submission does not exist.
    #[error("submission {0} not found")]
    NotFound(Uuid),

    /// The backend itself failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Durable record store for submissions, keyed by submission id.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Create a submission in `Pending` with progress 0.
    async fn create(&self, new_submission: NewSubmission) -> Result<Submission, StoreError>;

    /// Fetch a submission by id.
    async fn find(&self, id: Uuid) -> Result<Option<Submission>, StoreError>;

    /// Atomically claim the oldest `Pending` submission for `worker_id`.
    ///
    /// Moves it to `Claimed`, records the claim lease, and raises
    /// progress to the claim floor. Two concurrent callers never receive
    /// the same submission. Returns `None` when nothing is claimable.
    async fn claim_next(
        &self,
        worker_id: &str,
        lease: Duration,
    ) -> Result<Option<Submission>, StoreError>;

    /// Return expired non-terminal claims to `Pending` for redelivery.
    ///
    /// Returns how many submissions were released. This is the only path
    /// by which a processing submission leaves its claim without
    /// reaching a terminal state.
    async fn release_expired(&self) -> Result<u64, StoreError>;

    /// Conditionally move `id` from `from` to `to`, raising progress to
    /// `progress_floor`. Fails with [`StoreError::Conflict`] when the
    /// current status is not `from` (e.g. the claim was redelivered).
    async fn transition(
        &self,
        id: Uuid,
        from: SubmissionStatus,
        to: SubmissionStatus,
        progress_floor: i16,
    ) -> Result<(), StoreError>;

    /// Raise progress for a non-terminal submission. Writes below the
    /// current value are ignored (monotonicity).
    async fn update_progress(&self, id: Uuid, percent: i16) -> Result<(), StoreError>;

    /// Terminal success: persist the evaluation, move to `Completed`,
    /// set progress to 100 and `evaluated_at`. Conflicts when the
    /// submission is not in a processing status.
    async fn complete(&self, id: Uuid, evaluation: &Evaluation) -> Result<(), StoreError>;

    /// Terminal failure: persist the evaluation, move to `Failed` and
    /// set `evaluated_at`. Conflicts when the submission is not in a
    /// processing status.
    async fn fail(&self, id: Uuid, evaluation: &Evaluation) -> Result<(), StoreError>;

    /// Fetch the persisted evaluation, if the submission is terminal.
    async fn find_result(&self, id: Uuid) -> Result<Option<Evaluation>, StoreError>;

    /// Backend liveness probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Read-only access to problem statements. The catalog itself is managed
/// outside this system.
#[async_trait]
pub trait ProblemCatalog: Send + Sync {
    async fn find_problem(&self, id: Uuid) -> Result<Option<Problem>, StoreError>;
}
