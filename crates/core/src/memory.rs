//! In-memory store backend.
//!
//! Implements the same atomic-transition contract as the Postgres
//! backend behind a process-local mutex. Used by tests and local
//! development; production workers share state through `lemma-db`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::progress::{monotonic, PROGRESS_CLAIMED, PROGRESS_COMPLETE};
use crate::status::SubmissionStatus;
use crate::store::{ProblemCatalog, StoreError, SubmissionStore};
use crate::submission::{NewSubmission, Problem, Submission};
use crate::verdict::Evaluation;

#[derive(Default)]
struct Inner {
    submissions: HashMap<Uuid, Submission>,
    results: HashMap<Uuid, Evaluation>,
    problems: HashMap<Uuid, Problem>,
    /// Every progress value ever written, per submission, in write order.
    progress_log: HashMap<Uuid, Vec<i16>>,
}

/// Mutex-guarded in-memory implementation of [`SubmissionStore`] and
/// [`ProblemCatalog`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a problem into the catalog.
    pub fn insert_problem(&self, problem: Problem) {
        let mut inner = self.inner.lock().unwrap();
        inner.problems.insert(problem.id, problem);
    }

    /// All progress values written for a submission, in order. Test
    /// support for monotonicity assertions.
    pub fn progress_history(&self, id: Uuid) -> Vec<i16> {
        let inner = self.inner.lock().unwrap();
        inner.progress_log.get(&id).cloned().unwrap_or_default()
    }

    fn log_progress(inner: &mut Inner, id: Uuid, value: i16) {
        inner.progress_log.entry(id).or_default().push(value);
    }

    /// Apply a terminal transition, persisting the evaluation.
    fn terminate(
        &self,
        id: Uuid,
        to: SubmissionStatus,
        evaluation: &Evaluation,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let submission = inner
            .submissions
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        if !submission.status.can_transition_to(to) {
            return Err(StoreError::Conflict(format!(
                "cannot move submission {id} from {} to {}",
                submission.status.as_str(),
                to.as_str()
            )));
        }

        let now = Utc::now();
        submission.status = to;
        submission.updated_at = now;
        submission.evaluated_at = Some(now);
        submission.lease_expires_at = None;
        if to == SubmissionStatus::Completed {
            submission.progress = PROGRESS_COMPLETE;
        }
        let progress = submission.progress;
        Self::log_progress(&mut inner, id, progress);
        inner.results.insert(id, evaluation.clone());
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn create(&self, new_submission: NewSubmission) -> Result<Submission, StoreError> {
        let now = Utc::now();
        let submission = Submission {
            id: Uuid::now_v7(),
            problem_id: new_submission.problem_id,
            proof_latex: new_submission.proof_latex,
            status: SubmissionStatus::Pending,
            progress: 0,
            worker_id: None,
            claimed_at: None,
            lease_expires_at: None,
            created_at: now,
            updated_at: now,
            evaluated_at: None,
        };
        let mut inner = self.inner.lock().unwrap();
        inner.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.submissions.get(&id).cloned())
    }

    async fn claim_next(
        &self,
        worker_id: &str,
        lease: Duration,
    ) -> Result<Option<Submission>, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        // Oldest pending first, matching the Postgres claim ordering.
        let candidate = inner
            .submissions
            .values()
            .filter(|s| s.status == SubmissionStatus::Pending)
            .min_by_key(|s| s.created_at)
            .map(|s| s.id);

        let Some(id) = candidate else {
            return Ok(None);
        };

        let now = Utc::now();
        let submission = inner.submissions.get_mut(&id).expect("candidate exists");
        submission.status = SubmissionStatus::Claimed;
        submission.worker_id = Some(worker_id.to_string());
        submission.claimed_at = Some(now);
        submission.lease_expires_at =
            Some(now + chrono::Duration::from_std(lease).unwrap_or_default());
        submission.progress = monotonic(submission.progress, PROGRESS_CLAIMED);
        submission.updated_at = now;
        let claimed = submission.clone();
        Self::log_progress(&mut inner, id, claimed.progress);
        Ok(Some(claimed))
    }

    async fn release_expired(&self) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let mut released = 0;
        for submission in inner.submissions.values_mut() {
            let expired = submission.status.is_processing()
                && submission
                    .lease_expires_at
                    .is_some_and(|expiry| expiry <= now);
            if expired {
                submission.status = SubmissionStatus::Pending;
                submission.worker_id = None;
                submission.claimed_at = None;
                submission.lease_expires_at = None;
                submission.updated_at = now;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: SubmissionStatus,
        to: SubmissionStatus,
        progress_floor: i16,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let submission = inner
            .submissions
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        if submission.status != from || !from.can_transition_to(to) {
            return Err(StoreError::Conflict(format!(
                "cannot move submission {id} from {} to {} (current: {})",
                from.as_str(),
                to.as_str(),
                submission.status.as_str()
            )));
        }

        submission.status = to;
        submission.progress = monotonic(submission.progress, progress_floor);
        submission.updated_at = Utc::now();
        let progress = submission.progress;
        Self::log_progress(&mut inner, id, progress);
        Ok(())
    }

    async fn update_progress(&self, id: Uuid, percent: i16) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let submission = inner
            .submissions
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;

        if submission.status.is_terminal() {
            return Err(StoreError::Conflict(format!(
                "submission {id} is terminal"
            )));
        }

        submission.progress = monotonic(submission.progress, percent);
        submission.updated_at = Utc::now();
        let progress = submission.progress;
        Self::log_progress(&mut inner, id, progress);
        Ok(())
    }

    async fn complete(&self, id: Uuid, evaluation: &Evaluation) -> Result<(), StoreError> {
        self.terminate(id, SubmissionStatus::Completed, evaluation)
    }

    async fn fail(&self, id: Uuid, evaluation: &Evaluation) -> Result<(), StoreError> {
        self.terminate(id, SubmissionStatus::Failed, evaluation)
    }

    async fn find_result(&self, id: Uuid) -> Result<Option<Evaluation>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.results.get(&id).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl ProblemCatalog for MemoryStore {
    async fn find_problem(&self, id: Uuid) -> Result<Option<Problem>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.problems.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;
    use crate::verdict::Verdict;

    fn new_submission() -> NewSubmission {
        NewSubmission {
            problem_id: Uuid::now_v7(),
            proof_latex: "\\begin{proof}trivial\\end{proof}".to_string(),
        }
    }

    fn accepted() -> Evaluation {
        Evaluation {
            verdict: Verdict::Accepted,
            report: None,
            feedback: vec!["ok".to_string()],
        }
    }

    #[tokio::test]
    async fn created_submission_is_pending_with_zero_progress() {
        let store = MemoryStore::new();
        let submission = store.create(new_submission()).await.unwrap();
        assert_eq!(submission.status, SubmissionStatus::Pending);
        assert_eq!(submission.progress, 0);
        assert!(submission.evaluated_at.is_none());
    }

    #[tokio::test]
    async fn exactly_one_concurrent_claim_wins() {
        let store = Arc::new(MemoryStore::new());
        store.create(new_submission()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .claim_next(&format!("worker-{i}"), Duration::from_secs(60))
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn claim_picks_oldest_pending() {
        let store = MemoryStore::new();
        let first = store.create(new_submission()).await.unwrap();
        let _second = store.create(new_submission()).await.unwrap();

        let claimed = store
            .claim_next("worker-0", Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, first.id);
        assert_eq!(claimed.status, SubmissionStatus::Claimed);
        assert_eq!(claimed.progress, PROGRESS_CLAIMED);
    }

    #[tokio::test]
    async fn transition_conflicts_on_wrong_current_status() {
        let store = MemoryStore::new();
        let submission = store.create(new_submission()).await.unwrap();

        let result = store
            .transition(
                submission.id,
                SubmissionStatus::Claimed,
                SubmissionStatus::Converting,
                25,
            )
            .await;
        assert_matches!(result, Err(StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn progress_never_regresses() {
        let store = MemoryStore::new();
        let submission = store.create(new_submission()).await.unwrap();

        store.update_progress(submission.id, 50).await.unwrap();
        store.update_progress(submission.id, 25).await.unwrap();

        let current = store.find(submission.id).await.unwrap().unwrap();
        assert_eq!(current.progress, 50);

        let history = store.progress_history(submission.id);
        assert!(history.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn complete_requires_processing_status() {
        let store = MemoryStore::new();
        let submission = store.create(new_submission()).await.unwrap();

        // Still pending: no claim was taken, so completion must conflict.
        let result = store.complete(submission.id, &accepted()).await;
        assert_matches!(result, Err(StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn complete_sets_terminal_state_and_result() {
        let store = MemoryStore::new();
        let submission = store.create(new_submission()).await.unwrap();
        store
            .claim_next("worker-0", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .transition(
                submission.id,
                SubmissionStatus::Claimed,
                SubmissionStatus::Converting,
                25,
            )
            .await
            .unwrap();
        store
            .transition(
                submission.id,
                SubmissionStatus::Converting,
                SubmissionStatus::Verifying,
                50,
            )
            .await
            .unwrap();

        store.complete(submission.id, &accepted()).await.unwrap();

        let current = store.find(submission.id).await.unwrap().unwrap();
        assert_eq!(current.status, SubmissionStatus::Completed);
        assert_eq!(current.progress, PROGRESS_COMPLETE);
        assert!(current.evaluated_at.is_some());

        let result = store.find_result(submission.id).await.unwrap().unwrap();
        assert_eq!(result.verdict, Verdict::Accepted);

        // Terminal states accept no further transitions.
        let again = store.complete(submission.id, &accepted()).await;
        assert_matches!(again, Err(StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn expired_lease_is_released_for_redelivery() {
        let store = MemoryStore::new();
        let submission = store.create(new_submission()).await.unwrap();
        store
            .claim_next("worker-0", Duration::ZERO)
            .await
            .unwrap()
            .unwrap();

        let released = store.release_expired().await.unwrap();
        assert_eq!(released, 1);

        let current = store.find(submission.id).await.unwrap().unwrap();
        assert_eq!(current.status, SubmissionStatus::Pending);
        assert!(current.worker_id.is_none());

        // Claimable again, and progress kept its floor.
        let reclaimed = store
            .claim_next("worker-1", Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reclaimed.id, submission.id);
        assert_eq!(reclaimed.progress, PROGRESS_CLAIMED);
    }

    #[tokio::test]
    async fn live_lease_is_not_released() {
        let store = MemoryStore::new();
        store.create(new_submission()).await.unwrap();
        store
            .claim_next("worker-0", Duration::from_secs(300))
            .await
            .unwrap()
            .unwrap();

        let released = store.release_expired().await.unwrap();
        assert_eq!(released, 0);
    }
}
