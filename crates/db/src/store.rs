//! [`PgStore`]: the Postgres-backed implementation of the core store
//! traits.

use std::time::Duration;

use async_trait::async_trait;
use lemma_core::progress::PROGRESS_CLAIMED;
use lemma_core::status::SubmissionStatus;
use lemma_core::store::{ProblemCatalog, StoreError, SubmissionStore};
use lemma_core::submission::{NewSubmission, Problem, Submission};
use lemma_core::verdict::Evaluation;
use uuid::Uuid;

use crate::repositories::{ProblemRepo, SubmissionRepo};
use crate::DbPool;

/// Durable store backend shared by the API and worker processes.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn create(&self, new_submission: NewSubmission) -> Result<Submission, StoreError> {
        let row = SubmissionRepo::create(&self.pool, &new_submission)
            .await
            .map_err(backend)?;
        row.into_domain().map_err(StoreError::Backend)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        let row = SubmissionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(backend)?;
        row.map(|r| r.into_domain().map_err(StoreError::Backend))
            .transpose()
    }

    async fn claim_next(
        &self,
        worker_id: &str,
        lease: Duration,
    ) -> Result<Option<Submission>, StoreError> {
        let row = SubmissionRepo::claim_next(
            &self.pool,
            worker_id,
            lease.as_secs_f64(),
            PROGRESS_CLAIMED,
        )
        .await
        .map_err(backend)?;
        row.map(|r| r.into_domain().map_err(StoreError::Backend))
            .transpose()
    }

    async fn release_expired(&self) -> Result<u64, StoreError> {
        SubmissionRepo::release_expired(&self.pool)
            .await
            .map_err(backend)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: SubmissionStatus,
        to: SubmissionStatus,
        progress_floor: i16,
    ) -> Result<(), StoreError> {
        if !from.can_transition_to(to) {
            return Err(StoreError::Conflict(format!(
                "illegal transition {} -> {}",
                from.as_str(),
                to.as_str()
            )));
        }
        let moved = SubmissionRepo::transition(&self.pool, id, from, to, progress_floor)
            .await
            .map_err(backend)?;
        if moved {
            Ok(())
        } else {
            Err(StoreError::Conflict(format!(
                "submission {id} was not in {}",
                from.as_str()
            )))
        }
    }

    async fn update_progress(&self, id: Uuid, percent: i16) -> Result<(), StoreError> {
        let updated = SubmissionRepo::update_progress(&self.pool, id, percent)
            .await
            .map_err(backend)?;
        if updated {
            Ok(())
        } else {
            Err(StoreError::Conflict(format!(
                "submission {id} is not being processed"
            )))
        }
    }

    async fn complete(&self, id: Uuid, evaluation: &Evaluation) -> Result<(), StoreError> {
        let done =
            SubmissionRepo::terminate(&self.pool, id, SubmissionStatus::Completed, evaluation)
                .await
                .map_err(backend)?;
        if done {
            Ok(())
        } else {
            Err(StoreError::Conflict(format!(
                "submission {id} could not be completed"
            )))
        }
    }

    async fn fail(&self, id: Uuid, evaluation: &Evaluation) -> Result<(), StoreError> {
        let done = SubmissionRepo::terminate(&self.pool, id, SubmissionStatus::Failed, evaluation)
            .await
            .map_err(backend)?;
        if done {
            Ok(())
        } else {
            Err(StoreError::Conflict(format!(
                "submission {id} could not be failed"
            )))
        }
    }

    async fn find_result(&self, id: Uuid) -> Result<Option<Evaluation>, StoreError> {
        let row = SubmissionRepo::find_result(&self.pool, id)
            .await
            .map_err(backend)?;
        row.map(|r| r.into_domain().map_err(StoreError::Backend))
            .transpose()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await.map_err(backend)
    }
}

#[async_trait]
impl ProblemCatalog for PgStore {
    async fn find_problem(&self, id: Uuid) -> Result<Option<Problem>, StoreError> {
        let row = ProblemRepo::find_by_id(&self.pool, id)
            .await
            .map_err(backend)?;
        Ok(row.map(Problem::from))
    }
}
