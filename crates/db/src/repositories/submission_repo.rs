//! Repository for the `submissions` and `submission_results` tables.
//!
//! Every status change is a single conditional `UPDATE` so that claim
//! exclusivity and the terminal-state guarantee hold across worker
//! processes. Progress writes go through `GREATEST` so a retried or
//! redelivered stage can never regress the observed value.

use lemma_core::status::{StatusId, SubmissionStatus};
use lemma_core::submission::NewSubmission;
use lemma_core::verdict::Evaluation;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::submission::{SubmissionResultRow, SubmissionRow};

/// Column list for `submissions` queries.
const COLUMNS: &str = "\
    id, problem_id, proof_latex, status_id, progress, worker_id, \
    claimed_at, lease_expires_at, created_at, updated_at, evaluated_at";

/// Column list for `submission_results` queries.
const RESULT_COLUMNS: &str = "\
    submission_id, verdict, is_valid, check_status, diagnostics, \
    open_goals, feedback, created_at";

/// Statuses in which a worker holds (or held) a claim.
const PROCESSING_STATUSES: [StatusId; 3] = [
    SubmissionStatus::Claimed as StatusId,
    SubmissionStatus::Converting as StatusId,
    SubmissionStatus::Verifying as StatusId,
];

/// Provides persistence operations for submissions.
pub struct SubmissionRepo;

impl SubmissionRepo {
    /// Insert a new pending submission.
    pub async fn create(
        pool: &PgPool,
        input: &NewSubmission,
    ) -> Result<SubmissionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO submissions (id, problem_id, proof_latex, status_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(Uuid::now_v7())
            .bind(input.problem_id)
            .bind(&input.proof_latex)
            .bind(SubmissionStatus::Pending.id())
            .fetch_one(pool)
            .await
    }

    /// Find a submission by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<SubmissionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM submissions WHERE id = $1");
        sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim the oldest pending submission for a worker.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent claimants
    /// never receive the same row. The claim carries a lease; once
    /// `lease_expires_at` passes, [`release_expired`](Self::release_expired)
    /// makes the submission claimable again.
    pub async fn claim_next(
        pool: &PgPool,
        worker_id: &str,
        lease_secs: f64,
        progress_floor: i16,
    ) -> Result<Option<SubmissionRow>, sqlx::Error> {
        let query = format!(
            "UPDATE submissions \
             SET status_id = $1, worker_id = $2, claimed_at = NOW(), \
                 lease_expires_at = NOW() + make_interval(secs => $3), \
                 progress = GREATEST(progress, $4), updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM submissions \
                 WHERE status_id = $5 \
                 ORDER BY created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubmissionRow>(&query)
            .bind(SubmissionStatus::Claimed.id())
            .bind(worker_id)
            .bind(lease_secs)
            .bind(progress_floor)
            .bind(SubmissionStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Return expired non-terminal claims to `Pending`.
    ///
    /// Progress is left untouched so pollers never observe a regression
    /// across redelivery.
    pub async fn release_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE submissions \
             SET status_id = $1, worker_id = NULL, claimed_at = NULL, \
                 lease_expires_at = NULL, updated_at = NOW() \
             WHERE status_id = ANY($2) AND lease_expires_at <= NOW()",
        )
        .bind(SubmissionStatus::Pending.id())
        .bind(&PROCESSING_STATUSES[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Conditionally move a submission from `from` to `to`.
    ///
    /// Returns `false` when the row was not in `from` (claim lost to
    /// redelivery, or already terminal).
    pub async fn transition(
        pool: &PgPool,
        id: Uuid,
        from: SubmissionStatus,
        to: SubmissionStatus,
        progress_floor: i16,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE submissions \
             SET status_id = $1, progress = GREATEST(progress, $2), updated_at = NOW() \
             WHERE id = $3 AND status_id = $4",
        )
        .bind(to.id())
        .bind(progress_floor)
        .bind(id)
        .bind(from.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Raise progress for a non-terminal submission.
    pub async fn update_progress(
        pool: &PgPool,
        id: Uuid,
        percent: i16,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE submissions \
             SET progress = GREATEST(progress, $1), updated_at = NOW() \
             WHERE id = $2 AND status_id = ANY($3)",
        )
        .bind(percent)
        .bind(id)
        .bind(&PROCESSING_STATUSES[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Terminal transition plus result insert, in one transaction.
    ///
    /// Only submissions in `Converting` or `Verifying` can terminate;
    /// anything else (already terminal, or redelivered) leaves the row
    /// untouched and returns `false`.
    pub async fn terminate(
        pool: &PgPool,
        id: Uuid,
        to: SubmissionStatus,
        evaluation: &Evaluation,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let progress_sql = if to == SubmissionStatus::Completed {
            "100"
        } else {
            "progress"
        };
        let update = format!(
            "UPDATE submissions \
             SET status_id = $1, progress = {progress_sql}, \
                 lease_expires_at = NULL, evaluated_at = NOW(), updated_at = NOW() \
             WHERE id = $2 AND status_id = ANY($3)"
        );
        let updated = sqlx::query(&update)
            .bind(to.id())
            .bind(id)
            .bind(
                &[
                    SubmissionStatus::Converting.id(),
                    SubmissionStatus::Verifying.id(),
                ][..],
            )
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let report = evaluation.report.as_ref();
        sqlx::query(
            "INSERT INTO submission_results \
                 (submission_id, verdict, is_valid, check_status, diagnostics, open_goals, feedback) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(evaluation.verdict.as_str())
        .bind(report.map(|r| r.is_valid))
        .bind(report.map(|r| r.status.as_str()))
        .bind(report.map(|r| serde_json::json!(r.diagnostics)))
        .bind(report.map(|r| serde_json::json!(r.open_goals)))
        .bind(serde_json::json!(evaluation.feedback))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Fetch the persisted result for a submission.
    pub async fn find_result(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<SubmissionResultRow>, sqlx::Error> {
        let query =
            format!("SELECT {RESULT_COLUMNS} FROM submission_results WHERE submission_id = $1");
        sqlx::query_as::<_, SubmissionResultRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
