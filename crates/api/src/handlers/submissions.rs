//! Handlers for the `/submissions` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use lemma_core::error::CoreError;
use lemma_core::submission::{NewSubmission, Submission};
use lemma_core::types::Timestamp;
use lemma_core::verdict::Evaluation;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// DTO for `POST /api/v1/submissions`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubmission {
    pub problem_id: Uuid,
    /// The proof text, capped at 100 kB.
    #[validate(length(min = 1, max = 100000))]
    pub proof_latex: String,
}

/// Status payload for polling clients.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub status: &'static str,
    pub progress: i16,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub evaluated_at: Option<Timestamp>,
}

impl From<&Submission> for StatusResponse {
    fn from(submission: &Submission) -> Self {
        Self {
            id: submission.id,
            problem_id: submission.problem_id,
            status: submission.status.as_str(),
            progress: submission.progress,
            created_at: submission.created_at,
            updated_at: submission.updated_at,
            evaluated_at: submission.evaluated_at,
        }
    }
}

/// Result payload: the persisted verdict.
#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub submission_id: Uuid,
    #[serde(flatten)]
    pub evaluation: Evaluation,
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/submissions
///
/// Enqueue a proof for evaluation. Returns 201 with the created
/// submission in `pending` status; the worker pool picks it up from
/// there.
pub async fn create_submission(
    State(state): State<AppState>,
    Json(input): Json<CreateSubmission>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|err| AppError::BadRequest(err.to_string()))?;

    // The catalog is external; we only verify the reference.
    let problem = state.catalog.find_problem(input.problem_id).await?;
    if problem.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Problem",
            id: input.problem_id,
        }));
    }

    let submission = state
        .store
        .create(NewSubmission {
            problem_id: input.problem_id,
            proof_latex: input.proof_latex,
        })
        .await?;

    tracing::info!(
        submission_id = %submission.id,
        problem_id = %submission.problem_id,
        "Submission enqueued",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: StatusResponse::from(&submission),
        }),
    ))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/submissions/{id}
///
/// Poll the current status and progress of a submission.
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let submission = state
        .store
        .find(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Submission",
            id,
        }))?;

    Ok(Json(DataResponse {
        data: StatusResponse::from(&submission),
    }))
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// GET /api/v1/submissions/{id}/result
///
/// Fetch the terminal verdict. Returns 404 for an unknown id and 409
/// (`NOT_READY`) while the submission has not reached a terminal
/// status.
pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let submission = state
        .store
        .find(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Submission",
            id,
        }))?;

    if !submission.status.is_terminal() {
        return Err(AppError::Core(CoreError::NotReady(id)));
    }

    let evaluation = state.store.find_result(id).await?.ok_or_else(|| {
        // Terminal status without a result violates a store invariant.
        AppError::InternalError(format!("terminal submission {id} has no result"))
    })?;

    Ok(Json(DataResponse {
        data: ResultResponse {
            submission_id: id,
            evaluation,
        },
    }))
}
