//! Route definitions for the `/submissions` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::submissions;
use crate::state::AppState;

/// Routes mounted at `/submissions`.
///
/// ```text
/// POST   /               -> create_submission
/// GET    /{id}           -> get_submission
/// GET    /{id}/result    -> get_result
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submissions::create_submission))
        .route("/{id}", get(submissions::get_submission))
        .route("/{id}/result", get(submissions::get_result))
}
