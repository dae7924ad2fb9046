use std::sync::Arc;

use lemma_core::store::{ProblemCatalog, SubmissionStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Durable submission store (Postgres in production, in-memory in
    /// tests).
    pub store: Arc<dyn SubmissionStore>,
    /// Read-only problem catalog.
    pub catalog: Arc<dyn ProblemCatalog>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
