use uuid::Uuid;

/// Domain-level errors surfaced to the API layer.
///
/// Pipeline stage failures are a separate concern; see
/// [`crate::stage::StageFailure`].
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The requested entity does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// The submission exists but has not reached a terminal state yet.
    #[error("submission {0} has not finished evaluation")]
    NotReady(Uuid),

    /// The request was structurally valid but semantically rejected.
    #[error("{0}")]
    Validation(String),

    /// An unexpected internal failure.
    #[error("{0}")]
    Internal(String),
}
