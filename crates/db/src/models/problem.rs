//! Problem row type. The catalog is managed by an external service; the
//! pipeline only reads statements.

use lemma_core::submission::Problem;
use lemma_core::types::Timestamp;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `problems` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProblemRow {
    pub id: Uuid,
    pub title: String,
    pub statement_latex: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<ProblemRow> for Problem {
    fn from(row: ProblemRow) -> Self {
        Problem {
            id: row.id,
            title: row.title,
            statement_latex: row.statement_latex,
        }
    }
}
