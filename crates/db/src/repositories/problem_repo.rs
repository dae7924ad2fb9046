//! Read-only repository for the `problems` table.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::problem::ProblemRow;

/// Column list for `problems` queries.
const COLUMNS: &str = "id, title, statement_latex, created_at, updated_at";

/// Provides read access to problem statements.
pub struct ProblemRepo;

impl ProblemRepo {
    /// Find a problem by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<ProblemRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM problems WHERE id = $1");
        sqlx::query_as::<_, ProblemRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
