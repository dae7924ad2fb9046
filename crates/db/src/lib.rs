//! Postgres persistence for the submission pipeline.
//!
//! Repositories are zero-sized structs providing async methods that take
//! `&PgPool` as their first argument. [`store::PgStore`] adapts them to
//! the `lemma-core` store traits.

pub mod models;
pub mod repositories;
pub mod store;

/// Shared connection pool type.
pub type DbPool = sqlx::PgPool;

/// Create a connection pool against the given database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Cheap liveness probe.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply embedded migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
