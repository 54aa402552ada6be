use crate::config::Config;
use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use sqlx::{pool::PoolConnection, sqlite::SqlitePoolOptions, Sqlite, SqlitePool};
use std::sync::Arc;

pub type DbPool = Arc<SqlitePool>;

pub async fn init_db(config: &Config) -> Result<DbPool, sqlx::Error> {
    tracing::info!("Connecting to database: {}", config.database_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    create_schema(&pool).await?;

    Ok(Arc::new(pool))
}

/// Creates the `people` and `message` tables and their indexes if they are
/// not there yet.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS people (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            firstname TEXT NOT NULL,
            lastname TEXT NOT NULL,
            phone TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS message (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            target TEXT NOT NULL,
            message TEXT NOT NULL,
            sent TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_message_source ON message(source)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_message_target ON message(target)")
        .execute(pool)
        .await?;

    Ok(())
}

/// A pooled connection held for the lifetime of one request.
///
/// The connection goes back to the pool when the handler finishes, whichever
/// way it exits. Failing to acquire one rejects the request with a 500 before
/// any other extractor or handler code runs, so list it first.
pub struct Conn(pub PoolConnection<Sqlite>);

#[async_trait]
impl<S> FromRequestParts<S> for Conn
where
    DbPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = DbPool::from_ref(state);
        let conn = pool.acquire().await.map_err(ApiError::Unavailable)?;
        Ok(Conn(conn))
    }
}
