//! Document store module.
//!
//! Documents live at slash-separated paths (`posts/{postId}`,
//! `likes/{postId}/{userId}`, ...) and are persisted as JSON in SQLite.

pub mod paths;
mod store;
mod subscription;

pub use store::*;
pub use subscription::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // `parent` and `key` are the path split at its last slash
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            path TEXT PRIMARY KEY,
            parent TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_parent ON documents(parent);")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_key ON documents(key);")
        .execute(pool)
        .await?;

    Ok(())
}

/// Fresh store in a temporary directory; keep the `TempDir` alive for the test.
#[cfg(test)]
pub(crate) async fn test_store() -> (DocumentStore, tempfile::TempDir) {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("test.sqlite"))
        .await
        .unwrap();
    (DocumentStore::new(pool), temp_dir)
}
