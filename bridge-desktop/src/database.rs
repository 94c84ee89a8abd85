//! SQLite connection helpers shared by the desktop stores.

use bridge_traits::error::{BridgeError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "audiobook-player";
const DATABASE_FILE: &str = "player.db";

/// Default location of the player database inside the platform data directory.
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local")
                .join("share")
        })
        .join(APP_DIR)
        .join(DATABASE_FILE)
}

/// Open (creating if needed) the database file at `db_path`.
pub async fn open_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(BridgeError::Io)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options)
        .await
        .map_err(|e| BridgeError::DatabaseError(format!("Failed to connect to DB: {}", e)))?;

    debug!(path = ?db_path, "Opened player database");
    Ok(pool)
}

/// Private in-memory database.
///
/// Every SQLite connection to `:memory:` sees its own database, so the pool is
/// pinned to a single connection that is never recycled.
pub async fn in_memory_pool() -> Result<SqlitePool> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .map_err(|e| BridgeError::DatabaseError(format!("Failed to connect to DB: {}", e)))
}

pub(crate) fn db_error(context: &str, err: sqlx::Error) -> BridgeError {
    BridgeError::DatabaseError(format!("{}: {}", context, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_ends_with_database_file() {
        let path = default_database_path();
        assert!(path.ends_with(Path::new(APP_DIR).join(DATABASE_FILE)));
    }

    #[tokio::test]
    async fn open_pool_creates_missing_directories() {
        let dir = std::env::temp_dir().join(format!("bridge-desktop-db-{}", std::process::id()));
        let db_path = dir.join("nested").join("player.db");
        let _ = tokio::fs::remove_dir_all(&dir).await;

        let pool = open_pool(&db_path).await.unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();
        pool.close().await;

        assert!(db_path.exists());
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn in_memory_pool_keeps_tables_between_queries() {
        let pool = in_memory_pool().await.unwrap();
        sqlx::query("CREATE TABLE t (x INTEGER)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t VALUES (1)")
            .execute(&pool)
            .await
            .unwrap();
    }
}
