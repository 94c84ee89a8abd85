//! Listening Progress Storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    library::BookId,
    storage::{Progress, ProgressStore},
    time::{Clock, SystemClock},
};
use chrono::{TimeZone, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::database::{self, db_error};

/// SQLite-backed progress store.
///
/// One row per book. `last_updated` is stored as Unix milliseconds taken from
/// the injected [`Clock`].
pub struct SqliteProgressStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteProgressStore {
    /// Create a store on an existing pool, creating the table if needed.
    pub async fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS progress (
                book_id TEXT PRIMARY KEY,
                position REAL NOT NULL,
                last_updated INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| db_error("Failed to create table", e))?;

        Ok(Self { pool, clock })
    }

    /// Open the store in the database file at `db_path`.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = database::open_pool(db_path).await?;
        let store = Self::new(pool, Arc::new(SystemClock)).await?;
        debug!(path = ?db_path, "Initialized progress store");
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::new(database::in_memory_pool().await?, Arc::new(SystemClock)).await
    }

    /// Forget the saved position for a book.
    pub async fn remove(&self, book_id: &BookId) -> Result<()> {
        sqlx::query("DELETE FROM progress WHERE book_id = ?")
            .bind(book_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete progress", e))?;

        debug!(book_id = %book_id, "Deleted progress");
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn load(&self, book_id: &BookId) -> Result<Option<Progress>> {
        let row = sqlx::query("SELECT position, last_updated FROM progress WHERE book_id = ?")
            .bind(book_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get progress", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let position: f64 = row.get(0);
        let millis: i64 = row.get(1);
        let last_updated = Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
            BridgeError::OperationFailed(format!("Invalid progress timestamp: {}", millis))
        })?;

        Ok(Some(Progress {
            book_id: book_id.clone(),
            position: position.max(0.0),
            last_updated,
        }))
    }

    async fn save(&self, book_id: &BookId, position: f64) -> Result<()> {
        if !position.is_finite() {
            return Err(BridgeError::OperationFailed(format!(
                "Refusing to store non-finite position {} for {}",
                position, book_id
            )));
        }
        let position = position.max(0.0);

        sqlx::query(
            r#"
            INSERT INTO progress (book_id, position, last_updated)
            VALUES (?, ?, ?)
            ON CONFLICT(book_id) DO UPDATE SET
                position = excluded.position,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(book_id.as_str())
        .bind(position)
        .bind(self.clock.unix_timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save progress", e))?;

        debug!(book_id = %book_id, position, "Stored progress");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.timestamp_millis_opt(self.0).unwrap()
        }
    }

    async fn store_at(millis: i64) -> SqliteProgressStore {
        let pool = database::in_memory_pool().await.unwrap();
        SqliteProgressStore::new(pool, Arc::new(FixedClock(millis)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_book_has_no_progress() {
        let store = SqliteProgressStore::in_memory().await.unwrap();
        assert!(store.load(&BookId::new("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_uses_clock() {
        let store = store_at(1_700_000_000_123).await;
        let id = BookId::new("dune");

        store.save(&id, 754.5).await.unwrap();
        let progress = store.load(&id).await.unwrap().unwrap();

        assert_eq!(progress.book_id, id);
        assert_eq!(progress.position, 754.5);
        assert_eq!(progress.last_updated.timestamp_millis(), 1_700_000_000_123);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_position() {
        let store = store_at(0).await;
        let id = BookId::new("dune");

        store.save(&id, 10.0).await.unwrap();
        store.save(&id, 20.0).await.unwrap();

        assert_eq!(store.load(&id).await.unwrap().unwrap().position, 20.0);
    }

    #[tokio::test]
    async fn test_books_are_independent() {
        let store = store_at(0).await;

        store.save(&BookId::new("a"), 1.0).await.unwrap();
        store.save(&BookId::new("b"), 2.0).await.unwrap();
        store.remove(&BookId::new("a")).await.unwrap();

        assert!(store.load(&BookId::new("a")).await.unwrap().is_none());
        assert_eq!(
            store.load(&BookId::new("b")).await.unwrap().unwrap().position,
            2.0
        );
    }

    #[tokio::test]
    async fn test_position_is_never_negative() {
        let store = store_at(0).await;
        let id = BookId::new("dune");

        store.save(&id, -5.0).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap().unwrap().position, 0.0);

        assert!(store.save(&id, f64::NAN).await.is_err());
    }
}
