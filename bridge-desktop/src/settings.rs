//! Settings Storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{Settings, SettingsPatch, SettingsStore, SkipInterval},
    time::{Clock, SystemClock},
};
use sqlx::{sqlite::SqlitePool, Row, Sqlite, Transaction};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::database::{self, db_error};

const KEY_SKIP_INTERVAL: &str = "preferred_skip_interval";
const KEY_PLAYBACK_SPEED: &str = "playback_speed";

const TYPE_I64: &str = "i64";
const TYPE_F64: &str = "f64";

/// SQLite-backed settings store implementation
///
/// Each preference is one typed row in a key-value table:
/// - missing or unreadable keys load as their defaults
/// - a patch is applied in a single transaction
pub struct SqliteSettingsStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteSettingsStore {
    /// Create a store on an existing pool, creating the table if needed.
    pub async fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                value_type TEXT NOT NULL,
                updated_at INTEGER NOT NULL
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
        debug!(path = ?db_path, "Initialized settings store");
        Ok(store)
    }

    /// Create an in-memory settings store (for testing)
    pub async fn in_memory() -> Result<Self> {
        Self::new(database::in_memory_pool().await?, Arc::new(SystemClock)).await
    }

    async fn set_value(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        key: &str,
        value: &str,
        value_type: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, value_type, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                value_type = excluded.value_type,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(value_type)
        .bind(self.clock.unix_timestamp())
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("Failed to set setting", e))?;

        debug!(key = key, value_type = value_type, "Stored setting");
        Ok(())
    }

    /// Get a value and verify its type
    async fn get_value(&self, key: &str, expected_type: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value, value_type FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get setting", e))?;

        match row {
            Some(row) => {
                let value: String = row.get(0);
                let value_type: String = row.get(1);

                if value_type != expected_type {
                    error!(
                        key = key,
                        expected = expected_type,
                        actual = value_type,
                        "Type mismatch"
                    );
                    return Err(BridgeError::OperationFailed(format!(
                        "Type mismatch: expected {}, got {}",
                        expected_type, value_type
                    )));
                }

                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn load_skip_interval(&self) -> Result<Option<SkipInterval>> {
        let Some(raw) = self.get_value(KEY_SKIP_INTERVAL, TYPE_I64).await? else {
            return Ok(None);
        };

        let parsed = raw
            .parse::<u32>()
            .map_err(|e| BridgeError::OperationFailed(format!("Parse error: {}", e)))
            .and_then(SkipInterval::try_from);

        match parsed {
            Ok(interval) => Ok(Some(interval)),
            Err(err) => {
                warn!(value = %raw, error = %err, "Ignoring stored skip interval");
                Ok(None)
            }
        }
    }

    async fn load_playback_speed(&self) -> Result<Option<f64>> {
        let Some(raw) = self.get_value(KEY_PLAYBACK_SPEED, TYPE_F64).await? else {
            return Ok(None);
        };

        match raw.parse::<f64>() {
            Ok(speed) if speed.is_finite() => Ok(Some(speed)),
            _ => {
                warn!(value = %raw, "Ignoring stored playback speed");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn load(&self) -> Result<Settings> {
        let defaults = Settings::default();
        let settings = Settings {
            preferred_skip_interval: self
                .load_skip_interval()
                .await?
                .unwrap_or(defaults.preferred_skip_interval),
            playback_speed: self
                .load_playback_speed()
                .await?
                .unwrap_or(defaults.playback_speed),
        };

        debug!(?settings, "Loaded settings");
        Ok(settings)
    }

    async fn save(&self, patch: SettingsPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        if let Some(interval) = patch.preferred_skip_interval {
            self.set_value(
                &mut tx,
                KEY_SKIP_INTERVAL,
                &interval.seconds().to_string(),
                TYPE_I64,
            )
            .await?;
        }
        if let Some(speed) = patch.playback_speed {
            self.set_value(&mut tx, KEY_PLAYBACK_SPEED, &speed.to_string(), TYPE_F64)
                .await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit", e))?;

        debug!(?patch, "Committed settings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_store_loads_defaults() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        assert_eq!(store.load().await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_patch_updates_only_present_fields() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.save(SettingsPatch::speed(1.5)).await.unwrap();
        let settings = store.load().await.unwrap();
        assert_eq!(settings.playback_speed, 1.5);
        assert_eq!(settings.preferred_skip_interval, SkipInterval::Thirty);

        store
            .save(SettingsPatch::skip_interval(SkipInterval::Sixty))
            .await
            .unwrap();
        let settings = store.load().await.unwrap();
        assert_eq!(settings.playback_speed, 1.5);
        assert_eq!(settings.preferred_skip_interval, SkipInterval::Sixty);
    }

    #[tokio::test]
    async fn test_later_save_overwrites() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.save(SettingsPatch::speed(0.75)).await.unwrap();
        store.save(SettingsPatch::speed(1.25)).await.unwrap();

        assert_eq!(store.load().await.unwrap().playback_speed, 1.25);
    }

    #[tokio::test]
    async fn test_unsupported_skip_interval_falls_back() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO settings (key, value, value_type, updated_at) VALUES (?, '45', 'i64', 0)",
        )
        .bind(KEY_SKIP_INTERVAL)
        .execute(&store.pool)
        .await
        .unwrap();

        let settings = store.load().await.unwrap();
        assert_eq!(settings.preferred_skip_interval, SkipInterval::Thirty);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_an_error() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO settings (key, value, value_type, updated_at) VALUES (?, 'fast', 'string', 0)",
        )
        .bind(KEY_PLAYBACK_SPEED)
        .execute(&store.pool)
        .await
        .unwrap();

        assert!(matches!(
            store.load().await,
            Err(BridgeError::OperationFailed(_))
        ));
    }
}
