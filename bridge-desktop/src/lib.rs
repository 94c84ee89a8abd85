//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `ProgressStore` and `SettingsStore` backed by one SQLite database (`sqlx`)
//! - `ResourceHandle` for audio files on the local disk (`tokio::fs`)
//!
//! Both stores can share a single pool opened with [`open_pool`].
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{default_database_path, open_pool, SqliteProgressStore, SqliteSettingsStore};
//! use bridge_traits::SystemClock;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::Result<()> {
//!     let pool = open_pool(&default_database_path()).await?;
//!     let clock = Arc::new(SystemClock);
//!     let progress = SqliteProgressStore::new(pool.clone(), clock.clone()).await?;
//!     let settings = SqliteSettingsStore::new(pool, clock).await?;
//!
//!     // Use in core configuration
//!     Ok(())
//! }
//! ```

mod database;
mod filesystem;
mod progress;
mod settings;

pub use database::{default_database_path, in_memory_pool, open_pool};
pub use filesystem::FileResource;
pub use progress::SqliteProgressStore;
pub use settings::SqliteSettingsStore;
