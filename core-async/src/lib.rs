//! Async runtime seam for the audiobook core.
//!
//! Core crates depend on this crate instead of naming Tokio directly, so the
//! task, timer and channel primitives they use are collected in one place.
//!
//! # Modules
//!
//! - `task`: Task spawning and cancellation handles
//! - `time`: Sleep, intervals and instants
//! - `sync`: Channels used for engine signalling and background workers
//! - `runtime`: Access to the ambient runtime handle
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
