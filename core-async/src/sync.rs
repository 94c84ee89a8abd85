//! Synchronization primitives.
//!
//! Async-aware channels re-exported from `tokio::sync`.

pub use tokio::sync::{broadcast, mpsc, oneshot};
