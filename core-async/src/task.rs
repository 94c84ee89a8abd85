//! Task spawning and execution abstractions.
//!
//! Spawned tasks run on the ambient Tokio runtime. Callers that own a
//! long-lived task (timers, workers) keep its [`JoinHandle`] and call
//! [`JoinHandle::abort`] when the owner is torn down.

pub use tokio::task::{yield_now, JoinError, JoinHandle};

/// Spawns a new asynchronous task on the current Tokio runtime.
///
/// # Panics
///
/// Panics when called outside of a Tokio runtime context.
///
/// # Examples
///
/// ```rust
/// use core_async::task::spawn;
///
/// # async fn example() {
/// let handle = spawn(async { 42 });
/// assert_eq!(handle.await.unwrap(), 42);
/// # }
/// ```
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Returns `true` when the caller is running inside a Tokio runtime.
pub fn in_runtime() -> bool {
    tokio::runtime::Handle::try_current().is_ok()
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
