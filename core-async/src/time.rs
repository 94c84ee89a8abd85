//! Time-related abstractions.
//!
//! Re-exports Tokio's timer primitives. `Instant` is Tokio's instant so that
//! paused-clock tests (`tokio::time::pause`) drive every timer in the core.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{interval_at, Duration, Instant};
//!
//! async fn example() {
//!     let period = Duration::from_secs(5);
//!     let mut ticker = interval_at(Instant::now() + period, period);
//!     ticker.tick().await;
//! }
//! ```

pub use tokio::time::{
    interval, interval_at, sleep, timeout, Instant, Interval, MissedTickBehavior, Sleep,
};

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};
