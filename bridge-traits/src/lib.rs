//! # Host Bridge Traits
//!
//! Contracts between the audiobook playback core and the collaborators a host
//! application supplies.
//!
//! ## Overview
//!
//! The core never reads files, talks to a database or decodes audio itself.
//! Each capability below is injected by the host (or by `bridge-desktop` on
//! desktop targets) and driven by the core through a narrow interface.
//!
//! ## Traits
//!
//! ### Audio
//! - [`AudioEngine`](playback::AudioEngine) - A single loaded audio resource (play, pause, seek, rate)
//! - [`AudioEngineFactory`](playback::AudioEngineFactory) - Creates engines from raw bytes
//! - [`ResourceHandle`](resource::ResourceHandle) - Yields the bytes of a book file on demand
//!
//! ### Persistence
//! - [`ProgressStore`](storage::ProgressStore) - Last-played position per book
//! - [`SettingsStore`](storage::SettingsStore) - Playback speed and skip interval preferences
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and include enough context (file
//! names, keys) for the message to be actionable.
//!
//! ## Thread Safety
//!
//! Store, resource and factory traits require `Send + Sync` so a single
//! instance can be shared between the player and its background tasks. An
//! [`AudioEngine`](playback::AudioEngine) is only `Send`: it is exclusively
//! owned by one playback session.

pub mod error;
pub mod library;
pub mod playback;
pub mod resource;
pub mod storage;
pub mod time;

pub use error::{BridgeError, Result};

// Re-export commonly used types
pub use library::{Book, BookId};
pub use playback::{
    AudioEngine, AudioEngineFactory, EngineEvent, EngineLoad, EngineNotifier, EngineOptions,
};
pub use resource::{MemoryResource, ResourceHandle};
pub use storage::{Progress, ProgressStore, Settings, SettingsPatch, SettingsStore, SkipInterval};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
