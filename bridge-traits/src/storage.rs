//! Persistence Abstractions
//!
//! Provides platform-agnostic traits for the two records the playback core
//! persists: per-book listening progress and user playback preferences.
//!
//! Both stores are asynchronous and may fail. The core treats every write as
//! best-effort: failures are logged and never interrupt playback.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::library::BookId;

/// Slowest playback rate a user can choose.
pub const MIN_PLAYBACK_SPEED: f64 = 0.5;

/// Fastest playback rate a user can choose.
pub const MAX_PLAYBACK_SPEED: f64 = 2.0;

/// Last known listening position for a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub book_id: BookId,
    /// Position in seconds, never negative.
    pub position: f64,
    pub last_updated: DateTime<Utc>,
}

/// Skip interval offered by the transport controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SkipInterval {
    Fifteen,
    Thirty,
    Sixty,
}

impl SkipInterval {
    /// Interval length in seconds.
    pub fn seconds(self) -> u32 {
        match self {
            SkipInterval::Fifteen => 15,
            SkipInterval::Thirty => 30,
            SkipInterval::Sixty => 60,
        }
    }
}

impl Default for SkipInterval {
    fn default() -> Self {
        SkipInterval::Thirty
    }
}

impl TryFrom<u32> for SkipInterval {
    type Error = BridgeError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            15 => Ok(SkipInterval::Fifteen),
            30 => Ok(SkipInterval::Thirty),
            60 => Ok(SkipInterval::Sixty),
            other => Err(BridgeError::OperationFailed(format!(
                "Unsupported skip interval: {}s (expected 15, 30 or 60)",
                other
            ))),
        }
    }
}

impl From<SkipInterval> for u32 {
    fn from(value: SkipInterval) -> Self {
        value.seconds()
    }
}

/// User playback preferences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub preferred_skip_interval: SkipInterval,
    #[serde(default = "default_playback_speed")]
    pub playback_speed: f64,
}

fn default_playback_speed() -> f64 {
    1.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preferred_skip_interval: SkipInterval::default(),
            playback_speed: default_playback_speed(),
        }
    }
}

impl Settings {
    /// Playback speed if it lies in the supported range, `1.0` otherwise.
    pub fn effective_speed(&self) -> f64 {
        if (MIN_PLAYBACK_SPEED..=MAX_PLAYBACK_SPEED).contains(&self.playback_speed) {
            self.playback_speed
        } else {
            default_playback_speed()
        }
    }

    /// Return a copy with the fields present in `patch` replaced.
    pub fn merged(mut self, patch: &SettingsPatch) -> Self {
        if let Some(interval) = patch.preferred_skip_interval {
            self.preferred_skip_interval = interval;
        }
        if let Some(speed) = patch.playback_speed {
            self.playback_speed = speed;
        }
        self
    }
}

/// Partial settings update; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_skip_interval: Option<SkipInterval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback_speed: Option<f64>,
}

impl SettingsPatch {
    /// Patch that only updates the playback speed.
    pub fn speed(speed: f64) -> Self {
        Self {
            playback_speed: Some(speed),
            ..Self::default()
        }
    }

    /// Patch that only updates the preferred skip interval.
    pub fn skip_interval(interval: SkipInterval) -> Self {
        Self {
            preferred_skip_interval: Some(interval),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.preferred_skip_interval.is_none() && self.playback_speed.is_none()
    }
}

/// Per-book listening progress storage.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::ProgressStore;
///
/// async fn resume_point(store: &dyn ProgressStore, id: &BookId) -> f64 {
///     store.load(id).await.ok().flatten().map(|p| p.position).unwrap_or(0.0)
/// }
/// ```
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Load the saved progress for a book.
    ///
    /// Returns `Ok(None)` if nothing was saved yet.
    async fn load(&self, book_id: &BookId) -> Result<Option<Progress>>;

    /// Save the position for a book, stamping `last_updated` with the store's clock.
    async fn save(&self, book_id: &BookId, position: f64) -> Result<()>;
}

/// Playback preference storage.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load the current settings, falling back to defaults for missing keys.
    async fn load(&self) -> Result<Settings>;

    /// Apply a partial update.
    async fn save(&self, patch: SettingsPatch) -> Result<()>;
}
