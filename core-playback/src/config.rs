//! # Player Configuration
//!
//! Tunables of the playback session manager.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{PlaybackError, Result};

/// Player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// How often the position is saved while playing.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval: Duration,

    /// Skip distance used when `skip_forward`/`skip_backward` get no amount.
    ///
    /// Default: 30 seconds.
    #[serde(default = "default_skip_seconds")]
    pub default_skip_seconds: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            autosave_interval: default_autosave_interval(),
            default_skip_seconds: default_skip_seconds(),
        }
    }
}

impl PlayerConfig {
    /// Set the autosave period.
    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }

    /// Set the default skip distance in seconds.
    pub fn with_default_skip_seconds(mut self, seconds: f64) -> Self {
        self.default_skip_seconds = seconds;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.autosave_interval.is_zero() {
            return Err(PlaybackError::InvalidParameter(
                "autosave_interval must be greater than 0".to_string(),
            ));
        }

        if !self.default_skip_seconds.is_finite() || self.default_skip_seconds <= 0.0 {
            return Err(PlaybackError::InvalidParameter(format!(
                "default_skip_seconds must be a positive number, got {}",
                self.default_skip_seconds
            )));
        }

        Ok(())
    }
}

fn default_autosave_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_skip_seconds() -> f64 {
    30.0
}
