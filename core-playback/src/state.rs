//! Observable player state.

use bridge_traits::BookId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable snapshot of the player, recomputed on every request.
///
/// Positions and durations are in seconds. `current_position` lies in
/// `[0, duration]` whenever the duration is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub is_playing: bool,
    pub current_position: f64,
    pub duration: f64,
    /// Output volume in `[0, 1]`.
    pub volume: f64,
    /// Playback rate in `[0.5, 2.0]`.
    pub speed: f64,
    pub current_book_id: Option<BookId>,
}

impl PlayerState {
    /// Snapshot of a player with nothing bound to the engine.
    pub(crate) fn idle(volume: f64, speed: f64, current_book_id: Option<BookId>) -> Self {
        Self {
            is_playing: false,
            current_position: 0.0,
            duration: 0.0,
            volume,
            speed,
            current_book_id,
        }
    }
}

/// Coarse lifecycle state of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackStatus {
    /// No session.
    Unloaded,
    /// A book is being read and its engine initialized.
    Loading,
    /// Ready, not rendering audio.
    Paused,
    /// Ready and rendering audio; autosave is running.
    Playing,
}

impl PlaybackStatus {
    /// Whether transport calls are accepted.
    pub fn is_ready(self) -> bool {
        matches!(self, PlaybackStatus::Paused | PlaybackStatus::Playing)
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlaybackStatus::Unloaded => "unloaded",
            PlaybackStatus::Loading => "loading",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Playing => "playing",
        };
        f.write_str(label)
    }
}
