//! # Playback Error Types
//!
//! Errors surfaced by the [`Player`](crate::Player).
//!
//! Persistence failures never appear here: the player logs them and keeps
//! playing. What remains falls into four stable kinds, exposed through
//! [`PlaybackError::kind`] so hosts can branch without matching on messages.

use bridge_traits::BookId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bridge_traits::storage::{MAX_PLAYBACK_SPEED, MIN_PLAYBACK_SPEED};

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    // ========================================================================
    // Session Errors
    // ========================================================================
    /// A transport call was made while nothing is loaded (or still loading).
    #[error("No active session")]
    NoActiveSession,

    // ========================================================================
    // Parameter Errors
    // ========================================================================
    /// Playback speed outside the supported range.
    #[error(
        "Invalid speed: {0} (must be between {min} and {max})",
        min = MIN_PLAYBACK_SPEED,
        max = MAX_PLAYBACK_SPEED
    )]
    InvalidSpeed(f64),

    /// Invalid volume value (must be in range [0.0, 1.0]).
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f64),

    /// Any other rejected argument or configuration value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    // ========================================================================
    // Load Errors
    // ========================================================================
    /// Reading the resource or initializing the engine failed.
    #[error("Failed to load book {book_id}: {reason}")]
    LoadFailed { book_id: BookId, reason: String },

    /// Another load or a destroy started before this load settled.
    #[error("Load of book {0} was superseded")]
    LoadSuperseded(BookId),
}

/// Stable discriminator for [`PlaybackError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackErrorKind {
    NoSession,
    InvalidParameter,
    LoadFailure,
    Superseded,
}

impl PlaybackError {
    /// Returns the stable kind of this error.
    pub fn kind(&self) -> PlaybackErrorKind {
        match self {
            PlaybackError::NoActiveSession => PlaybackErrorKind::NoSession,
            PlaybackError::InvalidSpeed(_)
            | PlaybackError::InvalidVolume(_)
            | PlaybackError::InvalidParameter(_) => PlaybackErrorKind::InvalidParameter,
            PlaybackError::LoadFailed { .. } => PlaybackErrorKind::LoadFailure,
            PlaybackError::LoadSuperseded(_) => PlaybackErrorKind::Superseded,
        }
    }

    /// Returns `true` if calling `load_book` again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), PlaybackErrorKind::LoadFailure)
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(
            PlaybackError::NoActiveSession.kind(),
            PlaybackErrorKind::NoSession
        );
        assert_eq!(
            PlaybackError::InvalidSpeed(3.0).kind(),
            PlaybackErrorKind::InvalidParameter
        );
        assert_eq!(
            PlaybackError::InvalidVolume(-0.1).kind(),
            PlaybackErrorKind::InvalidParameter
        );

        let failed = PlaybackError::LoadFailed {
            book_id: BookId::new("b1"),
            reason: "unsupported codec".to_string(),
        };
        assert_eq!(failed.kind(), PlaybackErrorKind::LoadFailure);
        assert!(failed.is_retryable());
        assert!(!PlaybackError::LoadSuperseded(BookId::new("b1")).is_retryable());
    }

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(PlaybackError::NoActiveSession.to_string(), "No active session");
        assert_eq!(
            PlaybackError::InvalidSpeed(2.5).to_string(),
            "Invalid speed: 2.5 (must be between 0.5 and 2)"
        );

        let failed = PlaybackError::LoadFailed {
            book_id: BookId::new("dune"),
            reason: "decoder error".to_string(),
        };
        assert_eq!(failed.to_string(), "Failed to load book dune: decoder error");
    }
}
