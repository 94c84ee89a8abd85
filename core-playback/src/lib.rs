//! # Playback Session Module
//!
//! Owns the lifecycle of the currently loaded audiobook.
//!
//! ## Overview
//!
//! This module handles:
//! - Loading a book into a fresh audio engine and restoring its saved position
//! - Transport controls (play, pause, seek, skip, speed, volume)
//! - Periodic autosave of the listening position while playing
//! - Fire-and-forget persistence of progress and settings
//! - Synchronous state snapshots for registered observers
//!
//! The [`Player`] holds at most one session. Loading a new book or calling
//! [`Player::destroy`] tears the current one down before anything else
//! happens, and every asynchronous completion is checked against a
//! generation token so work belonging to a replaced session is discarded.

mod autosave;
pub mod config;
pub mod error;
mod persistence;
pub mod player;
mod session;
pub mod state;
pub mod subscribers;

pub use config::PlayerConfig;
pub use error::{PlaybackError, PlaybackErrorKind, Result};
pub use player::Player;
pub use state::{PlaybackStatus, PlayerState};
pub use subscribers::{SubscriberId, Subscription};
