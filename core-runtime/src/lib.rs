//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the audiobook core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the playback core depends on.
//! It establishes the logging conventions, the fail-fast wiring of host
//! capabilities, and the broadcast channel used to publish playback events.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
