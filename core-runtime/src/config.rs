//! # Core Configuration Module
//!
//! Provides configuration management for the audiobook core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host capabilities the player drives. It enforces
//! fail-fast validation so a missing capability is reported at startup with
//! an actionable message instead of surfacing as a playback failure later.
//!
//! ## Required Dependencies
//!
//! - `ProgressStore` - Per-book listening position
//! - `SettingsStore` - Playback speed and skip interval preferences
//! - `AudioEngineFactory` - Builds audio engines from encoded bytes
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `Clock` - Time source (default: [`SystemClock`])
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .progress_store(Arc::new(MyProgressStore))
//!     .settings_store(Arc::new(MySettingsStore))
//!     .engine_factory(Arc::new(MyEngineFactory))
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // This will panic with an actionable error message
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AudioEngineFactory, Clock, ProgressStore, SettingsStore, SystemClock};
use std::sync::Arc;

/// Core configuration for the audiobook core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Listening progress persistence (required)
    pub progress_store: Arc<dyn ProgressStore>,

    /// User preference persistence (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Audio engine constructor (required)
    pub engine_factory: Arc<dyn AudioEngineFactory>,

    /// Time source
    pub clock: Arc<dyn Clock>,

    /// Per-subscriber buffer of the playback event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("progress_store", &"ProgressStore { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("engine_factory", &"AudioEngineFactory { ... }")
            .field("clock", &"Clock { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn progress_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "ProgressStore".to_string(),
        message: "ProgressStore implementation is required to resume books where they were left. \
                 Desktop: use bridge_desktop::SqliteProgressStore. \
                 Mobile: inject a store backed by the platform key-value storage."
            .to_string(),
    }
}

fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for playback preferences. \
                 Desktop: use bridge_desktop::SqliteSettingsStore. \
                 Mobile: inject platform-native settings (UserDefaults/DataStore)."
            .to_string(),
    }
}

fn engine_factory_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioEngineFactory".to_string(),
        message: "AudioEngineFactory implementation is required to decode and play audio. \
                 Inject the host's audio engine adapter."
            .to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    progress_store: Option<Arc<dyn ProgressStore>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    engine_factory: Option<Arc<dyn AudioEngineFactory>>,
    clock: Option<Arc<dyn Clock>>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the progress store implementation (required).
    pub fn progress_store(mut self, store: Arc<dyn ProgressStore>) -> Self {
        self.progress_store = Some(store);
        self
    }

    /// Sets the settings store implementation (required).
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the audio engine factory (required).
    pub fn engine_factory(mut self, factory: Arc<dyn AudioEngineFactory>) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    /// Sets the time source.
    ///
    /// Default: [`SystemClock`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the per-subscriber buffer of the event bus.
    ///
    /// Default: 100 events
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `Error::CapabilityMissing` naming the first required
    /// capability that was not provided, or `Error::Config` when a value is
    /// out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let progress_store = self
            .progress_store
            .ok_or_else(progress_store_missing_error)?;
        let settings_store = self
            .settings_store
            .ok_or_else(settings_store_missing_error)?;
        let engine_factory = self
            .engine_factory
            .ok_or_else(engine_factory_missing_error)?;

        let config = CoreConfig {
            progress_store,
            settings_store,
            engine_factory,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{
        BookId, EngineLoad, EngineOptions, Progress, Settings, SettingsPatch,
    };

    struct NullProgressStore;

    #[async_trait]
    impl ProgressStore for NullProgressStore {
        async fn load(&self, _book_id: &BookId) -> bridge_traits::Result<Option<Progress>> {
            Ok(None)
        }

        async fn save(&self, _book_id: &BookId, _position: f64) -> bridge_traits::Result<()> {
            Ok(())
        }
    }

    struct NullSettingsStore;

    #[async_trait]
    impl SettingsStore for NullSettingsStore {
        async fn load(&self) -> bridge_traits::Result<Settings> {
            Ok(Settings::default())
        }

        async fn save(&self, _patch: SettingsPatch) -> bridge_traits::Result<()> {
            Ok(())
        }
    }

    struct UnusedFactory;

    impl AudioEngineFactory for UnusedFactory {
        fn create(&self, _bytes: bytes::Bytes, _options: EngineOptions) -> EngineLoad {
            unimplemented!("not exercised by config tests")
        }
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .progress_store(Arc::new(NullProgressStore))
            .settings_store(Arc::new(NullSettingsStore))
            .engine_factory(Arc::new(UnusedFactory))
    }

    #[test]
    fn test_builder_with_all_required() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.clock.unix_timestamp() > 0);
    }

    #[test]
    fn test_missing_progress_store() {
        let result = CoreConfig::builder()
            .settings_store(Arc::new(NullSettingsStore))
            .engine_factory(Arc::new(UnusedFactory))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "ProgressStore")
            }
            other => panic!("expected missing ProgressStore, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_settings_store() {
        let result = CoreConfig::builder()
            .progress_store(Arc::new(NullProgressStore))
            .engine_factory(Arc::new(UnusedFactory))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "SettingsStore"
        ));
    }

    #[test]
    fn test_missing_engine_factory() {
        let result = CoreConfig::builder()
            .progress_store(Arc::new(NullProgressStore))
            .settings_store(Arc::new(NullSettingsStore))
            .build();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("AudioEngineFactory"));
    }

    #[test]
    fn test_zero_event_buffer_rejected() {
        let result = complete_builder().event_buffer_size(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = complete_builder().event_buffer_size(8).build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("ProgressStore { ... }"));
        assert!(debug.contains("event_buffer_size: 8"));
    }
}
