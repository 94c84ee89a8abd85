//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (progress and
//! settings stores, audio engine factory, clock) into the playback core and
//! exposes a single [`CoreService`] handle. Desktop apps typically enable the
//! `desktop-shims` feature (which depends on `bridge-desktop`) and call
//! [`bootstrap_desktop`]; other hosts build a [`CoreConfig`] themselves.

pub mod error;

pub use error::{CoreError, Result};

pub use core_playback::{Player, PlayerConfig};
pub use core_runtime::config::CoreConfig;
pub use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};

use std::sync::Arc;

use tracing::info;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::default_database_path;

struct ServiceInner {
    config: CoreConfig,
    player: Player,
    events: EventBus,
}

/// Primary façade exposed to host applications.
///
/// Owns one [`Player`] and the [`EventBus`] it publishes on. Cloning is cheap
/// and every clone drives the same player.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

impl CoreService {
    /// Create a new service from a validated configuration.
    ///
    /// Must be called inside a Tokio runtime; the player spawns its
    /// persistence worker immediately.
    pub fn new(config: CoreConfig, player_config: PlayerConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let player = Player::with_event_bus(&config, player_config, events.clone())?;

        info!(
            event_buffer_size = config.event_buffer_size,
            "Core service initialized"
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                player,
                events,
            }),
        })
    }

    /// The playback session manager.
    pub fn player(&self) -> &Player {
        &self.inner.player
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// New stream of core events, starting with the next one emitted.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    /// Tear down the active session and wait for pending writes to land.
    pub async fn shutdown(&self) {
        self.inner.player.destroy();
        self.inner.player.flush().await;
        info!("Core service shut down");
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("player", &self.inner.player)
            .field("event_subscribers", &self.inner.events.subscriber_count())
            .finish()
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Opens (or creates) the SQLite database at `db_path` and backs both the
/// progress and the settings store with it. The host still supplies the
/// audio engine.
///
/// ```ignore
/// use core_service::{bootstrap_desktop, default_database_path, PlayerConfig};
///
/// let core = bootstrap_desktop(&default_database_path(), engine_factory, PlayerConfig::default()).await?;
/// core.player().load_book(book, &resource).await?;
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(
    db_path: &std::path::Path,
    engine_factory: Arc<dyn bridge_traits::AudioEngineFactory>,
    player_config: PlayerConfig,
) -> Result<CoreService> {
    use bridge_desktop::{open_pool, SqliteProgressStore, SqliteSettingsStore};
    use bridge_traits::{Clock, SystemClock};

    let pool = open_pool(db_path).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let progress = SqliteProgressStore::new(pool.clone(), Arc::clone(&clock)).await?;
    let settings = SqliteSettingsStore::new(pool, Arc::clone(&clock)).await?;

    let config = CoreConfig::builder()
        .progress_store(Arc::new(progress))
        .settings_store(Arc::new(settings))
        .engine_factory(engine_factory)
        .clock(clock)
        .build()?;

    CoreService::new(config, player_config)
}
