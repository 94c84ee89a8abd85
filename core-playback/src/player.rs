//! # Player
//!
//! The playback session manager.
//!
//! ## Lifecycle
//!
//! ```text
//! Unloaded ──load_book──> Loading ──ready──> Paused <──play/pause──> Playing
//!    ^                       │                  │                      │
//!    └───────load error──────┘                  └──destroy/load_book───┘
//! ```
//!
//! Every load mints a new generation. Completions that arrive for an older
//! generation (a replaced load, an engine that ended after `destroy`) are
//! discarded instead of mutating the current session.
//!
//! ## Threading
//!
//! `Player` is a cheap handle; clones share one session. Transport calls are
//! synchronous and return once the engine has been updated and observers have
//! been notified. Only [`Player::load_book`] suspends. The internal lock is
//! never held across an `.await` or while observers run.

use bridge_traits::storage::{MAX_PLAYBACK_SPEED, MIN_PLAYBACK_SPEED};
use bridge_traits::{
    AudioEngineFactory, Book, BookId, EngineEvent, EngineLoad, EngineOptions, Progress,
    ProgressStore, ResourceHandle, Settings, SettingsPatch, SettingsStore,
};
use bytes::Bytes;
use core_async::sync::{mpsc, oneshot};
use core_async::task::{self, JoinHandle};
use core_runtime::config::CoreConfig;
use core_runtime::events::{seconds_to_ms, CoreEvent, EventBus, PlaybackEvent};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, instrument, warn};

use crate::autosave::AutosaveTimer;
use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::persistence::Persister;
use crate::session::{PendingLoad, Phase, Session};
use crate::state::{PlaybackStatus, PlayerState};
use crate::subscribers::{SubscriberRegistry, Subscription};

/// Readiness signal and event stream of an engine being loaded.
type EngineSignals = (
    oneshot::Receiver<bridge_traits::Result<()>>,
    mpsc::UnboundedReceiver<EngineEvent>,
);

/// Playback session manager.
///
/// # Example
///
/// ```ignore
/// use core_playback::{Player, PlayerConfig};
///
/// let player = Player::new(&core_config, PlayerConfig::default());
/// let _subscription = player.subscribe(|state| println!("{:?}", state));
///
/// player.load_book(book, &resource).await?;
/// player.play()?;
/// player.skip_forward(None)?;
/// ```
#[derive(Clone)]
pub struct Player {
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<PlayerInner>,
    subscribers: Arc<SubscriberRegistry>,
    persister: Persister,
    config: PlayerConfig,
    progress_store: Arc<dyn ProgressStore>,
    settings_store: Arc<dyn SettingsStore>,
    engine_factory: Arc<dyn AudioEngineFactory>,
    events: Option<EventBus>,
}

struct PlayerInner {
    phase: Phase,
    generation: u64,
    volume: f64,
    speed: f64,
}

impl PlayerInner {
    fn snapshot(&self) -> PlayerState {
        match &self.phase {
            Phase::Ready(session) => PlayerState {
                is_playing: session.is_playing(),
                current_position: session.position(),
                duration: session.duration(),
                volume: self.volume,
                speed: self.speed,
                current_book_id: Some(session.book.id.clone()),
            },
            phase => PlayerState::idle(
                self.volume,
                self.speed,
                phase.book().map(|book| book.id.clone()),
            ),
        }
    }

    fn session_mut(&mut self) -> Result<&mut Session> {
        match &mut self.phase {
            Phase::Ready(session) => Ok(session),
            _ => Err(PlaybackError::NoActiveSession),
        }
    }

    fn session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::Ready(session) => Some(session),
            _ => None,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

impl Player {
    /// Create a player driving the capabilities in `core`.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidParameter` if `config` is invalid.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(core: &CoreConfig, config: PlayerConfig) -> Result<Self> {
        Self::build(core, config, None)
    }

    /// Like [`Player::new`], additionally publishing [`PlaybackEvent`]s on `events`.
    pub fn with_event_bus(core: &CoreConfig, config: PlayerConfig, events: EventBus) -> Result<Self> {
        Self::build(core, config, Some(events))
    }

    fn build(core: &CoreConfig, config: PlayerConfig, events: Option<EventBus>) -> Result<Self> {
        config.validate()?;

        let persister = Persister::spawn(
            Arc::clone(&core.progress_store),
            Arc::clone(&core.settings_store),
        );

        let shared = Shared {
            inner: Mutex::new(PlayerInner {
                phase: Phase::Unloaded,
                generation: 0,
                volume: 1.0,
                speed: 1.0,
            }),
            subscribers: Arc::new(SubscriberRegistry::default()),
            persister,
            config,
            progress_store: Arc::clone(&core.progress_store),
            settings_store: Arc::clone(&core.settings_store),
            engine_factory: Arc::clone(&core.engine_factory),
            events,
        };

        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Load `book` from `resource`, replacing any current session.
    ///
    /// The previous session is torn down before the first suspension point.
    /// On success the player is paused at the saved position with the saved
    /// speed applied.
    ///
    /// # Errors
    ///
    /// - `LoadFailed` if the bytes cannot be read or the engine reports an
    ///   error. The player is left `Unloaded`.
    /// - `LoadSuperseded` if another `load_book` or `destroy` started before
    ///   this load settled. The newer operation owns the player state.
    #[instrument(skip_all, fields(book_id = %book.id))]
    pub async fn load_book(&self, book: Book, resource: &dyn ResourceHandle) -> Result<()> {
        let shared = &self.shared;
        let book_id = book.id.clone();
        let generation = shared.begin_load(book);

        let bytes = match resource.get_bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                let reason = format!("failed to read {}: {}", resource.describe(), err);
                return Err(shared.fail_load(generation, book_id, reason));
            }
        };
        debug!(bytes = bytes.len(), resource = %resource.describe(), "Resource read");

        // The outgoing session's final position may still be queued.
        shared.persister.flush().await;
        let settings = shared.load_settings().await;
        let saved_position = shared.load_saved_position(&book_id).await;

        let Some((ready, events)) = shared.attach_engine(generation, bytes, &settings) else {
            debug!(generation, "Load superseded before engine creation");
            return Err(PlaybackError::LoadSuperseded(book_id));
        };

        let reason = match ready.await {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(_) => Some("engine dropped its readiness signal".to_string()),
        };

        match reason {
            Some(reason) => Err(shared.fail_load(generation, book_id, reason)),
            None => shared.complete_load(
                generation,
                book_id,
                events,
                saved_position,
                settings.effective_speed(),
            ),
        }
    }

    /// Tear down the current session and remove all observers.
    ///
    /// Safe to call at any point, including while a load is in flight, and
    /// any number of times. The last known position of a ready session is
    /// persisted on a best-effort basis.
    pub fn destroy(&self) {
        let shared = &self.shared;
        let (previous, state) = {
            let mut inner = shared.inner.lock();
            inner.generation += 1;
            let previous = std::mem::replace(&mut inner.phase, Phase::Unloaded);
            (previous, inner.snapshot())
        };

        let had_session = !matches!(previous, Phase::Unloaded);
        shared.retire(previous);

        if had_session {
            shared.subscribers.notify(&state);
            info!("Player destroyed");
        }
        shared.subscribers.clear();
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Resume playback and start autosaving.
    pub fn play(&self) -> Result<()> {
        let shared = &self.shared;
        let (state, book_id) = {
            let mut inner = shared.inner.lock();
            let session = inner.session_mut()?;
            session.play();
            if !session.is_autosaving() {
                let tick = Shared::autosave_tick(&self.shared, session.generation);
                session.start_autosave(AutosaveTimer::start(shared.config.autosave_interval, tick));
            }
            let book_id = session.book.id.clone();
            (inner.snapshot(), book_id)
        };

        shared.subscribers.notify(&state);
        shared.emit(PlaybackEvent::Started {
            book_id: book_id.to_string(),
        });
        Ok(())
    }

    /// Pause playback, save the position and stop autosaving.
    pub fn pause(&self) -> Result<()> {
        let shared = &self.shared;
        let (state, book_id, position) = {
            let mut inner = shared.inner.lock();
            let session = inner.session_mut()?;
            session.pause();
            session.stop_autosave();
            let book_id = session.book.id.clone();
            let position = session.valid_position();
            (inner.snapshot(), book_id, position)
        };

        if let Some(position) = position {
            shared.persister.save_progress(book_id.clone(), position);
        }
        shared.subscribers.notify(&state);
        shared.emit(PlaybackEvent::Paused {
            book_id: book_id.to_string(),
            position_ms: seconds_to_ms(state.current_position),
        });
        Ok(())
    }

    /// Pause if the engine is playing, play otherwise.
    pub fn toggle_play_pause(&self) -> Result<()> {
        let playing = {
            let inner = self.shared.inner.lock();
            inner
                .session()
                .ok_or(PlaybackError::NoActiveSession)?
                .is_playing()
        };

        if playing {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Move the playhead to `position`, clamped to `[0, duration]`.
    ///
    /// Infinite values clamp to the nearest bound; `NaN` is rejected.
    pub fn seek(&self, position: f64) -> Result<()> {
        self.shared.ensure_session()?;
        if position.is_nan() {
            return Err(PlaybackError::InvalidParameter(
                "seek position must be a number".to_string(),
            ));
        }

        self.shared
            .reposition(|_, duration| Some(position.max(0.0).min(duration)))
    }

    /// Jump back `seconds` (default from [`PlayerConfig`]), never below zero.
    pub fn skip_backward(&self, seconds: Option<f64>) -> Result<()> {
        self.shared.ensure_session()?;
        let amount = self.shared.skip_amount(seconds)?;

        self.shared
            .reposition(|current, _| Some((current - amount).max(0.0)))
    }

    /// Jump forward `seconds` (default from [`PlayerConfig`]), never past the
    /// end. Does nothing while the duration is unknown.
    pub fn skip_forward(&self, seconds: Option<f64>) -> Result<()> {
        self.shared.ensure_session()?;
        let amount = self.shared.skip_amount(seconds)?;

        self.shared.reposition(|current, duration| {
            (duration > 0.0).then(|| (current + amount).min(duration))
        })
    }

    /// Change the playback rate and remember it in the settings store.
    ///
    /// # Errors
    ///
    /// `InvalidSpeed` if `speed` lies outside `[0.5, 2.0]`.
    pub fn set_speed(&self, speed: f64) -> Result<()> {
        let shared = &self.shared;
        shared.ensure_session()?;
        if !(MIN_PLAYBACK_SPEED..=MAX_PLAYBACK_SPEED).contains(&speed) {
            return Err(PlaybackError::InvalidSpeed(speed));
        }

        let (state, book_id) = {
            let mut inner = shared.inner.lock();
            let session = inner.session_mut()?;
            session.set_rate(speed);
            let book_id = session.book.id.clone();
            inner.speed = speed;
            (inner.snapshot(), book_id)
        };

        shared.persister.save_settings(SettingsPatch::speed(speed));
        shared.subscribers.notify(&state);
        shared.emit(PlaybackEvent::SpeedChanged {
            book_id: book_id.to_string(),
            speed,
        });
        Ok(())
    }

    /// Change the output volume.
    ///
    /// # Errors
    ///
    /// `InvalidVolume` if `volume` lies outside `[0, 1]`.
    pub fn set_volume(&self, volume: f64) -> Result<()> {
        let shared = &self.shared;
        shared.ensure_session()?;
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlaybackError::InvalidVolume(volume));
        }

        let state = {
            let mut inner = shared.inner.lock();
            inner.session_mut()?.set_volume(volume);
            inner.volume = volume;
            inner.snapshot()
        };

        shared.subscribers.notify(&state);
        shared.emit(PlaybackEvent::VolumeChanged { volume });
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current position in seconds, `0.0` without a session.
    pub fn get_current_position(&self) -> f64 {
        self.shared
            .inner
            .lock()
            .session()
            .map_or(0.0, Session::position)
    }

    /// Duration in seconds, `0.0` without a session or while unknown.
    pub fn get_duration(&self) -> f64 {
        self.shared
            .inner
            .lock()
            .session()
            .map_or(0.0, Session::duration)
    }

    /// Snapshot of the current player state.
    pub fn get_state(&self) -> PlayerState {
        self.shared.inner.lock().snapshot()
    }

    /// The book being loaded or played.
    pub fn get_current_book(&self) -> Option<Book> {
        self.shared.inner.lock().phase.book().cloned()
    }

    /// Coarse lifecycle status, including `Loading`.
    pub fn status(&self) -> PlaybackStatus {
        match &self.shared.inner.lock().phase {
            Phase::Unloaded => PlaybackStatus::Unloaded,
            Phase::Loading(_) => PlaybackStatus::Loading,
            Phase::Ready(session) if session.is_playing() => PlaybackStatus::Playing,
            Phase::Ready(_) => PlaybackStatus::Paused,
        }
    }

    /// Saved progress for `book_id`, `None` if absent or unreadable.
    pub async fn saved_progress(&self, book_id: &BookId) -> Option<Progress> {
        match self.shared.progress_store.load(book_id).await {
            Ok(progress) => progress,
            Err(err) => {
                warn!(book_id = %book_id, error = %err, "Failed to load progress");
                None
            }
        }
    }

    // ========================================================================
    // Observers & persistence
    // ========================================================================

    /// Register an observer receiving a snapshot after every state change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&PlayerState) + Send + Sync + 'static,
    {
        let registry = &self.shared.subscribers;
        let id = registry.subscribe(Arc::new(listener));
        Subscription::new(id, registry)
    }

    /// Number of registered observers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }

    /// Wait until every progress/settings write queued so far has completed.
    pub async fn flush(&self) {
        self.shared.persister.flush().await;
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("status", &self.status())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Shared {
    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.events {
            bus.emit(CoreEvent::Playback(event)).ok();
        }
    }

    fn ensure_session(&self) -> Result<()> {
        self.inner
            .lock()
            .session()
            .map(|_| ())
            .ok_or(PlaybackError::NoActiveSession)
    }

    fn skip_amount(&self, seconds: Option<f64>) -> Result<f64> {
        let amount = seconds.unwrap_or(self.config.default_skip_seconds);
        if amount.is_finite() && amount > 0.0 {
            Ok(amount)
        } else {
            Err(PlaybackError::InvalidParameter(format!(
                "skip amount must be a positive number of seconds, got {}",
                amount
            )))
        }
    }

    /// Seek to `target(current, duration)`; `None` leaves everything untouched.
    fn reposition<F>(&self, target: F) -> Result<()>
    where
        F: FnOnce(f64, f64) -> Option<f64>,
    {
        let (state, book_id, position) = {
            let mut inner = self.inner.lock();
            let session = inner.session_mut()?;
            let Some(target) = target(session.position(), session.duration()) else {
                return Ok(());
            };
            session.seek(target);
            let book_id = session.book.id.clone();
            let position = session.valid_position();
            (inner.snapshot(), book_id, position)
        };

        if let Some(position) = position {
            self.persister.save_progress(book_id.clone(), position);
        }
        self.subscribers.notify(&state);
        self.emit(PlaybackEvent::PositionChanged {
            book_id: book_id.to_string(),
            position_ms: seconds_to_ms(state.current_position),
            duration_ms: seconds_to_ms(state.duration),
        });
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Load steps
    // ------------------------------------------------------------------------

    fn begin_load(&self, book: Book) -> u64 {
        let (previous, generation, state) = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            let generation = inner.generation;
            let previous = std::mem::replace(
                &mut inner.phase,
                Phase::Loading(PendingLoad::new(generation, book)),
            );
            (previous, generation, inner.snapshot())
        };

        self.retire(previous);
        debug!(generation, "Loading book");
        self.subscribers.notify(&state);
        generation
    }

    async fn load_settings(&self) -> Settings {
        match self.settings_store.load().await {
            Ok(settings) => settings,
            Err(err) => {
                warn!(error = %err, "Failed to load settings, using defaults");
                Settings::default()
            }
        }
    }

    async fn load_saved_position(&self, book_id: &BookId) -> Option<f64> {
        match self.progress_store.load(book_id).await {
            Ok(progress) => progress
                .map(|progress| progress.position)
                .filter(|position| position.is_finite() && *position >= 0.0),
            Err(err) => {
                warn!(book_id = %book_id, error = %err, "Failed to load progress");
                None
            }
        }
    }

    /// Create the engine and hand it to the pending load. Returns the
    /// signalling half, or `None` if the load was superseded meanwhile.
    fn attach_engine(
        &self,
        generation: u64,
        bytes: Bytes,
        settings: &Settings,
    ) -> Option<EngineSignals> {
        let options = {
            let inner = self.inner.lock();
            if !inner.is_current(generation) {
                return None;
            }
            EngineOptions {
                initial_rate: settings.effective_speed(),
                initial_volume: inner.volume,
            }
        };

        let EngineLoad {
            mut engine,
            ready,
            events,
        } = self.engine_factory.create(bytes, options);

        let mut inner = self.inner.lock();
        if let Phase::Loading(pending) = &mut inner.phase {
            if pending.generation == generation {
                pending.attach(engine);
                return Some((ready, events));
            }
        }
        drop(inner);

        engine.unload();
        None
    }

    fn fail_load(&self, generation: u64, book_id: BookId, reason: String) -> PlaybackError {
        let (previous, state) = {
            let mut inner = self.inner.lock();
            if !inner.is_current(generation) {
                debug!(generation, reason = %reason, "Discarding stale load failure");
                return PlaybackError::LoadSuperseded(book_id);
            }
            let previous = std::mem::replace(&mut inner.phase, Phase::Unloaded);
            (previous, inner.snapshot())
        };

        drop(previous);
        warn!(book_id = %book_id, reason = %reason, "Failed to load book");
        self.subscribers.notify(&state);
        self.emit(PlaybackEvent::Error {
            book_id: Some(book_id.to_string()),
            message: reason.clone(),
            recoverable: true,
        });

        PlaybackError::LoadFailed { book_id, reason }
    }

    fn complete_load(
        self: &Arc<Self>,
        generation: u64,
        book_id: BookId,
        events: mpsc::UnboundedReceiver<EngineEvent>,
        saved_position: Option<f64>,
        speed: f64,
    ) -> Result<()> {
        let (state, title) = {
            let mut inner = self.inner.lock();
            if !inner.is_current(generation) {
                debug!(generation, "Discarding stale engine ready");
                return Err(PlaybackError::LoadSuperseded(book_id));
            }

            let pending = match std::mem::replace(&mut inner.phase, Phase::Unloaded) {
                Phase::Loading(pending) => pending,
                other => {
                    inner.phase = other;
                    return Err(PlaybackError::LoadSuperseded(book_id));
                }
            };

            let Some(mut session) = pending.into_session() else {
                let state = inner.snapshot();
                drop(inner);
                self.subscribers.notify(&state);
                return Err(PlaybackError::LoadFailed {
                    book_id,
                    reason: "engine was never attached".to_string(),
                });
            };

            if let Some(position) = saved_position {
                let duration = session.duration();
                session.seek(if duration > 0.0 {
                    position.min(duration)
                } else {
                    position
                });
            }
            session.set_rate(speed);
            session.watch_events(spawn_event_watcher(Arc::downgrade(self), generation, events));

            let title = session.book.title.clone();
            inner.speed = speed;
            inner.phase = Phase::Ready(session);
            (inner.snapshot(), title)
        };

        info!(
            book_id = %book_id,
            position = state.current_position,
            duration = state.duration,
            speed,
            "Book loaded"
        );
        self.subscribers.notify(&state);
        self.emit(PlaybackEvent::Loaded {
            book_id: book_id.to_string(),
            title,
            position_ms: seconds_to_ms(state.current_position),
            duration_ms: seconds_to_ms(state.duration),
        });
        Ok(())
    }

    /// Release a phase that was swapped out of the player.
    fn retire(&self, previous: Phase) {
        match previous {
            Phase::Ready(session) => {
                let book_id = session.book.id.clone();
                if let Some(position) = session.valid_position() {
                    self.persister.save_progress(book_id.clone(), position);
                }
                drop(session);
                debug!(book_id = %book_id, "Session released");
                self.emit(PlaybackEvent::Unloaded {
                    book_id: book_id.to_string(),
                });
            }
            Phase::Loading(pending) => {
                debug!(generation = pending.generation, "In-flight load abandoned");
            }
            Phase::Unloaded => {}
        }
    }

    // ------------------------------------------------------------------------
    // Background work
    // ------------------------------------------------------------------------

    fn autosave_tick(shared: &Arc<Self>, generation: u64) -> impl FnMut() -> bool + Send + 'static {
        let shared = Arc::downgrade(shared);
        move || match shared.upgrade() {
            Some(shared) => shared.autosave(generation),
            None => false,
        }
    }

    /// One autosave tick. Returns `false` once the session is gone.
    fn autosave(&self, generation: u64) -> bool {
        let save = {
            let inner = self.inner.lock();
            match inner.session() {
                Some(session) if session.generation == generation => session
                    .is_playing()
                    .then(|| session.valid_position())
                    .flatten()
                    .map(|position| (session.book.id.clone(), position)),
                _ => return false,
            }
        };

        if let Some((book_id, position)) = save {
            self.persister.save_progress(book_id, position);
        }
        true
    }

    fn handle_ended(&self, generation: u64) {
        let (state, book_id, position) = {
            let mut inner = self.inner.lock();
            let Some(session) = inner
                .session_mut()
                .ok()
                .filter(|session| session.generation == generation)
            else {
                debug!(generation, "Ignoring end of a released session");
                return;
            };
            session.pause();
            session.stop_autosave();
            let book_id = session.book.id.clone();
            let position = session.valid_position();
            (inner.snapshot(), book_id, position)
        };

        info!(book_id = %book_id, "Reached end of book");
        if let Some(position) = position {
            self.persister.save_progress(book_id.clone(), position);
        }
        self.subscribers.notify(&state);
        self.emit(PlaybackEvent::Completed {
            book_id: book_id.to_string(),
        });
    }
}

fn spawn_event_watcher(
    shared: Weak<Shared>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
) -> JoinHandle<()> {
    task::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(shared) = shared.upgrade() else {
                break;
            };
            match event {
                EngineEvent::Ended => shared.handle_ended(generation),
            }
        }
    })
}
