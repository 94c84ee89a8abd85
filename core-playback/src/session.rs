//! Session ownership.
//!
//! A session exclusively owns its engine, its autosave timer and the task
//! watching engine events. Dropping the session releases all three, so the
//! engine's `unload` runs exactly once no matter which path tears it down.

use bridge_traits::{AudioEngine, Book};
use core_async::task::JoinHandle;

use crate::autosave::AutosaveTimer;

pub(crate) enum Phase {
    Unloaded,
    Loading(PendingLoad),
    Ready(Session),
}

impl Phase {
    pub(crate) fn book(&self) -> Option<&Book> {
        match self {
            Phase::Unloaded => None,
            Phase::Loading(pending) => Some(&pending.book),
            Phase::Ready(session) => Some(&session.book),
        }
    }
}

/// A load in flight. The engine is attached once bytes have been read.
pub(crate) struct PendingLoad {
    pub(crate) generation: u64,
    pub(crate) book: Book,
    engine: Option<Box<dyn AudioEngine>>,
}

impl PendingLoad {
    pub(crate) fn new(generation: u64, book: Book) -> Self {
        Self {
            generation,
            book,
            engine: None,
        }
    }

    pub(crate) fn attach(&mut self, engine: Box<dyn AudioEngine>) {
        if let Some(mut previous) = self.engine.replace(engine) {
            previous.unload();
        }
    }

    /// Promote to a ready session. `None` if no engine was attached.
    pub(crate) fn into_session(mut self) -> Option<Session> {
        let engine = self.engine.take()?;
        Some(Session {
            generation: self.generation,
            book: self.book.clone(),
            engine,
            autosave: None,
            end_watcher: None,
        })
    }
}

impl Drop for PendingLoad {
    fn drop(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.unload();
        }
    }
}

pub(crate) struct Session {
    pub(crate) generation: u64,
    pub(crate) book: Book,
    engine: Box<dyn AudioEngine>,
    autosave: Option<AutosaveTimer>,
    end_watcher: Option<JoinHandle<()>>,
}

fn sanitize(seconds: f64) -> Option<f64> {
    (seconds.is_finite() && seconds >= 0.0).then_some(seconds)
}

impl Session {
    pub(crate) fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    /// Duration in seconds, `0.0` while unknown.
    pub(crate) fn duration(&self) -> f64 {
        sanitize(self.engine.duration()).unwrap_or(0.0)
    }

    /// Engine position if it is a usable value, capped at a known duration.
    pub(crate) fn valid_position(&self) -> Option<f64> {
        let position = sanitize(self.engine.position())?;
        let duration = self.duration();
        Some(if duration > 0.0 {
            position.min(duration)
        } else {
            position
        })
    }

    pub(crate) fn position(&self) -> f64 {
        self.valid_position().unwrap_or(0.0)
    }

    pub(crate) fn play(&mut self) {
        self.engine.play();
    }

    pub(crate) fn pause(&mut self) {
        self.engine.pause();
    }

    pub(crate) fn seek(&mut self, seconds: f64) {
        self.engine.set_position(seconds);
    }

    pub(crate) fn set_rate(&mut self, rate: f64) {
        self.engine.set_rate(rate);
    }

    pub(crate) fn set_volume(&mut self, volume: f64) {
        self.engine.set_volume(volume);
    }

    pub(crate) fn is_autosaving(&self) -> bool {
        self.autosave.as_ref().map_or(false, AutosaveTimer::is_active)
    }

    pub(crate) fn start_autosave(&mut self, timer: AutosaveTimer) {
        self.autosave = Some(timer);
    }

    pub(crate) fn stop_autosave(&mut self) {
        self.autosave = None;
    }

    pub(crate) fn watch_events(&mut self, watcher: JoinHandle<()>) {
        if let Some(previous) = self.end_watcher.replace(watcher) {
            previous.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(watcher) = self.end_watcher.take() {
            watcher.abort();
        }
        self.autosave = None;
        self.engine.unload();
    }
}
