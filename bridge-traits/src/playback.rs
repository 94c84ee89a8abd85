//! Playback bridge traits.
//!
//! The audio engine is the low-level decode/output primitive the player
//! drives. One engine instance wraps exactly one loaded resource. Creation is
//! synchronous, but the engine only becomes usable once it settles its
//! readiness signal, which it does exactly once (ready or failed).
//!
//! Engines implement [`AudioEngine`]; hosts hand the player an
//! [`AudioEngineFactory`] that builds them from raw bytes.

use bytes::Bytes;
use core_async::sync::{mpsc, oneshot};

use crate::error::{BridgeError, Result};

/// Options applied when an engine is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    /// Initial playback rate (1.0 = normal speed).
    pub initial_rate: f64,
    /// Initial volume (0.0 = muted, 1.0 = unity gain).
    pub initial_volume: f64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            initial_rate: 1.0,
            initial_volume: 1.0,
        }
    }
}

/// Notifications an engine raises after it has become ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Playback reached the end of the resource and stopped.
    Ended,
}

/// A single loaded audio resource.
///
/// All methods are synchronous and must be cheap: they are called while the
/// player holds its state lock. Positions and durations are in seconds.
pub trait AudioEngine: Send {
    fn play(&mut self);

    fn pause(&mut self);

    /// Whether audio is currently being rendered.
    fn is_playing(&self) -> bool;

    /// Current position in seconds.
    fn position(&self) -> f64;

    /// Move the playhead to `seconds`.
    fn set_position(&mut self, seconds: f64);

    /// Current playback rate.
    fn rate(&self) -> f64;

    fn set_rate(&mut self, rate: f64);

    fn set_volume(&mut self, volume: f64);

    /// Total duration in seconds, `0.0` while unknown.
    fn duration(&self) -> f64;

    /// Release decoder and output resources. Called exactly once per engine.
    fn unload(&mut self);
}

/// Builds engines from encoded audio bytes.
pub trait AudioEngineFactory: Send + Sync {
    /// Start loading `bytes`. The returned [`EngineLoad`] settles asynchronously.
    fn create(&self, bytes: Bytes, options: EngineOptions) -> EngineLoad;
}

/// An engine whose load is in flight.
pub struct EngineLoad {
    /// The engine instance. Usable only after `ready` resolves to `Ok`.
    pub engine: Box<dyn AudioEngine>,
    /// Single-settlement readiness signal.
    pub ready: oneshot::Receiver<Result<()>>,
    /// Notifications raised after readiness.
    pub events: mpsc::UnboundedReceiver<EngineEvent>,
}

impl EngineLoad {
    /// Pair an engine with fresh signalling channels.
    ///
    /// The returned [`EngineNotifier`] is kept by the engine implementation
    /// (or its decode thread) to settle readiness and report events.
    pub fn channel(engine: Box<dyn AudioEngine>) -> (Self, EngineNotifier) {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        (
            Self {
                engine,
                ready: ready_rx,
                events: events_rx,
            },
            EngineNotifier {
                ready: Some(ready_tx),
                events: events_tx,
            },
        )
    }
}

impl std::fmt::Debug for EngineLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineLoad")
            .field("engine", &"AudioEngine { ... }")
            .finish()
    }
}

/// Engine-side half of the signalling channels.
#[derive(Debug)]
pub struct EngineNotifier {
    ready: Option<oneshot::Sender<Result<()>>>,
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineNotifier {
    /// Report a successful load. Later settles are ignored.
    pub fn ready(&mut self) {
        self.settle(Ok(()));
    }

    /// Report a failed load. Later settles are ignored.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.settle(Err(BridgeError::Engine(message.into())));
    }

    /// Whether readiness has already been reported.
    pub fn is_settled(&self) -> bool {
        self.ready.is_none()
    }

    /// Report that playback reached the end of the resource.
    ///
    /// Returns `false` when nobody is listening anymore.
    pub fn ended(&self) -> bool {
        self.events.send(EngineEvent::Ended).is_ok()
    }

    fn settle(&mut self, outcome: Result<()>) {
        if let Some(tx) = self.ready.take() {
            // The player may already have given up on this load.
            let _ = tx.send(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SilentEngine;

    impl AudioEngine for SilentEngine {
        fn play(&mut self) {}
        fn pause(&mut self) {}
        fn is_playing(&self) -> bool {
            false
        }
        fn position(&self) -> f64 {
            0.0
        }
        fn set_position(&mut self, _seconds: f64) {}
        fn rate(&self) -> f64 {
            1.0
        }
        fn set_rate(&mut self, _rate: f64) {}
        fn set_volume(&mut self, _volume: f64) {}
        fn duration(&self) -> f64 {
            0.0
        }
        fn unload(&mut self) {}
    }

    #[test]
    fn engine_options_default_values() {
        let opts = EngineOptions::default();
        assert_eq!(opts.initial_rate, 1.0);
        assert_eq!(opts.initial_volume, 1.0);
    }

    #[tokio::test]
    async fn notifier_settles_only_once() {
        let (load, mut notifier) = EngineLoad::channel(Box::new(SilentEngine));
        assert!(!notifier.is_settled());

        notifier.ready();
        notifier.fail("too late");
        assert!(notifier.is_settled());

        assert!(load.ready.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn notifier_reports_failure() {
        let (load, mut notifier) = EngineLoad::channel(Box::new(SilentEngine));
        notifier.fail("unsupported codec");

        let err = load.ready.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("unsupported codec"));
    }

    #[tokio::test]
    async fn dropped_notifier_closes_ready_signal() {
        let (load, notifier) = EngineLoad::channel(Box::new(SilentEngine));
        drop(notifier);
        assert!(load.ready.await.is_err());
    }

    #[tokio::test]
    async fn ended_events_are_delivered() {
        let (mut load, notifier) = EngineLoad::channel(Box::new(SilentEngine));
        assert!(notifier.ended());
        assert_eq!(load.events.recv().await, Some(EngineEvent::Ended));

        drop(load);
        assert!(!notifier.ended());
    }
}
