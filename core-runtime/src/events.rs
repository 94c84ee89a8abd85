//! # Event Bus System
//!
//! Provides an event-driven channel for the audiobook core using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The player notifies its registered observers synchronously with full state
//! snapshots. The event bus is the decoupled complement: components that only
//! care about *what happened* (a scrobbler, a sleep timer, a media-session
//! bridge) subscribe here and receive typed [`PlaybackEvent`]s asynchronously.
//!
//! ```text
//! ┌────────┐   emit    ┌───────────┐   subscribe   ┌────────────┐
//! │ Player ├──────────>│ EventBus  ├──────────────>│ Subscriber │
//! └────────┘           │ (broadcast│               └────────────┘
//!                      │  channel) ├──────────────>┌────────────┐
//!                      └───────────┘               │ Subscriber │
//!                                                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Playback(PlaybackEvent::Started {
//!         book_id: "book-1".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Playback started");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber was too slow and missed `n`
//!   events. Non-fatal; it keeps receiving newer events.
//! - **`RecvError::Closed`**: all senders were dropped. Treat as shutdown.
//!
//! Emitting with no subscribers returns an error; publishers ignore it.

use serde::{Deserialize, Serialize};
use std::fmt;

use core_async::sync::broadcast;

// Re-export commonly used types
pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall further behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback-related events
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error {
                recoverable: true, ..
            }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::Loaded { .. })
            | CoreEvent::Playback(PlaybackEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to audiobook playback.
///
/// Positions are reported in whole milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A book finished loading and is ready to play.
    Loaded {
        book_id: String,
        title: String,
        /// Restored position (milliseconds).
        position_ms: u64,
        duration_ms: u64,
    },
    /// Playback started or resumed.
    Started { book_id: String },
    /// Playback paused.
    Paused { book_id: String, position_ms: u64 },
    /// Playhead moved by a seek or skip.
    PositionChanged {
        book_id: String,
        position_ms: u64,
        duration_ms: u64,
    },
    /// Playback rate changed.
    SpeedChanged { book_id: String, speed: f64 },
    /// Output volume changed.
    VolumeChanged { volume: f64 },
    /// The book played through to its end.
    Completed { book_id: String },
    /// The session was torn down.
    Unloaded { book_id: String },
    /// Playback error occurred.
    Error {
        /// The book ID if available.
        book_id: Option<String>,
        /// Human-readable error message.
        message: String,
        /// Whether retrying (e.g. loading again) can succeed.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Loaded { .. } => "Book loaded",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::SpeedChanged { .. } => "Playback speed changed",
            PlaybackEvent::VolumeChanged { .. } => "Volume changed",
            PlaybackEvent::Completed { .. } => "Book completed",
            PlaybackEvent::Unloaded { .. } => "Book unloaded",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

/// Convert seconds to whole milliseconds for event payloads.
pub fn seconds_to_ms(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future
    /// events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let errors_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| event.severity() == EventSeverity::Error);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn started(book_id: &str) -> CoreEvent {
        CoreEvent::Playback(PlaybackEvent::Started {
            book_id: book_id.to_string(),
        })
    }

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(started("b1")).is_err());
    }

    #[tokio::test]
    async fn test_event_emission_with_subscribers() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        assert_eq!(bus.emit(started("b1")).unwrap(), 2);
        assert_eq!(sub1.recv().await.unwrap(), started("b1"));
        assert_eq!(sub2.recv().await.unwrap(), started("b1"));
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(started(&format!("b{}", i))).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(3))));
        assert_eq!(sub.recv().await.unwrap(), started("b3"));
    }

    #[tokio::test]
    async fn test_event_stream_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| event.severity() == EventSeverity::Error);

        bus.emit(started("b1")).ok();
        bus.emit(CoreEvent::Playback(PlaybackEvent::Error {
            book_id: Some("b1".to_string()),
            message: "decoder failed".to_string(),
            recoverable: false,
        }))
        .ok();

        let event = stream.recv().await.unwrap();
        assert_eq!(event.description(), "Playback error");
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_event_stream_closed() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        drop(bus);
        assert!(matches!(stream.recv().await, Err(RecvError::Closed)));
    }

    #[test]
    fn test_event_severity() {
        let loaded = CoreEvent::Playback(PlaybackEvent::Loaded {
            book_id: "b1".to_string(),
            title: "Dune".to_string(),
            position_ms: 0,
            duration_ms: 1000,
        });
        assert_eq!(loaded.severity(), EventSeverity::Info);
        assert_eq!(started("b1").severity(), EventSeverity::Debug);

        let error = |recoverable| {
            CoreEvent::Playback(PlaybackEvent::Error {
                book_id: None,
                message: "unreadable".to_string(),
                recoverable,
            })
        };
        assert_eq!(error(true).severity(), EventSeverity::Warning);
        assert_eq!(error(false).severity(), EventSeverity::Error);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Playback(PlaybackEvent::Paused {
            book_id: "b1".to_string(),
            position_ms: 1500,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Playback\""));
        assert!(json.contains("\"event\":\"Paused\""));

        let back: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_seconds_to_ms() {
        assert_eq!(seconds_to_ms(125.5), 125_500);
        assert_eq!(seconds_to_ms(-3.0), 0);
        assert_eq!(seconds_to_ms(f64::NAN), 0);
    }
}
