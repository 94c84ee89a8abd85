//! Observer registry.
//!
//! Observers are plain closures receiving a full [`PlayerState`]. They are
//! called synchronously, in registration order, on the thread that changed
//! the state. The registry never holds its lock while an observer runs, so
//! observers may subscribe, unsubscribe or drive the player themselves.

use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::warn;

use crate::state::PlayerState;

/// Observer callback.
pub type Listener = Arc<dyn Fn(&PlayerState) + Send + Sync>;

/// Identifies one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriberId, Listener)>>,
}

impl SubscriberRegistry {
    pub(crate) fn subscribe(&self, listener: Listener) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub(crate) fn clear(&self) {
        self.listeners.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Deliver `state` to every observer registered at the time of the call.
    ///
    /// A panicking observer is logged and skipped.
    pub(crate) fn notify(&self, state: &PlayerState) {
        let listeners: Vec<(SubscriberId, Listener)> = self
            .listeners
            .lock()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        for (id, listener) in listeners {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(state))) {
                warn!(
                    subscriber = id.0,
                    reason = panic_message(payload.as_ref()),
                    "Player subscriber panicked"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Handle returned by [`Player::subscribe`](crate::Player::subscribe).
///
/// Dropping it keeps the observer registered; call
/// [`unsubscribe`](Subscription::unsubscribe) to remove it.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    id: SubscriberId,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, registry: &Arc<SubscriberRegistry>) -> Self {
        Self {
            id,
            registry: Arc::downgrade(registry),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the observer. Returns `false` if it was already gone, e.g.
    /// because the player was destroyed.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .map_or(false, |registry| registry.unsubscribe(self.id))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> PlayerState {
        PlayerState::idle(1.0, 1.0, None)
    }

    #[test]
    fn delivers_in_registration_order() {
        let registry = SubscriberRegistry::default();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let calls = Arc::clone(&calls);
            registry.subscribe(Arc::new(move |_| calls.lock().push(label)));
        }

        registry.notify(&state());
        assert_eq!(*calls.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let registry = SubscriberRegistry::default();
        let delivered = Arc::new(AtomicU64::new(0));

        registry.subscribe(Arc::new(|_| panic!("observer bug")));
        let counter = Arc::clone(&delivered);
        registry.subscribe(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        registry.notify(&state());
        registry.notify(&state());
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn subscription_removes_only_its_listener() {
        let registry = Arc::new(SubscriberRegistry::default());
        let first = Subscription::new(registry.subscribe(Arc::new(|_| {})), &registry);
        let _second = Subscription::new(registry.subscribe(Arc::new(|_| {})), &registry);
        assert_eq!(registry.len(), 2);

        assert!(first.unsubscribe());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn listener_may_unsubscribe_itself_during_delivery() {
        let registry = Arc::new(SubscriberRegistry::default());
        let slot: Arc<Mutex<Option<SubscriberId>>> = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&registry);
        let own_id = Arc::clone(&slot);
        let id = registry.subscribe(Arc::new(move |_| {
            if let (Some(registry), Some(id)) = (weak.upgrade(), *own_id.lock()) {
                registry.unsubscribe(id);
            }
        }));
        *slot.lock() = Some(id);

        registry.notify(&state());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn unsubscribe_after_clear_reports_false() {
        let registry = Arc::new(SubscriberRegistry::default());
        let subscription = Subscription::new(registry.subscribe(Arc::new(|_| {})), &registry);
        registry.clear();
        assert!(!subscription.unsubscribe());
    }
}
