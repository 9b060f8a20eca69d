//! # Event Subscriptions
//!
//! The host owns event dispatch; units only subscribe through the
//! [`EventHost`] boundary. [`EventBus`] is the in-process implementation used by
//! the demo binary and the tests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace};

/// A host event delivered to subscribed listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: String,
    pub player: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            player: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn player(mut self, player: impl Into<String>) -> Self {
        self.player = Some(player.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Receives events of the kinds it was subscribed to.
pub trait Listener: Send + Sync {
    fn on_event(&self, event: &Event);
}

impl<F> Listener for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        self(event)
    }
}

/// Opaque handle returned by [`EventHost::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Host-side event registration.
pub trait EventHost: Send + Sync {
    fn subscribe(&self, kind: &str, listener: Arc<dyn Listener>) -> SubscriptionId;

    /// Returns `false` when the id was not (or no longer) subscribed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

struct Subscription {
    kind: String,
    listener: Arc<dyn Listener>,
}

/// In-process [`EventHost`] with synchronous delivery.
#[derive(Default)]
pub struct EventBus {
    subscriptions: Mutex<BTreeMap<SubscriptionId, Subscription>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every listener of its kind, returning how many received it.
    ///
    /// Listeners run outside the lock, so they may subscribe or unsubscribe.
    pub fn publish(&self, event: &Event) -> usize {
        let targets: Vec<Arc<dyn Listener>> = {
            let subs = self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner);
            subs.values()
                .filter(|s| s.kind == event.kind)
                .map(|s| Arc::clone(&s.listener))
                .collect()
        };
        trace!(kind = %event.kind, listeners = targets.len(), "Publish");
        for listener in &targets {
            listener.on_event(event);
        }
        targets.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl EventHost for EventBus {
    fn subscribe(&self, kind: &str, listener: Arc<dyn Listener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Subscription {
                    kind: kind.to_string(),
                    listener,
                },
            );
        debug!(%id, kind, "Subscribed");
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        debug!(%id, removed, "Unsubscribed");
        removed
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn delivers_by_kind_until_unsubscribed() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = bus.subscribe(
            "player.chat",
            Arc::new(move |_: &Event| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(bus.publish(&Event::new("player.chat").player("alex")), 1);
        assert_eq!(bus.publish(&Event::new("player.join")), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.publish(&Event::new("player.chat")), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscription_count(), 0);
    }

    #[test]
    fn event_builder_sets_fields() {
        let event = Event::new("player.interact").player("alex").field("target", "sam");
        assert_eq!(event.player.as_deref(), Some("alex"));
        assert_eq!(event.get("target"), Some("sam"));
        assert_eq!(event.get("missing"), None);
    }
}
