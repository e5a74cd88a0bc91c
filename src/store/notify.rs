//! Change notification after context saves
//!
//! Every successful save publishes one `ChangeEvent` on a broadcast channel
//! owned by the `Store`. Publishing happens on whatever thread performed the
//! save; subscribers receive events on their own task and must re-read
//! records through their own context.

use super::context::ContextInfo;
use crate::model::EntityId;
use std::collections::BTreeSet;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::debug;

/// Default number of buffered events before slow subscribers lag
pub const DEFAULT_CAPACITY: usize = 64;

/// What one context save changed
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// The context that performed the save
    pub source: ContextInfo,
    pub inserted: BTreeSet<EntityId>,
    pub updated: BTreeSet<EntityId>,
    pub deleted: BTreeSet<EntityId>,
}

impl ChangeEvent {
    pub fn new(source: ContextInfo) -> Self {
        Self {
            source,
            inserted: BTreeSet::new(),
            updated: BTreeSet::new(),
            deleted: BTreeSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// True if the event mentions `id` in any set
    pub fn touches(&self, id: &EntityId) -> bool {
        self.inserted.contains(id) || self.updated.contains(id) || self.deleted.contains(id)
    }
}

/// What a subscriber receives
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Changed(ChangeEvent),
    /// Events were dropped because the subscriber fell behind; reload everything
    Resync,
}

/// Broadcasts `ChangeEvent`s to every live subscription
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event, returning the number of subscribers that will see it
    pub fn publish(&self, event: ChangeEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                debug!("change event published with no subscribers");
                0
            }
        }
    }

    /// Subscribe to events published from now on.
    ///
    /// The subscription ends when it is dropped.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A live subscription to store changes
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    /// Wait for the next notification. Returns `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        match self.rx.recv().await {
            Ok(event) => Some(Notification::Changed(event)),
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "subscriber lagged behind change events");
                Some(Notification::Resync)
            }
            Err(RecvError::Closed) => None,
        }
    }

    /// Take the next queued notification without waiting
    pub fn try_recv(&mut self) -> Option<Notification> {
        match self.rx.try_recv() {
            Ok(event) => Some(Notification::Changed(event)),
            Err(TryRecvError::Lagged(skipped)) => {
                debug!(skipped, "subscriber lagged behind change events");
                Some(Notification::Resync)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::context::ContextId;

    fn info() -> ContextInfo {
        ContextInfo {
            id: ContextId::new(),
            name: "test".to_string(),
            transaction_author: None,
        }
    }

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let notifier = ChangeNotifier::default();
        assert_eq!(notifier.publish(ChangeEvent::new(info())), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let notifier = ChangeNotifier::default();
        let mut sub = notifier.subscribe();

        let mut event = ChangeEvent::new(info());
        let id = EntityId::new();
        event.inserted.insert(id);
        assert_eq!(notifier.publish(event.clone()), 1);

        match sub.recv().await {
            Some(Notification::Changed(received)) => {
                assert!(received.touches(&id));
                assert_eq!(received, event);
            }
            other => panic!("unexpected notification: {:?}", other),
        }
    }

    #[test]
    fn lagging_subscriber_is_told_to_resync() {
        let notifier = ChangeNotifier::new(2);
        let mut sub = notifier.subscribe();
        for _ in 0..5 {
            notifier.publish(ChangeEvent::new(info()));
        }
        assert_eq!(sub.try_recv(), Some(Notification::Resync));
        // After the lag notice the remaining buffered events are delivered
        assert!(matches!(sub.try_recv(), Some(Notification::Changed(_))));
    }

    #[test]
    fn dropped_subscription_stops_counting() {
        let notifier = ChangeNotifier::default();
        let sub = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 1);
        drop(sub);
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
