// ABOUTME: Change notifications and their kind-filtered fan-out.
// ABOUTME: Publishing never blocks; each subscriber receives events in mutation order.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::state::StateSnapshot;
use super::{ChangeKind, KindFilter};

/// Notification that a deployment process changed.
///
/// `state` is the snapshot taken right after the mutation. Compare its
/// version with the live process to tell whether newer changes happened since.
#[derive(Debug, Clone, Serialize)]
pub struct StateChanged {
    pub kind: ChangeKind,
    pub state: Arc<StateSnapshot>,
}

impl StateChanged {
    pub fn new(state: Arc<StateSnapshot>, kind: ChangeKind) -> Self {
        Self { kind, state }
    }

    /// Version of the state this event was created for.
    pub fn version(&self) -> u64 {
        self.state.version
    }
}

/// Destination for change notifications.
///
/// Implementations must return promptly; delivery to subscribers happens
/// elsewhere.
pub trait EventSink: Send + Sync + 'static {
    fn publish(&self, event: StateChanged);
}

impl EventSink for mpsc::UnboundedSender<StateChanged> {
    fn publish(&self, event: StateChanged) {
        if self.send(event).is_err() {
            tracing::debug!("event receiver dropped");
        }
    }
}

impl<T: EventSink> EventSink for Arc<T> {
    fn publish(&self, event: StateChanged) {
        (**self).publish(event)
    }
}

struct Subscriber {
    filter: KindFilter,
    tx: mpsc::UnboundedSender<StateChanged>,
}

/// In-process publish/subscribe bus with per-subscriber kind filters.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber receiving the kinds accepted by `filter`.
    pub fn subscribe(&self, filter: KindFilter) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(Subscriber { filter, tx });
        Subscription { rx }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| !s.tx.is_closed());
        subscribers.len()
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: StateChanged) {
        let mut subscribers = self.subscribers.lock();
        // Dropped subscriptions are pruned on the way.
        subscribers.retain(|s| {
            if !s.filter.accepts(event.kind) {
                return !s.tx.is_closed();
            }
            s.tx.send(event.clone()).is_ok()
        });
        tracing::trace!(
            kind = %event.kind,
            version = event.version(),
            subscribers = subscribers.len(),
            "published state change"
        );
    }
}

/// Receiving end of an [`EventBus`] subscription.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<StateChanged>,
}

impl Subscription {
    /// Wait for the next event. `None` once the bus is gone and the queue is drained.
    pub async fn recv(&mut self) -> Option<StateChanged> {
        self.rx.recv().await
    }

    /// Take the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<StateChanged> {
        self.rx.try_recv().ok()
    }
}
