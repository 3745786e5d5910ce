use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "sub-{}", self.0)
    }
}

/* A delivery slot has no buffer: it only holds the sender of a pending `recv`. */
struct Slot<T> {
    state: Mutex<SlotState<T>>,
}

struct SlotState<T> {
    waiting: Option<oneshot::Sender<T>>,
    closed: bool,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                waiting: None,
                closed: false,
            }),
        }
    }

    /// Hands `value` to a pending receiver, or gives it back if nobody is waiting.
    fn offer(&self, value: T) -> Result<(), T> {
        let waiting = self.state.lock().waiting.take();

        match waiting {
            Some(sender) => sender.send(value),
            None => Err(value),
        }
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        /* dropping the sender wakes a pending recv with end-of-stream */
        state.waiting = None;
    }
}

type SlotMap<T> = RwLock<HashMap<SubscriberId, Arc<Slot<T>>>>;

/* process-wide, so an id handed out by one registry is unknown to every other */
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Receiving end of one subscriber registration.
///
/// A value published while no `recv` is pending is lost for this subscriber.
/// Dropping the handle removes the registration.
pub struct Subscription<T> {
    id: SubscriberId,
    slot: Arc<Slot<T>>,
    registry: Weak<SlotMap<T>>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next published value. Returns `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<T> {
        let receiver = {
            let mut state = self.slot.state.lock();
            if state.closed {
                return None;
            }

            let (sender, receiver) = oneshot::channel();
            state.waiting = Some(sender);
            receiver
        };

        receiver.await.ok()
    }

    pub fn is_closed(&self) -> bool {
        self.slot.state.lock().closed
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }

        if let Some(registry) = self.registry.upgrade() {
            registry.write().remove(&self.id);
            debug!(subscriber = %self.id, "subscription dropped");
        }
        self.slot.close();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

pub struct Subscribers<T> {
    slots: Arc<SlotMap<T>>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T: Clone> Subscribers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let id = SubscriberId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
        let slot = Arc::new(Slot::new());

        self.slots.write().insert(id, slot.clone());
        debug!(subscriber = %id, "subscribed");

        Subscription {
            id,
            slot,
            registry: Arc::downgrade(&self.slots),
        }
    }

    /// Removes and closes a registration.
    ///
    /// # Panics
    ///
    /// If `id` is not registered here, i.e. it was handed out by another
    /// registry or has already been unsubscribed.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let removed = self.slots.write().remove(&id);

        match removed {
            Some(slot) => {
                slot.close();
                debug!(subscriber = %id, "unsubscribed");
            }
            None => panic!("unsubscribe of unknown or already removed subscriber {id}"),
        }
    }

    /// Offers `value` to every subscriber without waiting. Returns how many received it.
    pub fn publish(&self, value: &T) -> usize {
        let slots = self.slots.read();
        let mut delivered = 0;

        for (id, slot) in slots.iter() {
            match slot.offer(value.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => warn!(subscriber = %id, "subscriber not ready, dropping update"),
            }
        }

        debug!(delivered, subscribers = slots.len(), "published update");

        delivered
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::{sleep, timeout};

    use super::*;

    const SETTLE: Duration = Duration::from_millis(50);

    fn spawn_recv(
        mut subscription: Subscription<String>,
    ) -> tokio::task::JoinHandle<(Option<String>, Subscription<String>)> {
        tokio::spawn(async move {
            let value = subscription.recv().await;
            (value, subscription)
        })
    }

    #[tokio::test]
    async fn test_publish_reaches_waiting_subscriber() {
        let subscribers = Subscribers::new();
        let pending = spawn_recv(subscribers.subscribe());
        sleep(SETTLE).await;

        assert_eq!(subscribers.publish(&"test-publish".to_string()), 1);

        let (value, _) = pending.await.unwrap();
        assert_eq!(value.as_deref(), Some("test-publish"));
    }

    #[tokio::test]
    async fn test_two_waiting_subscribers_receive_same_value() {
        let subscribers = Subscribers::new();
        let first = spawn_recv(subscribers.subscribe());
        let second = spawn_recv(subscribers.subscribe());
        sleep(SETTLE).await;

        assert_eq!(subscribers.publish(&"tick".to_string()), 2);

        assert_eq!(first.await.unwrap().0.as_deref(), Some("tick"));
        assert_eq!(second.await.unwrap().0.as_deref(), Some("tick"));
    }

    #[tokio::test]
    async fn test_not_ready_subscriber_never_receives_dropped_value() {
        let subscribers = Subscribers::new();
        let mut subscription = subscribers.subscribe();

        assert_eq!(subscribers.publish(&"missed".to_string()), 0);

        let late = timeout(SETTLE, subscription.recv()).await;
        assert!(late.is_err(), "dropped value must not be delivered later");

        let pending = spawn_recv(subscription);
        sleep(SETTLE).await;
        subscribers.publish(&"next".to_string());
        assert_eq!(pending.await.unwrap().0.as_deref(), Some("next"));
    }

    #[tokio::test]
    async fn test_abandoned_recv_counts_as_not_ready() {
        let subscribers = Subscribers::new();
        let mut subscription = subscribers.subscribe();

        let _ = timeout(Duration::from_millis(10), subscription.recv()).await;

        assert_eq!(subscribers.publish(&"lost".to_string()), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_pending_recv() {
        let subscribers = Subscribers::<String>::new();
        let subscription = subscribers.subscribe();
        let id = subscription.id();
        let pending = spawn_recv(subscription);
        sleep(SETTLE).await;

        subscribers.unsubscribe(id);

        let (value, subscription) = timeout(Duration::from_secs(1), pending)
            .await
            .expect("pending recv must be released")
            .unwrap();
        assert_eq!(value, None);
        assert!(subscription.is_closed());
        assert!(subscribers.is_empty());
    }

    #[tokio::test]
    async fn test_recv_after_unsubscribe_is_end_of_stream() {
        let subscribers = Subscribers::<String>::new();
        let mut subscription = subscribers.subscribe();

        subscribers.unsubscribe(subscription.id());

        assert_eq!(subscription.recv().await, None);
        assert_eq!(subscribers.publish(&"after".to_string()), 0);
    }

    #[test]
    #[should_panic(expected = "already removed")]
    fn test_double_unsubscribe_panics() {
        let subscribers = Subscribers::<String>::new();
        let subscription = subscribers.subscribe();

        subscribers.unsubscribe(subscription.id());
        subscribers.unsubscribe(subscription.id());
    }

    #[test]
    #[should_panic(expected = "unknown")]
    fn test_unsubscribe_with_foreign_id_panics() {
        let first = Subscribers::<String>::new();
        let second = Subscribers::<String>::new();
        let foreign = first.subscribe();
        let own = second.subscribe();

        assert_ne!(foreign.id(), own.id());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            second.unsubscribe(foreign.id())
        }));

        assert!(!own.is_closed());
        assert!(!foreign.is_closed());
        assert_eq!(second.len(), 1);
        if let Err(panic) = result {
            std::panic::resume_unwind(panic);
        }
    }

    #[test]
    fn test_dropped_subscription_is_removed() {
        let subscribers = Subscribers::<String>::new();
        let kept = subscribers.subscribe();
        let dropped = subscribers.subscribe();

        drop(dropped);

        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers.publish(&"after drop".to_string()), 0);

        subscribers.unsubscribe(kept.id());
        assert!(subscribers.is_empty());
    }

    #[test]
    fn test_subscription_outliving_registry_drops_cleanly() {
        let subscribers = Subscribers::<String>::new();
        let subscription = subscribers.subscribe();

        drop(subscribers);
        assert!(!subscription.is_closed());
        drop(subscription);
    }

    #[test]
    fn test_subscriber_ids_are_unique() {
        let subscribers = Subscribers::<String>::new();
        let first = subscribers.subscribe();
        let second = subscribers.subscribe();

        assert_ne!(first.id(), second.id());
        assert_eq!(subscribers.len(), 2);
    }
}
