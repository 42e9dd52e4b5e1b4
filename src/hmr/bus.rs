//! Notification Bus.
//!
//! Every subscriber owns a bounded queue. Publishing never waits: a
//! subscriber whose queue is full or whose receiver is gone is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use super::HmrEvent;

pub type SubscriberId = u64;

struct Subscriber {
    id: SubscriberId,
    tx: Sender<Arc<str>>,
}

/// Receiving side of one subscriber, in publish order.
pub struct Subscription {
    pub id: SubscriberId,
    pub rx: Receiver<Arc<str>>,
}

pub struct NotificationBus {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    capacity: usize,
    /// Replayed to new subscribers (snapshot recovery).
    last_sync: Mutex<Option<Arc<str>>>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
            last_sync: Mutex::new(None),
        }
    }

    /// Register a subscriber. Safe to call while publishing.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = channel::bounded(self.capacity);

        // Holding the list lock orders the replay before any later publish.
        let mut subscribers = self.subscribers.lock();
        if let Some(sync) = self.last_sync.lock().clone() {
            let _ = tx.try_send(sync);
        }
        subscribers.push(Subscriber { id, tx });
        crate::debug!("hmr"; "client {} subscribed (total: {})", id, subscribers.len());

        Subscription { id, rx }
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| s.id != id);
        crate::debug!("hmr"; "client {} unsubscribed (total: {})", id, subscribers.len());
    }

    pub fn publish(&self, event: &HmrEvent) -> usize {
        self.publish_raw(event.to_json())
    }

    /// Deliver an opaque payload to every subscriber. Returns how many got it.
    pub fn publish_raw(&self, payload: Arc<str>) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| match s.tx.try_send(Arc::clone(&payload)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                crate::debug!("hmr"; "client {} too slow, dropped", s.id);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        subscribers.len()
    }

    /// Remember the state replayed to new subscribers.
    pub fn set_sync(&self, event: &HmrEvent) {
        *self.last_sync.lock() = Some(event.to_json());
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every subscriber; their receivers see a disconnect.
    pub fn close(&self) {
        self.subscribers.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_publish_preserves_order_per_subscriber() {
        let bus = NotificationBus::new(8);
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(&HmrEvent::Building);
        bus.publish(&HmrEvent::ReloadPage);

        for sub in [&a, &b] {
            assert_eq!(&*sub.rx.recv().unwrap(), r#"{"action":"building"}"#);
            assert_eq!(&*sub.rx.recv().unwrap(), r#"{"action":"reloadPage"}"#);
        }
    }

    #[test]
    fn test_dead_subscriber_dropped_silently() {
        let bus = NotificationBus::new(8);
        let a = bus.subscribe();
        let b = bus.subscribe();
        drop(b);

        assert_eq!(bus.publish(&HmrEvent::Building), 1);
        assert_eq!(bus.len(), 1);
        assert!(a.rx.try_recv().is_ok());
    }

    #[test]
    fn test_full_queue_drops_slow_subscriber() {
        let bus = NotificationBus::new(2);
        let slow = bus.subscribe();
        for _ in 0..3 {
            bus.publish(&HmrEvent::Building);
        }
        assert!(bus.is_empty());
        // Already queued events are still readable, then disconnect.
        assert!(slow.rx.recv().is_ok());
        assert!(slow.rx.recv().is_ok());
        assert!(slow.rx.recv().is_err());
    }

    #[test]
    fn test_sync_replayed_to_new_subscribers() {
        let bus = NotificationBus::new(4);
        bus.set_sync(&HmrEvent::Sync { hash: "h".into(), errors: vec![], warnings: vec![] });
        let sub = bus.subscribe();
        let first = sub.rx.try_recv().unwrap();
        assert!(first.contains(r#""action":"sync""#));
    }

    #[test]
    fn test_subscribe_concurrent_with_publish() {
        let bus = Arc::new(NotificationBus::new(1024));
        let publisher = {
            let bus = Arc::clone(&bus);
            thread::spawn(move || {
                for _ in 0..200 {
                    bus.publish(&HmrEvent::Building);
                }
            })
        };
        let subs: Vec<_> = (0..20).map(|_| bus.subscribe()).collect();
        publisher.join().unwrap();
        assert_eq!(bus.len(), subs.len());

        bus.unsubscribe(subs[0].id);
        assert_eq!(bus.len(), subs.len() - 1);
    }
}
