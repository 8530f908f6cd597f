//! services/api/src/fanout.rs
//!
//! In-process scan-event fan-out. The hub maps an equipment ID to the live
//! listeners interested in it; scan endpoints publish snapshots that are
//! pushed to every listener's queue.
//!
//! The registry is process-local. Multi-replica deployments need sticky
//! sessions or an out-of-process bus; neither is handled here.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use uuid::Uuid;

use meams_core::protocol::ScanEvent;

/// Per-listener queue bound. When full, the oldest event is dropped before
/// enqueueing; this is a lossy telemetry channel, not a durable feed.
pub const LISTENER_QUEUE_CAPACITY: usize = 16;

struct ListenerQueue {
    events: Mutex<VecDeque<ScanEvent>>,
    notify: Notify,
}

impl ListenerQueue {
    fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(LISTENER_QUEUE_CAPACITY)),
            notify: Notify::new(),
        }
    }

    fn push(&self, event: ScanEvent) {
        {
            let mut events = self.events.lock().expect("listener queue lock poisoned");
            if events.len() >= LISTENER_QUEUE_CAPACITY {
                events.pop_front();
            }
            events.push_back(event);
        }
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<ScanEvent> {
        self.events
            .lock()
            .expect("listener queue lock poisoned")
            .pop_front()
    }
}

struct Slot {
    id: u64,
    queue: Arc<ListenerQueue>,
}

struct HubInner {
    listeners: Mutex<HashMap<Uuid, Vec<Slot>>>,
    next_id: AtomicU64,
}

/// The shared listener registry. Cheap to clone; all clones share one map.
#[derive(Clone)]
pub struct ScanHub {
    inner: Arc<HubInner>,
}

impl ScanHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                listeners: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Registers a new listener for `asset_id`. Dropping the returned
    /// [`Listener`] unregisters it; the last listener removes the map entry.
    pub fn subscribe(&self, asset_id: Uuid) -> Listener {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(ListenerQueue::new());
        self.inner
            .listeners
            .lock()
            .expect("listener registry lock poisoned")
            .entry(asset_id)
            .or_default()
            .push(Slot {
                id,
                queue: queue.clone(),
            });
        Listener {
            hub: self.inner.clone(),
            asset_id,
            id,
            queue,
        }
    }

    /// Pushes `event` to every listener currently registered for `asset_id`.
    ///
    /// The slot list is snapshotted inside a short critical section and the
    /// enqueues happen outside it; a listener that unregisters concurrently
    /// is simply not observed. Never blocks on a slow consumer.
    pub fn publish(&self, asset_id: Uuid, event: ScanEvent) {
        let queues: Vec<Arc<ListenerQueue>> = {
            let listeners = self
                .inner
                .listeners
                .lock()
                .expect("listener registry lock poisoned");
            match listeners.get(&asset_id) {
                Some(slots) => slots.iter().map(|s| s.queue.clone()).collect(),
                None => return,
            }
        };
        for queue in queues {
            queue.push(event.clone());
        }
    }

    /// Number of listeners currently registered for `asset_id`.
    pub fn listener_count(&self, asset_id: Uuid) -> usize {
        self.inner
            .listeners
            .lock()
            .expect("listener registry lock poisoned")
            .get(&asset_id)
            .map_or(0, Vec::len)
    }

    /// True when no asset has any registered listener.
    pub fn is_empty(&self) -> bool {
        self.inner
            .listeners
            .lock()
            .expect("listener registry lock poisoned")
            .is_empty()
    }
}

impl Default for ScanHub {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription. Receive with [`Listener::recv`]; dropping the value
/// unregisters the queue.
pub struct Listener {
    hub: Arc<HubInner>,
    asset_id: Uuid,
    id: u64,
    queue: Arc<ListenerQueue>,
}

impl Listener {
    /// Waits for the next event on this listener's queue.
    pub async fn recv(&self) -> ScanEvent {
        loop {
            if let Some(event) = self.queue.pop() {
                return event;
            }
            self.queue.notify.notified().await;
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let mut listeners = self
            .hub
            .listeners
            .lock()
            .expect("listener registry lock poisoned");
        if let Some(slots) = listeners.get_mut(&self.asset_id) {
            slots.retain(|s| s.id != self.id);
            if slots.is_empty() {
                listeners.remove(&self.asset_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meams_core::domain::AssetKind;
    use std::time::Duration;

    fn event(asset_id: Uuid, name: &str) -> ScanEvent {
        ScanEvent {
            scan_type: AssetKind::Equipment,
            equipment_id: asset_id,
            item_code: "EQ-001".to_string(),
            name: name.to_string(),
            category: "Imaging".to_string(),
            status: "In Service".to_string(),
            location: "Radiology".to_string(),
            useful_life_years: 10.0,
            purchase_amount: 500_000.0,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let hub = ScanHub::new();
        let asset_id = Uuid::new_v4();
        let listener = hub.subscribe(asset_id);

        hub.publish(asset_id, event(asset_id, "X-Ray"));

        let received = tokio::time::timeout(Duration::from_millis(100), listener.recv())
            .await
            .expect("timeout");
        assert_eq!(received.name, "X-Ray");
        assert_eq!(received.equipment_id, asset_id);
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let hub = ScanHub::new();
        let asset_id = Uuid::new_v4();
        let listener = hub.subscribe(asset_id);

        for i in 0..3 {
            hub.publish(asset_id, event(asset_id, &format!("scan-{}", i)));
        }

        for i in 0..3 {
            let received = listener.recv().await;
            assert_eq!(received.name, format!("scan-{}", i));
        }
    }

    #[tokio::test]
    async fn all_subscribers_receive() {
        let hub = ScanHub::new();
        let asset_id = Uuid::new_v4();
        let first = hub.subscribe(asset_id);
        let second = hub.subscribe(asset_id);

        hub.publish(asset_id, event(asset_id, "Ultrasound"));

        assert_eq!(first.recv().await.name, "Ultrasound");
        assert_eq!(second.recv().await.name, "Ultrasound");
    }

    #[tokio::test]
    async fn full_queue_drops_oldest() {
        let hub = ScanHub::new();
        let asset_id = Uuid::new_v4();
        let listener = hub.subscribe(asset_id);

        for i in 0..(LISTENER_QUEUE_CAPACITY + 2) {
            hub.publish(asset_id, event(asset_id, &format!("scan-{}", i)));
        }

        // The two oldest events were dropped to make room.
        assert_eq!(listener.recv().await.name, "scan-2");
    }

    #[tokio::test]
    async fn cross_asset_isolation() {
        let hub = ScanHub::new();
        let asset_a = Uuid::new_v4();
        let asset_b = Uuid::new_v4();
        let listener_a = hub.subscribe(asset_a);

        hub.publish(asset_b, event(asset_b, "other"));
        hub.publish(asset_a, event(asset_a, "mine"));

        assert_eq!(listener_a.recv().await.name, "mine");
    }

    #[tokio::test]
    async fn drop_unregisters_and_clears_entry() {
        let hub = ScanHub::new();
        let asset_id = Uuid::new_v4();

        let first = hub.subscribe(asset_id);
        let second = hub.subscribe(asset_id);
        assert_eq!(hub.listener_count(asset_id), 2);

        drop(first);
        assert_eq!(hub.listener_count(asset_id), 1);

        drop(second);
        assert_eq!(hub.listener_count(asset_id), 0);
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn publish_without_listeners_is_harmless() {
        let hub = ScanHub::new();
        let asset_id = Uuid::new_v4();
        hub.publish(asset_id, event(asset_id, "nobody listening"));
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn publish_races_with_unsubscribe() {
        let hub = ScanHub::new();
        let asset_id = Uuid::new_v4();
        let kept = hub.subscribe(asset_id);

        let publisher = {
            let hub = hub.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    hub.publish(asset_id, event(asset_id, &format!("scan-{}", i)));
                    tokio::task::yield_now().await;
                }
            })
        };
        let churner = {
            let hub = hub.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    let listener = hub.subscribe(asset_id);
                    tokio::task::yield_now().await;
                    drop(listener);
                }
            })
        };

        publisher.await.unwrap();
        churner.await.unwrap();

        drop(kept);
        assert!(hub.is_empty());
    }
}
