//! Publish/subscribe bus with asynchronous dispatch.
//!
//! Publishing enqueues onto an internal bounded buffer and returns; a
//! small pool of dispatcher threads consumes the queue and invokes the
//! handlers registered for each event's category. The subscriber
//! registry and the event queue are guarded independently and their
//! critical sections never nest: dispatchers snapshot the relevant
//! handlers under the registry lock, then invoke them outside it, so a
//! handler may freely subscribe or unsubscribe.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use super::event::{Event, EventCategory};
use crate::config::EventBusConfig;
use crate::error::PublishError;
use crate::sync::BoundedBuffer;

/// Callback invoked for each event of a subscribed category.
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// How long an idle dispatcher parks before re-checking its drain flag.
const DRAIN_POLL: Duration = Duration::from_millis(20);

struct BusInner {
    /// category -> subscriber id -> handler.
    subscribers: Mutex<HashMap<EventCategory, HashMap<String, EventHandler>>>,
    /// Internal event queue feeding the dispatchers.
    queue: BoundedBuffer<Event>,
    /// Intake gate, flipped off at the start of `stop`.
    accepting: AtomicBool,
    /// Set during `stop`; dispatchers exit once the queue is dry.
    draining: AtomicBool,
    published: AtomicU64,
    processed: AtomicU64,
}

/// Publish/subscribe event bus with a dispatcher worker pool.
pub struct EventBus {
    config: EventBusConfig,
    inner: Arc<BusInner>,
    dispatchers: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("running", &self.is_running())
            .field("published", &self.events_published())
            .field("processed", &self.events_processed())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Creates a bus; call [`start`](Self::start) to spawn dispatchers.
    #[must_use]
    pub fn new(config: EventBusConfig) -> Self {
        assert!(config.dispatchers > 0, "bus requires at least 1 dispatcher");
        let queue_capacity = config.queue_capacity;
        Self {
            config,
            inner: Arc::new(BusInner {
                subscribers: Mutex::new(HashMap::new()),
                queue: BoundedBuffer::new(queue_capacity),
                accepting: AtomicBool::new(false),
                draining: AtomicBool::new(false),
                published: AtomicU64::new(0),
                processed: AtomicU64::new(0),
            }),
            dispatchers: Mutex::new(Vec::new()),
        }
    }

    /// Registers `handler` for `category` under `subscriber_id`,
    /// replacing any previous handler with the same id.
    pub fn subscribe<F>(&self, category: EventCategory, subscriber_id: impl Into<String>, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let subscriber_id = subscriber_id.into();
        tracing::debug!(
            category = category.label(),
            subscriber = %subscriber_id,
            "subscriber registered"
        );
        self.inner
            .subscribers
            .lock()
            .entry(category)
            .or_default()
            .insert(subscriber_id, Arc::new(handler));
    }

    /// Removes the subscriber; returns whether it was registered.
    pub fn unsubscribe(&self, category: EventCategory, subscriber_id: &str) -> bool {
        let removed = self
            .inner
            .subscribers
            .lock()
            .get_mut(&category)
            .is_some_and(|entries| entries.remove(subscriber_id).is_some());
        if removed {
            tracing::debug!(
                category = category.label(),
                subscriber = subscriber_id,
                "subscriber removed"
            );
        }
        removed
    }

    /// Number of subscribers currently registered for `category`.
    #[must_use]
    pub fn subscriber_count(&self, category: EventCategory) -> usize {
        self.inner
            .subscribers
            .lock()
            .get(&category)
            .map_or(0, HashMap::len)
    }

    /// Enqueues `event` for asynchronous dispatch and returns.
    ///
    /// Blocks only while the internal queue is full.
    ///
    /// # Errors
    /// Returns [`PublishError::Stopped`] when the dispatchers are not
    /// running.
    pub fn publish(&self, event: Event) -> Result<(), PublishError> {
        if !self.inner.accepting.load(Ordering::Acquire) {
            return Err(PublishError::Stopped);
        }
        self.inner.queue.produce(event);
        self.inner.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Spawns the dispatcher threads and opens the intake. Idempotent.
    pub fn start(&self) {
        let mut dispatchers = self.dispatchers.lock();
        if !dispatchers.is_empty() {
            return;
        }
        self.inner.draining.store(false, Ordering::Release);

        for i in 0..self.config.dispatchers {
            let inner = Arc::clone(&self.inner);
            let name = format!("{}-dispatch-{i}", self.config.thread_name_prefix);
            let handle = thread::Builder::new()
                .name(name)
                .spawn(move || {
                    tracing::debug!("dispatcher started");
                    dispatch_loop(&inner);
                    tracing::debug!("dispatcher exiting");
                })
                .expect("failed to spawn dispatcher");
            dispatchers.push(handle);
        }

        self.inner.accepting.store(true, Ordering::Release);
        tracing::info!(dispatchers = self.config.dispatchers, "event bus started");
    }

    /// Closes the intake, drains the queue, and joins the dispatchers.
    /// Idempotent.
    pub fn stop(&self) {
        let mut dispatchers = self.dispatchers.lock();
        if dispatchers.is_empty() {
            return;
        }
        self.inner.accepting.store(false, Ordering::Release);
        self.inner.draining.store(true, Ordering::Release);
        for handle in dispatchers.drain(..) {
            let _ = handle.join();
        }
        tracing::info!(
            published = self.events_published(),
            processed = self.events_processed(),
            "event bus stopped"
        );
    }

    /// Returns true while the bus accepts publishes.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.accepting.load(Ordering::Acquire)
    }

    /// Events accepted by `publish` since construction. Monotone.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    /// Events fully dispatched to their handlers since construction.
    /// Monotone.
    #[must_use]
    pub fn events_processed(&self) -> u64 {
        self.inner.processed.load(Ordering::Relaxed)
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.stop();
    }
}

fn dispatch_loop(inner: &Arc<BusInner>) {
    loop {
        let Some(event) = inner.queue.try_consume(DRAIN_POLL) else {
            if inner.draining.load(Ordering::Acquire) && inner.queue.is_empty() {
                break;
            }
            continue;
        };

        // Snapshot under the registry lock, invoke outside it.
        let handlers: Vec<(String, EventHandler)> = inner
            .subscribers
            .lock()
            .get(&event.category())
            .map(|entries| {
                entries
                    .iter()
                    .map(|(id, handler)| (id.clone(), Arc::clone(handler)))
                    .collect()
            })
            .unwrap_or_default();

        for (subscriber_id, handler) in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                tracing::warn!(
                    category = event.category().label(),
                    subscriber = %subscriber_id,
                    "event handler panicked; continuing"
                );
            }
        }
        inner.processed.fetch_add(1, Ordering::Relaxed);
    }
}
