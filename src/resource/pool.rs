//! Bounded resource pool with blocking acquisition and idle reclamation.
//!
//! Resources are produced by a caller-supplied factory and grown lazily
//! up to the configured maximum. Acquisition hands out a [`PoolHandle`]
//! under a return obligation: exactly one of `release`, `discard`, or
//! `Drop` puts the slot back, on every exit path, and never twice. The
//! factory runs outside the pool lock, so it may freely use other
//! primitives without nesting critical sections.
//!
//! A background monitor thread periodically recycles resources that
//! have sat idle beyond a threshold — dropping the stale payload and
//! creating a fresh one — and never touches a resource that is
//! currently handed out.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::ResourcePoolConfig;
use crate::error::PoolError;

/// How often the monitor thread re-checks its stop flag while sleeping.
const MONITOR_TICK: Duration = Duration::from_millis(50);

#[derive(Debug)]
struct PoolEntry<R> {
    id: u64,
    resource: R,
    uses: u64,
}

#[derive(Debug)]
struct IdleEntry<R> {
    entry: PoolEntry<R>,
    idle_since: Instant,
}

#[derive(Debug)]
struct PoolState<R> {
    idle: VecDeque<IdleEntry<R>>,
    /// Live resources, idle and handed out together.
    total: usize,
    in_use: usize,
    next_resource_id: u64,
    closed: bool,
    total_acquisitions: u64,
    failed_acquisitions: u64,
    recycled: u64,
}

struct PoolShared<R> {
    state: Mutex<PoolState<R>>,
    available: Condvar,
    config: ResourcePoolConfig,
    factory: Box<dyn Fn() -> R + Send + Sync>,
    monitor_stop: AtomicBool,
}

/// Bounded pool of reusable resources.
pub struct ResourcePool<R: Send + 'static> {
    shared: Arc<PoolShared<R>>,
    monitor: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl<R: Send + 'static> std::fmt::Debug for ResourcePool<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("ResourcePool")
            .field("available", &stats.available)
            .field("in_use", &stats.in_use)
            .field("max_size", &stats.max_size)
            .finish_non_exhaustive()
    }
}

impl<R: Send + 'static> ResourcePool<R> {
    /// Creates an empty pool; resources are created on demand by
    /// `factory`, up to `config.max_size`.
    ///
    /// # Panics
    /// Panics if `config.max_size == 0`.
    #[must_use]
    pub fn new<F>(factory: F, config: ResourcePoolConfig) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        assert!(config.max_size > 0, "pool requires max_size of at least 1");
        Self {
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState {
                    idle: VecDeque::new(),
                    total: 0,
                    in_use: 0,
                    next_resource_id: 0,
                    closed: false,
                    total_acquisitions: 0,
                    failed_acquisitions: 0,
                    recycled: 0,
                }),
                available: Condvar::new(),
                config,
                factory: Box::new(factory),
                monitor_stop: AtomicBool::new(false),
            }),
            monitor: parking_lot::Mutex::new(None),
        }
    }

    /// Acquires a resource for `client_id`, waiting up to the
    /// configured `max_wait` when the pool is exhausted.
    ///
    /// # Errors
    /// [`PoolError::Exhausted`] when every resource stayed in use for
    /// the whole wait budget; [`PoolError::Closed`] after `close`.
    pub fn acquire(&self, client_id: impl Into<String>) -> Result<PoolHandle<R>, PoolError> {
        let client_id = client_id.into();
        let deadline = Instant::now() + self.shared.config.max_wait;
        let mut state = self.shared.state.lock().expect("pool state poisoned");

        loop {
            if state.closed {
                return Err(PoolError::Closed);
            }

            if let Some(idle) = state.idle.pop_front() {
                state.in_use += 1;
                state.total_acquisitions += 1;
                let mut entry = idle.entry;
                entry.uses += 1;
                tracing::debug!(resource = entry.id, client = %client_id, "resource handed out");
                return Ok(PoolHandle::new(entry, client_id, Arc::clone(&self.shared)));
            }

            if state.total < self.shared.config.max_size {
                // Reserve the slot, then run the factory outside the
                // lock: user code must never execute inside it.
                state.total += 1;
                state.in_use += 1;
                state.total_acquisitions += 1;
                state.next_resource_id += 1;
                let id = state.next_resource_id;
                drop(state);

                let resource = (self.shared.factory)();
                tracing::debug!(resource = id, client = %client_id, "resource created");
                return Ok(PoolHandle::new(
                    PoolEntry {
                        id,
                        resource,
                        uses: 1,
                    },
                    client_id,
                    Arc::clone(&self.shared),
                ));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                state.failed_acquisitions += 1;
                tracing::debug!(client = %client_id, "acquire exhausted wait budget");
                return Err(PoolError::Exhausted);
            }
            let (guard, _) = self
                .shared
                .available
                .wait_timeout(state, remaining)
                .expect("pool state poisoned");
            state = guard;
        }
    }

    /// Acquires only if a resource is free or creatable right now.
    pub fn try_acquire(&self, client_id: impl Into<String>) -> Option<PoolHandle<R>> {
        let client_id = client_id.into();
        let mut state = self.shared.state.lock().expect("pool state poisoned");
        if state.closed {
            return None;
        }

        if let Some(idle) = state.idle.pop_front() {
            state.in_use += 1;
            state.total_acquisitions += 1;
            let mut entry = idle.entry;
            entry.uses += 1;
            return Some(PoolHandle::new(entry, client_id, Arc::clone(&self.shared)));
        }

        if state.total < self.shared.config.max_size {
            state.total += 1;
            state.in_use += 1;
            state.total_acquisitions += 1;
            state.next_resource_id += 1;
            let id = state.next_resource_id;
            drop(state);
            let resource = (self.shared.factory)();
            return Some(PoolHandle::new(
                PoolEntry {
                    id,
                    resource,
                    uses: 1,
                },
                client_id,
                Arc::clone(&self.shared),
            ));
        }
        None
    }

    /// Resources idle in the pool right now.
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.shared.state.lock().expect("pool state poisoned").idle.len()
    }

    /// Live resources, idle and handed out together.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.shared.state.lock().expect("pool state poisoned").total
    }

    /// Point-in-time usage statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock().expect("pool state poisoned");
        PoolStats {
            available: state.idle.len(),
            in_use: state.in_use,
            total: state.total,
            max_size: self.shared.config.max_size,
            total_acquisitions: state.total_acquisitions,
            failed_acquisitions: state.failed_acquisitions,
            recycled: state.recycled,
        }
    }

    /// Starts the background reclaimer if it is not already running.
    pub fn start_monitor(&self) {
        let mut monitor = self.monitor.lock();
        if monitor.is_some() {
            return;
        }
        self.shared.monitor_stop.store(false, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("resource-pool-monitor".to_string())
            .spawn(move || {
                tracing::debug!("pool monitor started");
                monitor_loop(&shared);
                tracing::debug!("pool monitor exiting");
            })
            .expect("failed to spawn pool monitor");
        *monitor = Some(handle);
    }

    /// Stops the reclaimer and joins it. Idempotent.
    pub fn stop_monitor(&self) {
        let handle = self.monitor.lock().take();
        if let Some(handle) = handle {
            self.shared.monitor_stop.store(true, Ordering::Release);
            let _ = handle.join();
        }
    }

    /// Closes the pool: pending and future acquires fail with
    /// [`PoolError::Closed`], idle resources are dropped, and handed-out
    /// resources are dropped as their handles come back.
    pub fn close(&self) {
        let mut state = self.shared.state.lock().expect("pool state poisoned");
        if state.closed {
            return;
        }
        state.closed = true;
        let dropped = state.idle.len();
        state.total -= dropped;
        state.idle.clear();
        drop(state);
        self.shared.available.notify_all();
        tracing::info!(dropped, "resource pool closed");
    }

    /// Returns true once the pool has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().expect("pool state poisoned").closed
    }
}

impl<R: Send + 'static> Drop for ResourcePool<R> {
    fn drop(&mut self) {
        self.stop_monitor();
    }
}

/// Pool usage statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolStats {
    /// Resources idle in the pool.
    pub available: usize,
    /// Resources currently handed out.
    pub in_use: usize,
    /// Live resources (available + in_use).
    pub total: usize,
    /// Configured maximum.
    pub max_size: usize,
    /// Successful acquisitions since construction.
    pub total_acquisitions: u64,
    /// Acquisitions that exhausted their wait budget.
    pub failed_acquisitions: u64,
    /// Resources recycled by the idle reclaimer.
    pub recycled: u64,
}

/// The reclaimer loop: sleep a scan interval, recycle stale idles.
fn monitor_loop<R: Send + 'static>(shared: &Arc<PoolShared<R>>) {
    let interval = shared.config.monitor_interval;
    loop {
        // Sleep in short ticks so stop_monitor is honored promptly.
        let wake = Instant::now() + interval;
        while Instant::now() < wake {
            if shared.monitor_stop.load(Ordering::Acquire) {
                return;
            }
            thread::sleep(MONITOR_TICK.min(wake.saturating_duration_since(Instant::now())));
        }
        if shared.monitor_stop.load(Ordering::Acquire) {
            return;
        }
        recycle_idle(shared);
    }
}

/// Drops idle resources older than the threshold and replaces them with
/// fresh ones. In-use resources are untouched: they live in handles,
/// not in the idle queue.
fn recycle_idle<R: Send + 'static>(shared: &Arc<PoolShared<R>>) {
    let threshold = shared.config.idle_timeout;
    let now = Instant::now();

    let stale: Vec<IdleEntry<R>> = {
        let mut state = shared.state.lock().expect("pool state poisoned");
        if state.closed {
            return;
        }
        let mut stale = Vec::new();
        let mut keep = VecDeque::with_capacity(state.idle.len());
        for idle in state.idle.drain(..) {
            if now.duration_since(idle.idle_since) >= threshold {
                stale.push(idle);
            } else {
                keep.push_back(idle);
            }
        }
        state.idle = keep;
        state.recycled += stale.len() as u64;
        state.total -= stale.len();
        stale
    };

    if stale.is_empty() {
        return;
    }
    let count = stale.len();
    // Old payloads are closed (dropped) outside the lock.
    drop(stale);

    for _ in 0..count {
        let resource = (shared.factory)();
        let mut state = shared.state.lock().expect("pool state poisoned");
        if state.closed || state.total >= shared.config.max_size {
            // Capacity raced away or the pool closed; let it go.
            break;
        }
        state.total += 1;
        state.next_resource_id += 1;
        let id = state.next_resource_id;
        state.idle.push_back(IdleEntry {
            entry: PoolEntry {
                id,
                resource,
                uses: 0,
            },
            idle_since: Instant::now(),
        });
        drop(state);
        shared.available.notify_one();
    }
    tracing::debug!(count, "idle resources recycled");
}

/// Exclusive handle to a pooled resource.
///
/// Non-copyable and movable; at most one live handle exists per
/// resource. Dropping the handle returns the resource to the pool
/// exactly once, on every exit path.
#[must_use = "dropping the handle immediately returns the resource"]
pub struct PoolHandle<R: Send + 'static> {
    entry: Option<PoolEntry<R>>,
    client_id: String,
    acquired_at: Instant,
    shared: Arc<PoolShared<R>>,
}

impl<R: Send + 'static> PoolHandle<R> {
    fn new(entry: PoolEntry<R>, client_id: String, shared: Arc<PoolShared<R>>) -> Self {
        Self {
            entry: Some(entry),
            client_id,
            acquired_at: Instant::now(),
            shared,
        }
    }

    /// Stable identity of the underlying resource.
    #[must_use]
    pub fn resource_id(&self) -> u64 {
        self.entry.as_ref().expect("resource present").id
    }

    /// How many times this resource has been handed out.
    #[must_use]
    pub fn uses(&self) -> u64 {
        self.entry.as_ref().expect("resource present").uses
    }

    /// The client this handle was acquired for.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// How long this handle has been held.
    #[must_use]
    pub fn held_duration(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// Explicitly returns the resource to the pool.
    ///
    /// Equivalent to dropping the handle; provided for call sites that
    /// want the return visible.
    pub fn release(self) {
        drop(self);
    }

    /// Marks the resource broken and removes it from the pool instead
    /// of returning it. The pool will create a replacement on demand.
    pub fn discard(mut self) {
        let entry = self.entry.take().expect("resource present");
        tracing::debug!(resource = entry.id, client = %self.client_id, "resource discarded");
        drop(entry);

        let mut state = self.shared.state.lock().expect("pool state poisoned");
        state.in_use -= 1;
        state.total -= 1;
        drop(state);
        // A slot opened up; a waiter may now create a fresh resource.
        self.shared.available.notify_one();
    }
}

impl<R: Send + 'static> std::ops::Deref for PoolHandle<R> {
    type Target = R;

    fn deref(&self) -> &Self::Target {
        &self.entry.as_ref().expect("resource present").resource
    }
}

impl<R: Send + 'static> std::ops::DerefMut for PoolHandle<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.entry.as_mut().expect("resource present").resource
    }
}

impl<R: Send + 'static> Drop for PoolHandle<R> {
    fn drop(&mut self) {
        // `discard` takes the entry first; the obligation is already
        // discharged when it is gone.
        let Some(entry) = self.entry.take() else {
            return;
        };
        let mut state = self.shared.state.lock().expect("pool state poisoned");
        state.in_use -= 1;
        if state.closed {
            state.total -= 1;
            drop(state);
            return;
        }
        tracing::debug!(resource = entry.id, client = %self.client_id, "resource returned");
        state.idle.push_back(IdleEntry {
            entry,
            idle_since: Instant::now(),
        });
        drop(state);
        self.shared.available.notify_one();
    }
}

impl<R: Send + 'static> std::fmt::Debug for PoolHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolHandle")
            .field("resource_id", &self.entry.as_ref().map(|entry| entry.id))
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{init_test_logging, MockConnection};
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    fn connection_pool(config: ResourcePoolConfig) -> ResourcePool<MockConnection> {
        let counter = AtomicUsize::new(0);
        ResourcePool::new(
            move || MockConnection::new(counter.fetch_add(1, Ordering::SeqCst)),
            config,
        )
    }

    #[test]
    fn exhaustion_then_release_scenario() {
        init_test("exhaustion_then_release_scenario");
        let pool = connection_pool(
            ResourcePoolConfig::with_max_size(2).max_wait(Duration::from_millis(50)),
        );

        let first = pool.acquire("client-a").expect("first");
        let second = pool.acquire("client-b").expect("second");

        let start = Instant::now();
        let exhausted = pool.acquire("client-c").expect_err("pool exhausted");
        crate::assert_with_log!(
            exhausted == PoolError::Exhausted,
            "exhausted error",
            PoolError::Exhausted,
            exhausted
        );
        crate::assert_with_log!(
            start.elapsed() >= Duration::from_millis(50),
            "waited the budget",
            Duration::from_millis(50),
            start.elapsed()
        );
        crate::assert_with_log!(
            pool.stats().failed_acquisitions == 1,
            "failure counted",
            1u64,
            pool.stats().failed_acquisitions
        );

        first.release();
        let third = pool.acquire("client-c").expect("after release");
        crate::assert_with_log!(
            pool.total_count() == 2,
            "no growth past max",
            2usize,
            pool.total_count()
        );
        drop(second);
        drop(third);
        crate::test_complete!("exhaustion_then_release_scenario");
    }

    #[test]
    fn handle_returns_resource_on_drop() {
        init_test("handle_returns_resource_on_drop");
        let pool = connection_pool(ResourcePoolConfig::with_max_size(2));

        let handle = pool.acquire("client").expect("acquire");
        let id = handle.resource_id();
        handle.query("select 1");
        crate::assert_with_log!(pool.stats().in_use == 1, "in use", 1usize, pool.stats().in_use);
        drop(handle);

        crate::assert_with_log!(pool.stats().in_use == 0, "returned", 0usize, pool.stats().in_use);
        crate::assert_with_log!(
            pool.available_count() == 1,
            "idle again",
            1usize,
            pool.available_count()
        );

        let again = pool.acquire("client").expect("reacquire");
        crate::assert_with_log!(
            again.resource_id() == id,
            "same resource reused",
            id,
            again.resource_id()
        );
        crate::assert_with_log!(again.uses() == 2, "use counter", 2u64, again.uses());
        crate::test_complete!("handle_returns_resource_on_drop");
    }

    #[test]
    fn discard_shrinks_pool_and_replacement_is_fresh() {
        init_test("discard_shrinks_pool_and_replacement_is_fresh");
        let pool = connection_pool(ResourcePoolConfig::with_max_size(1));

        let handle = pool.acquire("client").expect("acquire");
        let broken_id = handle.resource_id();
        handle.discard();
        crate::assert_with_log!(pool.total_count() == 0, "slot freed", 0usize, pool.total_count());

        let replacement = pool.acquire("client").expect("replacement");
        crate::assert_with_log!(
            replacement.resource_id() != broken_id,
            "fresh identity",
            broken_id + 1,
            replacement.resource_id()
        );
        crate::test_complete!("discard_shrinks_pool_and_replacement_is_fresh");
    }

    #[test]
    fn waiter_wakes_when_resource_returns() {
        init_test("waiter_wakes_when_resource_returns");
        let pool = Arc::new(connection_pool(
            ResourcePoolConfig::with_max_size(1).max_wait(Duration::from_secs(5)),
        ));

        let held = pool.acquire("holder").expect("acquire");
        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.acquire("waiter").map(|handle| handle.resource_id()))
        };

        thread::sleep(Duration::from_millis(30));
        let held_id = held.resource_id();
        drop(held);

        let acquired_id = waiter
            .join()
            .expect("waiter thread")
            .expect("acquire after release");
        crate::assert_with_log!(acquired_id == held_id, "same slot handed over", held_id, acquired_id);
        crate::test_complete!("waiter_wakes_when_resource_returns");
    }

    #[test]
    fn handles_never_share_a_resource() {
        init_test("handles_never_share_a_resource");
        let pool = Arc::new(connection_pool(
            ResourcePoolConfig::with_max_size(3).max_wait(Duration::from_secs(10)),
        ));
        let live = Arc::new(Mutex::new(HashSet::new()));

        let mut workers = Vec::new();
        for w in 0..6 {
            let pool = Arc::clone(&pool);
            let live = Arc::clone(&live);
            workers.push(thread::spawn(move || {
                for _ in 0..25 {
                    let handle = pool.acquire(format!("worker-{w}")).expect("acquire");
                    {
                        let mut live = live.lock().expect("live set poisoned");
                        assert!(
                            live.insert(handle.resource_id()),
                            "resource {} handed out twice",
                            handle.resource_id()
                        );
                    }
                    thread::sleep(Duration::from_millis(1));
                    {
                        let mut live = live.lock().expect("live set poisoned");
                        live.remove(&handle.resource_id());
                    }
                    drop(handle);
                }
            }));
        }
        for worker in workers {
            worker.join().expect("worker failed");
        }

        let stats = pool.stats();
        crate::assert_with_log!(stats.in_use == 0, "all returned", 0usize, stats.in_use);
        crate::assert_with_log!(stats.total <= 3, "bounded", 3usize, stats.total);
        crate::test_complete!("handles_never_share_a_resource");
    }

    #[test]
    fn reclaimer_recycles_idle_resources() {
        init_test("reclaimer_recycles_idle_resources");
        let pool = connection_pool(
            ResourcePoolConfig::with_max_size(2)
                .idle_timeout(Duration::from_millis(30))
                .monitor_interval(Duration::from_millis(10)),
        );

        let handle = pool.acquire("client").expect("acquire");
        let original_id = handle.resource_id();
        drop(handle);

        pool.start_monitor();
        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.stats().recycled == 0 {
            assert!(Instant::now() < deadline, "reclaimer never ran");
            thread::sleep(Duration::from_millis(10));
        }
        pool.stop_monitor();

        let stats = pool.stats();
        crate::assert_with_log!(stats.total == 1, "replacement created", 1usize, stats.total);
        let fresh = pool.acquire("client").expect("acquire recycled");
        crate::assert_with_log!(
            fresh.resource_id() != original_id,
            "payload recreated",
            original_id + 1,
            fresh.resource_id()
        );
        crate::assert_with_log!(fresh.uses() == 1, "fresh use counter", 1u64, fresh.uses());
        crate::test_complete!("reclaimer_recycles_idle_resources");
    }

    #[test]
    fn reclaimer_never_touches_in_use_resources() {
        init_test("reclaimer_never_touches_in_use_resources");
        let pool = connection_pool(
            ResourcePoolConfig::with_max_size(1)
                .idle_timeout(Duration::from_millis(20))
                .monitor_interval(Duration::from_millis(10)),
        );
        pool.start_monitor();

        let handle = pool.acquire("client").expect("acquire");
        // Hold well past the idle threshold with the monitor running.
        thread::sleep(Duration::from_millis(100));

        let stats = pool.stats();
        crate::assert_with_log!(stats.recycled == 0, "in-use untouched", 0u64, stats.recycled);
        crate::assert_with_log!(stats.in_use == 1, "still held", 1usize, stats.in_use);
        handle.query("still alive");
        drop(handle);
        pool.stop_monitor();
        crate::test_complete!("reclaimer_never_touches_in_use_resources");
    }

    #[test]
    fn monitor_lifecycle_is_idempotent() {
        init_test("monitor_lifecycle_is_idempotent");
        let pool = connection_pool(ResourcePoolConfig::with_max_size(1));
        pool.start_monitor();
        pool.start_monitor();
        pool.stop_monitor();
        pool.stop_monitor();
        crate::test_complete!("monitor_lifecycle_is_idempotent");
    }

    #[test]
    fn close_refuses_and_drops_returning_resources() {
        init_test("close_refuses_and_drops_returning_resources");
        let pool = connection_pool(
            ResourcePoolConfig::with_max_size(2).max_wait(Duration::from_millis(10)),
        );

        let held = pool.acquire("client").expect("acquire");
        pool.close();

        let refused = pool.acquire("client").expect_err("closed pool refuses");
        crate::assert_with_log!(
            refused == PoolError::Closed,
            "closed error",
            PoolError::Closed,
            refused
        );

        drop(held);
        crate::assert_with_log!(
            pool.total_count() == 0,
            "returned resource dropped",
            0usize,
            pool.total_count()
        );
        crate::test_complete!("close_refuses_and_drops_returning_resources");
    }

    #[test]
    fn stats_track_acquisitions() {
        init_test("stats_track_acquisitions");
        let pool = connection_pool(ResourcePoolConfig::with_max_size(2));
        for _ in 0..5 {
            let handle = pool.acquire("client").expect("acquire");
            drop(handle);
        }
        let stats = pool.stats();
        crate::assert_with_log!(
            stats.total_acquisitions == 5,
            "acquisition count",
            5u64,
            stats.total_acquisitions
        );
        crate::assert_with_log!(stats.total == 1, "one resource reused", 1usize, stats.total);
        crate::test_complete!("stats_track_acquisitions");
    }

    #[test]
    fn try_acquire_declines_at_capacity() {
        init_test("try_acquire_declines_at_capacity");
        let pool = connection_pool(ResourcePoolConfig::with_max_size(1));
        let held = pool.try_acquire("client").expect("creates first");
        let declined = pool.try_acquire("client");
        crate::assert_with_log!(declined.is_none(), "at capacity", true, declined.is_none());
        drop(held);
        let reused = pool.try_acquire("client");
        crate::assert_with_log!(reused.is_some(), "idle reused", true, reused.is_some());
        crate::test_complete!("try_acquire_declines_at_capacity");
    }
}
