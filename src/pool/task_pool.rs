//! Task pool for executing submitted closures on a fixed worker set.
//!
//! Workers are spawned at construction and loop: pop a task from the
//! shared injection queue, run it, publish its outcome into the task's
//! handle, repeat. A panic inside a task is captured at that task's
//! boundary and surfaced through its handle; the worker survives.
//!
//! # Shutdown
//!
//! `shutdown` is idempotent and drains: every task that was accepted by
//! `submit` executes before `shutdown` returns, after which the workers
//! are joined. Submissions racing with shutdown either execute or are
//! refused with [`SubmitError::PoolStopped`]; an accepted task is never
//! silently dropped.
//!
//! # Example
//!
//! ```
//! use threadweave::{TaskPool, config::TaskPoolConfig};
//!
//! let pool = TaskPool::new(TaskPoolConfig::with_workers(2));
//! let handle = pool.submit(|| 2 + 2).expect("pool running");
//! assert_eq!(handle.wait().expect("task ok"), 4);
//! pool.shutdown();
//! ```

use crossbeam_queue::SegQueue;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle as ThreadJoinHandle};
use std::time::{Duration, Instant};

use crate::config::TaskPoolConfig;
use crate::error::{SubmitError, TaskError};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolInner {
    /// Work queue; jobs carry their own completion cell.
    queue: SegQueue<Job>,
    /// Number of pending jobs in the queue.
    pending_count: AtomicUsize,
    /// Number of live worker threads.
    active_workers: AtomicUsize,
    /// Number of workers currently executing a job.
    busy_workers: AtomicUsize,
    /// Shutdown flag, checked between queue operations.
    shutdown: AtomicBool,
    /// Condition variable for worker parking.
    condvar: Condvar,
    /// Mutex for the condition variable.
    mutex: Mutex<()>,
}

impl PoolInner {
    fn notify_one(&self) {
        let _guard = self.mutex.lock().expect("pool mutex poisoned");
        self.condvar.notify_one();
    }

    fn notify_all(&self) {
        let _guard = self.mutex.lock().expect("pool mutex poisoned");
        self.condvar.notify_all();
    }
}

/// Fixed-size set of worker threads pulling from a shared task queue.
pub struct TaskPool {
    inner: Arc<PoolInner>,
    workers: Mutex<Vec<ThreadJoinHandle<()>>>,
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("active_workers", &self.active_workers())
            .field("busy_workers", &self.busy_workers())
            .field("pending_tasks", &self.pending_tasks())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

impl TaskPool {
    /// Creates a pool and spawns its workers eagerly.
    ///
    /// # Panics
    /// Panics if `config.workers == 0`.
    #[must_use]
    pub fn new(config: TaskPoolConfig) -> Self {
        assert!(config.workers > 0, "task pool requires at least 1 worker");

        let inner = Arc::new(PoolInner {
            queue: SegQueue::new(),
            pending_count: AtomicUsize::new(0),
            active_workers: AtomicUsize::new(0),
            busy_workers: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
        });

        let mut workers = Vec::with_capacity(config.workers);
        for i in 0..config.workers {
            let worker_inner = Arc::clone(&inner);
            let name = format!("{}-worker-{i}", config.thread_name_prefix);
            inner.active_workers.fetch_add(1, Ordering::Relaxed);
            let handle = thread::Builder::new()
                .name(name)
                .spawn(move || {
                    tracing::debug!("task pool worker started");
                    worker_loop(&worker_inner);
                    worker_inner.active_workers.fetch_sub(1, Ordering::Relaxed);
                    tracing::debug!("task pool worker exiting");
                })
                .expect("failed to spawn pool worker");
            workers.push(handle);
        }

        Self {
            inner,
            workers: Mutex::new(workers),
        }
    }

    /// Submits a closure and returns a handle to its eventual result.
    ///
    /// # Errors
    /// Returns [`SubmitError::PoolStopped`] after `shutdown`.
    pub fn submit<T, F>(&self, f: F) -> Result<TaskHandle<T>, SubmitError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(SubmitError::PoolStopped);
        }

        let cell = Arc::new(TaskCell::new());
        let job_cell = Arc::clone(&cell);
        let job: Job = Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
                let message = panic_message(&payload);
                tracing::warn!(panic = %message, "submitted task panicked");
                TaskError::Panicked(message)
            });
            job_cell.complete(outcome);
        });

        self.inner.queue.push(job);
        self.inner.pending_count.fetch_add(1, Ordering::Relaxed);
        self.inner.notify_one();

        Ok(TaskHandle { cell })
    }

    /// Number of tasks queued but not yet picked up.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.inner.pending_count.load(Ordering::Relaxed)
    }

    /// Number of live worker threads.
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.inner.active_workers.load(Ordering::Relaxed)
    }

    /// Number of workers currently executing a task.
    #[must_use]
    pub fn busy_workers(&self) -> usize {
        self.inner.busy_workers.load(Ordering::Relaxed)
    }

    /// Returns `true` once `shutdown` has been requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Stops accepting work, drains the queue, and joins every worker.
    ///
    /// Idempotent: later calls return immediately.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.notify_all();

        let handles: Vec<_> = {
            let mut workers = self.workers.lock().expect("worker list poisoned");
            workers.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.join();
        }

        // A submit that won the race against the shutdown flag may have
        // pushed after the last worker drained; run stragglers here so
        // every accepted task completes before shutdown returns.
        while let Some(job) = self.inner.queue.pop() {
            self.inner.pending_count.fetch_sub(1, Ordering::Relaxed);
            job();
        }
        tracing::info!("task pool shut down");
    }

    /// Like [`shutdown`](Self::shutdown), but bounds the wait.
    ///
    /// Returns `true` if all workers exited within `timeout`.
    pub fn shutdown_timeout(&self, timeout: Duration) -> bool {
        self.inner.shutdown.store(true, Ordering::Release);
        let deadline = Instant::now() + timeout;

        while self.inner.active_workers.load(Ordering::Acquire) > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            // Wake any parked workers so they notice the flag.
            self.inner.notify_all();
            thread::sleep(Duration::from_millis(10).min(remaining));
        }

        self.shutdown();
        true
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        let _ = self.shutdown_timeout(Duration::from_secs(5));
    }
}

/// The worker loop: run everything in the queue, park when idle, exit
/// once shutdown is requested and the queue is dry.
fn worker_loop(inner: &Arc<PoolInner>) {
    loop {
        if let Some(job) = inner.queue.pop() {
            inner.pending_count.fetch_sub(1, Ordering::Relaxed);
            inner.busy_workers.fetch_add(1, Ordering::Relaxed);
            job();
            inner.busy_workers.fetch_sub(1, Ordering::Relaxed);
            continue;
        }

        let guard = inner.mutex.lock().expect("pool mutex poisoned");
        // Re-check under the lock: a producer pushes before notifying
        // under this same mutex, so nothing can slip between this check
        // and the wait.
        if !inner.queue.is_empty() {
            continue;
        }
        if inner.shutdown.load(Ordering::Acquire) {
            break;
        }
        let _guard = inner.condvar.wait(guard).expect("pool mutex poisoned");
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

struct TaskCell<T> {
    result: Mutex<Option<Result<T, TaskError>>>,
    done: Condvar,
}

impl<T> TaskCell<T> {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn complete(&self, outcome: Result<T, TaskError>) {
        let mut result = self.result.lock().expect("task cell poisoned");
        *result = Some(outcome);
        drop(result);
        self.done.notify_all();
    }
}

/// Handle to the eventual result of a submitted task.
///
/// Retrieval consumes the handle, mirroring `std::thread::JoinHandle`.
#[must_use = "a task handle should be waited on or explicitly dropped"]
pub struct TaskHandle<T> {
    cell: Arc<TaskCell<T>>,
}

impl<T> TaskHandle<T> {
    /// Returns `true` once the task has finished (value or panic).
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cell
            .result
            .lock()
            .expect("task cell poisoned")
            .is_some()
    }

    /// Blocks until the task finishes and returns its outcome.
    pub fn wait(self) -> Result<T, TaskError> {
        let mut result = self.cell.result.lock().expect("task cell poisoned");
        loop {
            if let Some(outcome) = result.take() {
                return outcome;
            }
            result = self.cell.done.wait(result).expect("task cell poisoned");
        }
    }

    /// Blocks up to `timeout` for the outcome.
    ///
    /// On expiry the handle is returned so the caller can keep waiting.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Result<T, TaskError>, Self> {
        let deadline = Instant::now() + timeout;
        {
            let mut result = self.cell.result.lock().expect("task cell poisoned");
            loop {
                if let Some(outcome) = result.take() {
                    return Ok(outcome);
                }
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                let (guard, _) = self
                    .cell
                    .done
                    .wait_timeout(result, remaining)
                    .expect("task cell poisoned");
                result = guard;
            }
        }
        Err(self)
    }
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("done", &self.is_done())
            .finish()
    }
}
