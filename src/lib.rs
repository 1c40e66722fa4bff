//! Threadweave: thread-coordination primitives and the staged workflow
//! pipeline built on top of them.
//!
//! # Overview
//!
//! Threadweave is a shared-memory coordination toolkit for preemptive OS
//! threads. The leaf primitives are classic guarded-wait structures: a
//! bounded FIFO buffer, a reusable cyclic barrier, and a counting
//! semaphore. On top of them sit four composites: a fixed-size task pool
//! with result handles, a multi-stage workflow coordinator with per-stage
//! queues and backpressure, a publish/subscribe event bus with
//! asynchronous dispatch, and a bounded resource pool with idle
//! reclamation.
//!
//! # Core Guarantees
//!
//! - **No busy-waiting**: every blocking operation parks on a condition
//!   variable and re-checks its predicate after every wake
//! - **Definite outcomes**: bounded waits return an explicit timeout
//!   value, never a panic, and never leave shared state half-mutated
//! - **Failure isolation**: a panic inside submitted work or an event
//!   handler is captured at that unit's boundary; worker threads survive
//! - **Drain-before-exit**: shutdown paths let accepted work finish;
//!   nothing is abandoned mid-execution
//! - **Single lock per structure**: no primitive takes another
//!   primitive's lock while holding its own
//!
//! # Module Structure
//!
//! - [`sync`]: leaf primitives ([`BoundedBuffer`], [`CyclicBarrier`],
//!   [`CountingSemaphore`])
//! - [`pool`]: fixed-size [`TaskPool`] with blocking result handles
//! - [`workflow`]: staged pipeline ([`WorkflowCoordinator`])
//! - [`bus`]: publish/subscribe [`EventBus`]
//! - [`resource`]: bounded [`ResourcePool`] with a reclaimer thread
//! - [`config`]: builder-style configuration for the composites
//! - [`error`]: typed error taxonomy
//! - [`test_utils`]: tracing-based test helpers shared by the test suite
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use threadweave::{TaskPool, config::TaskPoolConfig};
//!
//! let pool = TaskPool::new(TaskPoolConfig::with_workers(2));
//! let handle = pool.submit(|| 6 * 7).expect("pool accepting work");
//! assert_eq!(handle.wait().expect("task completed"), 42);
//! assert!(pool.shutdown_timeout(Duration::from_secs(5)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod bus;
pub mod config;
pub mod error;
pub mod pool;
pub mod resource;
pub mod sync;
pub mod test_utils;
pub mod workflow;

// Re-exports for convenient access to core types
pub use bus::{Event, EventBus, EventCategory};
pub use error::{
    BarrierWaitError, BufferTimeout, PoolError, PublishError, SemaphoreError, SubmitError,
    TaskError, WorkflowError,
};
pub use pool::{TaskHandle, TaskPool};
pub use resource::{PoolHandle, PoolStats, ResourcePool};
pub use sync::{BarrierWaitResult, BoundedBuffer, CountingSemaphore, CyclicBarrier};
pub use workflow::{Stage, WorkItem, WorkflowCoordinator, WorkflowStats};
