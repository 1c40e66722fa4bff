//! Configuration for the composite components.
//!
//! Each composite takes a small config struct with documented defaults
//! and chained `#[must_use]` setters:
//!
//! ```
//! use std::time::Duration;
//! use threadweave::config::ResourcePoolConfig;
//!
//! let config = ResourcePoolConfig::with_max_size(20)
//!     .max_wait(Duration::from_secs(10))
//!     .idle_timeout(Duration::from_secs(300));
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Configuration for a [`TaskPool`](crate::TaskPool).
#[derive(Debug, Clone, Deserialize)]
pub struct TaskPoolConfig {
    /// Number of worker threads, fixed for the pool's lifetime.
    pub workers: usize,
    /// Thread name prefix; workers are named `{prefix}-worker-{i}`.
    pub thread_name_prefix: String,
}

impl Default for TaskPoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            thread_name_prefix: "threadweave".to_string(),
        }
    }
}

impl TaskPoolConfig {
    /// Creates a configuration with the given worker count.
    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Default::default()
        }
    }

    /// Sets the thread name prefix.
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

/// Configuration for a [`WorkflowCoordinator`](crate::WorkflowCoordinator).
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    /// Capacity of each stage's work-item buffer.
    pub stage_capacity: usize,
    /// Worker threads per stage.
    pub workers_per_stage: usize,
    /// Thread name prefix; stage workers are named
    /// `{prefix}-{stage}-{i}`.
    pub thread_name_prefix: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            stage_capacity: 8,
            workers_per_stage: 2,
            thread_name_prefix: "workflow".to_string(),
        }
    }
}

impl WorkflowConfig {
    /// Sets the per-stage buffer capacity.
    #[must_use]
    pub fn stage_capacity(mut self, capacity: usize) -> Self {
        self.stage_capacity = capacity;
        self
    }

    /// Sets the worker count per stage.
    #[must_use]
    pub fn workers_per_stage(mut self, workers: usize) -> Self {
        self.workers_per_stage = workers;
        self
    }

    /// Sets the thread name prefix.
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

/// Configuration for an [`EventBus`](crate::EventBus).
#[derive(Debug, Clone, Deserialize)]
pub struct EventBusConfig {
    /// Number of dispatcher threads.
    pub dispatchers: usize,
    /// Capacity of the internal event queue; `publish` blocks once full.
    pub queue_capacity: usize,
    /// Thread name prefix; dispatchers are named
    /// `{prefix}-dispatch-{i}`.
    pub thread_name_prefix: String,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            dispatchers: 2,
            queue_capacity: 64,
            thread_name_prefix: "bus".to_string(),
        }
    }
}

impl EventBusConfig {
    /// Sets the dispatcher thread count.
    #[must_use]
    pub fn dispatchers(mut self, dispatchers: usize) -> Self {
        self.dispatchers = dispatchers;
        self
    }

    /// Sets the internal queue capacity.
    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the thread name prefix.
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

/// Configuration for a [`ResourcePool`](crate::ResourcePool).
#[derive(Debug, Clone, Deserialize)]
pub struct ResourcePoolConfig {
    /// Maximum resources the pool will ever hold.
    pub max_size: usize,
    /// How long `acquire` waits before reporting exhaustion.
    pub max_wait: Duration,
    /// Idle age beyond which the reclaimer recycles a resource.
    pub idle_timeout: Duration,
    /// How often the reclaimer scans for idle resources.
    pub monitor_interval: Duration,
}

impl Default for ResourcePoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            max_wait: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            monitor_interval: Duration::from_secs(1),
        }
    }
}

impl ResourcePoolConfig {
    /// Creates a configuration with the given maximum size.
    #[must_use]
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            ..Default::default()
        }
    }

    /// Sets the acquire wait budget.
    #[must_use]
    pub const fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Sets the idle reclamation threshold.
    #[must_use]
    pub const fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Sets the reclaimer scan interval.
    #[must_use]
    pub const fn monitor_interval(mut self, monitor_interval: Duration) -> Self {
        self.monitor_interval = monitor_interval;
        self
    }
}
