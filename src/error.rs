//! Error types and error handling strategy for Threadweave.
//!
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - A bounded wait that expires is a value, never a panic
//! - Panics inside submitted work are isolated and converted to
//!   [`TaskError::Panicked`]
//! - Misusing a stopped component is a distinct error from running out
//!   of capacity
//!
//! # Error Categories
//!
//! - **Capacity/timeout**: a bound was reached within the time budget
//!   ([`BufferTimeout`], [`BarrierWaitError::Timeout`],
//!   [`SemaphoreError::Timeout`], [`PoolError::Exhausted`])
//! - **Lifecycle misuse**: work offered to a stopped component
//!   ([`SubmitError::PoolStopped`], [`PublishError::Stopped`],
//!   [`WorkflowError::NotRunning`])
//! - **User-callable failure**: a panic raised inside submitted work,
//!   captured into that unit's handle ([`TaskError::Panicked`])
//!
//! Invariant violations (zero-capacity buffers, zero-party barriers)
//! are programming errors and panic at construction instead.

use thiserror::Error;

/// A bounded `produce` expired before space became available.
///
/// Carries the rejected item back to the caller so nothing is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bounded buffer full; produce timed out")]
pub struct BufferTimeout<T>(pub T);

/// Error returned when a bounded barrier wait fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BarrierWaitError {
    /// The party did not complete within the time budget. The caller's
    /// arrival has been withdrawn; the current generation is unaffected.
    #[error("barrier wait timed out")]
    Timeout,
}

/// Error returned when a bounded semaphore acquire fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SemaphoreError {
    /// No permit became available within the time budget.
    #[error("semaphore acquire timed out")]
    Timeout,
}

/// Error returned when submitting work to a [`TaskPool`](crate::TaskPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The pool has been shut down and accepts no further work.
    #[error("task pool stopped")]
    PoolStopped,
}

/// Failure outcome surfaced through a [`TaskHandle`](crate::TaskHandle).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The submitted closure panicked. The worker thread survived; the
    /// captured panic message is attached.
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Error returned by workflow submission and lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// The coordinator is not running; start it before submitting.
    #[error("workflow not running")]
    NotRunning,
    /// `start` was called on a coordinator that is already running.
    #[error("workflow already running")]
    AlreadyRunning,
    /// A bounded submit expired before the ingestion queue had space.
    #[error("workflow submit timed out")]
    SubmitTimeout,
}

/// Error returned when publishing to an [`EventBus`](crate::EventBus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The bus dispatchers are not running.
    #[error("event bus stopped")]
    Stopped,
}

/// Error returned by [`ResourcePool`](crate::ResourcePool) acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Every resource stayed in use for the whole wait budget.
    #[error("no resource available within the wait budget")]
    Exhausted,
    /// The pool has been closed.
    #[error("resource pool closed")]
    Closed,
}
