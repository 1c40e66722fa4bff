//! Multi-stage workflow pipeline.
//!
//! Work items travel a fixed linear stage sequence, one bounded buffer
//! and one worker set per stage, with blocking handoffs providing
//! backpressure end to end.

mod coordinator;
mod item;

pub use coordinator::{StageHook, StageStats, WorkflowCoordinator, WorkflowStats};
pub use item::{Stage, WorkItem};
