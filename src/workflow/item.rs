//! Work items and the fixed stage sequence they travel through.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Ordered processing stages of the workflow pipeline.
///
/// Strictly linear: items advance one stage at a time via
/// [`next`](Self::next), never skip, never go back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Stage {
    /// Item accepted and normalized.
    Initialization,
    /// Payload transformation.
    DataProcessing,
    /// Consistency checks on the transformed payload.
    Validation,
    /// Rendering of the final output.
    OutputGeneration,
    /// Working-state teardown before archival.
    Cleanup,
    /// Terminal stage; items here are archived, never queued.
    Completed,
}

impl Stage {
    /// The non-terminal stages, in processing order. Each owns a queue
    /// and a worker set; `Completed` owns neither.
    pub const PROCESSING: [Self; 5] = [
        Self::Initialization,
        Self::DataProcessing,
        Self::Validation,
        Self::OutputGeneration,
        Self::Cleanup,
    ];

    /// The stage an item moves to after this one.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Initialization => Some(Self::DataProcessing),
            Self::DataProcessing => Some(Self::Validation),
            Self::Validation => Some(Self::OutputGeneration),
            Self::OutputGeneration => Some(Self::Cleanup),
            Self::Cleanup => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Position in the linear sequence, `Initialization` first.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Initialization => 0,
            Self::DataProcessing => 1,
            Self::Validation => 2,
            Self::OutputGeneration => 3,
            Self::Cleanup => 4,
            Self::Completed => 5,
        }
    }

    /// Lowercase label used for worker thread names and logging.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Initialization => "initialization",
            Self::DataProcessing => "data-processing",
            Self::Validation => "validation",
            Self::OutputGeneration => "output-generation",
            Self::Cleanup => "cleanup",
            Self::Completed => "completed",
        }
    }
}

/// A unit of work travelling through the pipeline.
///
/// Mutated only by the stage worker currently holding it; once archived
/// in the completed collection it is immutable.
#[derive(Debug, Clone)]
pub struct WorkItem {
    id: u64,
    name: String,
    payload: String,
    current_stage: Stage,
    created_at: Instant,
    completed_at: Option<Instant>,
    trace: Vec<String>,
}

impl WorkItem {
    pub(crate) fn new(id: u64, name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            payload: payload.into(),
            current_stage: Stage::Initialization,
            created_at: Instant::now(),
            completed_at: None,
            trace: Vec::new(),
        }
    }

    /// Pool-assigned identity, unique per coordinator.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Caller-supplied name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current payload text.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The stage this item currently sits in.
    #[must_use]
    pub const fn current_stage(&self) -> Stage {
        self.current_stage
    }

    /// Returns true once the item has reached [`Stage::Completed`].
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.current_stage, Stage::Completed)
    }

    /// Wall time from submission to completion, if completed.
    #[must_use]
    pub fn processing_duration(&self) -> Option<Duration> {
        self.completed_at
            .map(|completed| completed.duration_since(self.created_at))
    }

    /// Notes stamped by each stage processor, in stage order.
    #[must_use]
    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    pub(crate) fn set_payload(&mut self, payload: String) {
        self.payload = payload;
    }

    pub(crate) fn record(&mut self, note: impl Into<String>) {
        self.trace.push(note.into());
    }

    /// Moves the item to the next stage.
    ///
    /// # Panics
    /// Panics if the item is already completed; the coordinator never
    /// queues a completed item.
    pub(crate) fn advance(&mut self) {
        let next = self
            .current_stage
            .next()
            .expect("completed item cannot advance");
        self.current_stage = next;
        if matches!(next, Stage::Completed) {
            self.completed_at = Some(Instant::now());
        }
    }
}
