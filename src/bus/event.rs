//! Events carried by the bus.

use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::Serialize;

/// The category an event is published and subscribed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventCategory {
    /// Component lifecycle: started, stopped, reconfigured.
    System,
    /// Task pool activity.
    Task,
    /// Workflow pipeline progress.
    Workflow,
    /// Resource pool activity.
    Resource,
    /// Failures worth surfacing to operators.
    Error,
}

impl EventCategory {
    /// Every category, for iteration in registries and tests.
    pub const ALL: [Self; 5] = [
        Self::System,
        Self::Task,
        Self::Workflow,
        Self::Resource,
        Self::Error,
    ];

    /// Lowercase label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Task => "task",
            Self::Workflow => "workflow",
            Self::Resource => "resource",
            Self::Error => "error",
        }
    }
}

/// An immutable record published on the bus.
///
/// Construction stamps the timestamp; metadata is attached with the
/// [`with_metadata`](Self::with_metadata) builder before publishing.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    category: EventCategory,
    source: String,
    message: String,
    timestamp: SystemTime,
    metadata: BTreeMap<String, String>,
}

impl Event {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(
        category: EventCategory,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            source: source.into(),
            message: message.into(),
            timestamp: SystemTime::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attaches one metadata key/value pair.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The category this event dispatches under.
    #[must_use]
    pub const fn category(&self) -> EventCategory {
        self.category
    }

    /// Who published the event.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// When the event was created.
    #[must_use]
    pub const fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Attached key/value metadata.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}
