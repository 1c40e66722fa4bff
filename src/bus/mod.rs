//! Publish/subscribe event bus with asynchronous dispatch.

mod event;
mod event_bus;

pub use event::{Event, EventCategory};
pub use event_bus::{EventBus, EventHandler};
