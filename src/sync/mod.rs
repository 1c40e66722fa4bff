//! Leaf synchronization primitives.
//!
//! Every primitive here owns exactly one mutex guarding its internal
//! state and never takes another primitive's lock while holding it.
//! Blocking operations are guarded-wait loops: park on a condition
//! variable, re-check the predicate after every wake, regardless of why
//! the wake happened.
//!
//! # Primitives
//!
//! - [`BoundedBuffer`]: fixed-capacity FIFO with blocking and bounded
//!   produce/consume
//! - [`CyclicBarrier`]: N-way rendezvous, reusable across generations
//! - [`CountingSemaphore`]: classic acquire/release permit counter

mod barrier;
mod buffer;
mod semaphore;

pub use barrier::{BarrierWaitResult, CyclicBarrier};
pub use buffer::BoundedBuffer;
pub use semaphore::CountingSemaphore;
