//! Bounded resource pool with idle reclamation.

mod pool;

pub use pool::{PoolHandle, PoolStats, ResourcePool};
