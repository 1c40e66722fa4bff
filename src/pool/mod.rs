//! Fixed-size task pool with blocking result handles.

mod task_pool;

pub use task_pool::{TaskHandle, TaskPool};
