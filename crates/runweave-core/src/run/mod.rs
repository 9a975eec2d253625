//! Run budget enforcement and hierarchical location loading.

mod cache;
mod limits;
mod loader;

pub use cache::{BoundedCache, ByteSized};
pub use limits::RunLimiter;
pub use loader::{CacheChangeListener, LoaderSnapshot, LocationStore, RunContextLoader};
