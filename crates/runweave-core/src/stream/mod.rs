//! Stream decoration for completion responses.

mod guard;

pub use guard::{with_activity_timeout, GuardedStream, StreamGuardConfig};
