//! Infrastructure implementations for Runweave.
//!
//! Everything here touches the outside world on behalf of `runweave-core`:
//! loading `config.toml` from the data directory, persisting loader cache
//! snapshots for warm starts, and wiring up the tracing subscriber.

pub mod config;
pub mod snapshot;
pub mod telemetry;

use std::path::PathBuf;

/// Resolve the Runweave data directory (`~/.runweave`).
///
/// Falls back to a relative `.runweave` when the platform reports no home
/// directory (containers, stripped-down CI).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".runweave"))
        .unwrap_or_else(|| PathBuf::from(".runweave"))
}
