//! Tracing subscriber initialization.
//!
//! The resilience layer logs through `tracing` macros; the host decides
//! where that goes. This module wires the standard setup: a structured
//! `fmt` layer with an `EnvFilter`, where `RUST_LOG` overrides the default
//! directive passed by the caller.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `default_filter` is used when `RUST_LOG` is unset (e.g.
/// `"runweave=info"`).
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init_tracing(
    default_filter: &str,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
}

/// Best-effort initialization for tests: repeated calls are a no-op
/// instead of an error.
pub fn init_for_tests() {
    let _ = init_tracing("runweave=debug");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_for_tests();
        init_for_tests();
        // Second explicit init reports the conflict instead of panicking.
        assert!(init_tracing("runweave=info").is_err());
    }
}
