//! Run-execution resilience layer for Runweave.
//!
//! Four components keep long-running, AI-driven runs alive against
//! unreliable completion services, budget exhaustion, and expensive
//! hierarchical lookups:
//!
//! - [`provider::ServiceRegistry`] -- tracks service health and picks the
//!   best available service per request.
//! - [`stream::with_activity_timeout`] -- wraps a streamed response with an
//!   activity-based timeout and cancellation.
//! - [`run::RunLimiter`] -- enforces per-run time/credit/step budgets.
//! - [`run::RunContextLoader`] -- bounded caching over hierarchical
//!   routine/project version lookups.
//!
//! The run-execution driver that orchestrates these is the host's concern;
//! this crate defines the "ports" it injects (notably
//! [`run::LocationStore`]) and never performs I/O of its own.

pub mod provider;
pub mod run;
pub mod stream;
