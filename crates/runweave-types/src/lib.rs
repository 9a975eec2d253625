//! Shared domain types for Runweave.
//!
//! This crate contains the types that flow between the run-execution driver
//! and the resilience layer: service health states, run budgets and
//! progress, hierarchical locations, and streamed completion events.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod credits;
pub mod error;
pub mod location;
pub mod run;
pub mod service;
pub mod stream;
