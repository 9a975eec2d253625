//! Completion-service health types.
//!
//! A service is an interchangeable completion backend identified by name.
//! Its availability is a small closed state machine: `Active` services take
//! traffic, `Cooldown` services are resting after a transient fault and
//! self-heal on expiry, `Disabled` services are out until an operator
//! intervenes. The registry in `runweave-core` owns the transitions; these
//! types define the vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Availability state of a completion service.
///
/// `Cooldown` carries no timestamp here: expiry is tracked by the registry
/// against a monotonic clock. The serializable view of a record, including
/// remaining cooldown, is [`ServiceStatusInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ServiceState {
    /// Taking traffic.
    Active,
    /// Resting after a transient fault; self-heals when the cooldown expires.
    Cooldown,
    /// Out of rotation until explicitly re-enabled.
    Disabled { reason: String },
}

impl ServiceState {
    /// Whether a request may be routed to a service in this state.
    pub fn is_active(&self) -> bool {
        matches!(self, ServiceState::Active)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Active => write!(f, "active"),
            ServiceState::Cooldown => write!(f, "cooldown"),
            ServiceState::Disabled { .. } => write!(f, "disabled"),
        }
    }
}

/// Kind of error observed while talking to a completion service.
///
/// This is deliberately an enum of error *kinds*, not messages: severity
/// classification must be a total function of the kind, never a string
/// match on provider text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    /// 429-style throttling.
    RateLimited,
    /// Provider reports capacity pressure.
    Overloaded,
    /// Request or stream exceeded its deadline.
    Timeout,
    /// Connection-level failure (DNS, reset, TLS).
    Network,
    /// Stream dropped mid-response.
    StreamInterrupted,
    /// Credentials rejected.
    AuthenticationFailed,
    /// Request shape the provider will never accept.
    InvalidContract,
}

impl ServiceErrorKind {
    /// Classify this error kind for the registry's state transition.
    ///
    /// Rate/capacity problems self-heal and map to a cooldown; credential
    /// and contract failures will not heal without operator action and
    /// disable the service.
    pub fn severity(self) -> ErrorSeverity {
        match self {
            ServiceErrorKind::RateLimited
            | ServiceErrorKind::Overloaded
            | ServiceErrorKind::Timeout
            | ServiceErrorKind::Network
            | ServiceErrorKind::StreamInterrupted => ErrorSeverity::Transient,
            ServiceErrorKind::AuthenticationFailed | ServiceErrorKind::InvalidContract => {
                ErrorSeverity::Critical
            }
        }
    }
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceErrorKind::RateLimited => write!(f, "rate_limited"),
            ServiceErrorKind::Overloaded => write!(f, "overloaded"),
            ServiceErrorKind::Timeout => write!(f, "timeout"),
            ServiceErrorKind::Network => write!(f, "network"),
            ServiceErrorKind::StreamInterrupted => write!(f, "stream_interrupted"),
            ServiceErrorKind::AuthenticationFailed => write!(f, "authentication_failed"),
            ServiceErrorKind::InvalidContract => write!(f, "invalid_contract"),
        }
    }
}

impl FromStr for ServiceErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rate_limited" => Ok(ServiceErrorKind::RateLimited),
            "overloaded" => Ok(ServiceErrorKind::Overloaded),
            "timeout" => Ok(ServiceErrorKind::Timeout),
            "network" => Ok(ServiceErrorKind::Network),
            "stream_interrupted" => Ok(ServiceErrorKind::StreamInterrupted),
            "authentication_failed" => Ok(ServiceErrorKind::AuthenticationFailed),
            "invalid_contract" => Ok(ServiceErrorKind::InvalidContract),
            other => Err(format!("invalid service error kind: '{other}'")),
        }
    }
}

/// Severity of an observed service error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// Self-healing; the service should be retried after a cooldown.
    Transient,
    /// Will not heal without operator action; the service is disabled.
    Critical,
}

/// Operator-facing snapshot of one service record.
///
/// Everything here is already rendered for display/serialization: the
/// monotonic cooldown deadline becomes remaining milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatusInfo {
    pub name: String,
    /// One of "active", "cooldown", "disabled".
    pub state: String,
    /// Why the service was disabled, when it is.
    pub disabled_reason: Option<String>,
    /// Milliseconds until the cooldown lifts, when cooling down.
    pub cooldown_remaining_ms: Option<u64>,
    /// Kind of the most recent reported error.
    pub last_error: Option<String>,
    pub total_reports: u64,
    /// ISO 8601 timestamp of the last state transition.
    pub last_transition: Option<String>,
}
