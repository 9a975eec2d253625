//! Streamed completion events and stream failure types.
//!
//! [`CompletionEvent`] is the provider-agnostic item the run driver pulls
//! through the stream timeout guard. [`StreamError`] is the failure channel
//! of a guarded stream: a timeout/cancellation produced by the guard, or an
//! upstream producer error passed through unchanged.

use serde::{Deserialize, Serialize};

use crate::credits::Credits;

/// Events emitted while a completion response streams in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletionEvent {
    /// Connection established with the service.
    Connected,

    /// A delta of generated text.
    TextDelta { text: String },

    /// Credits charged for the stream so far.
    CreditsDelta { credits: Credits },

    /// The stream has completed.
    Done,
}

/// Errors surfaced while consuming a guarded stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// No activity within the configured window, or the consumer cancelled.
    ///
    /// External cancellation raises this same kind: from the consumer's
    /// point of view the two are indistinguishable.
    #[error("stream from '{service}' timed out after {timeout_ms}ms (model: {model})")]
    TimedOut {
        service: String,
        model: String,
        timeout_ms: u64,
    },

    /// The underlying producer failed for a non-timeout reason.
    #[error("upstream stream error: {0}")]
    Upstream(String),
}

impl StreamError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, StreamError::TimedOut { .. })
    }
}
