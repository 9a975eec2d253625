//! Run execution tracking types.
//!
//! A run is one execution instance of a routine or project. The driver owns
//! the `RunProgress` record; the limits manager in `runweave-core` reads its
//! metrics and writes its status when a budget is exhausted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credits::Credits;

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Scheduled,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    /// Whether the run has reached a state it will not leave on its own.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

/// Counters accumulated while a run executes.
///
/// Written by the driver after each step; the limits manager only reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Total credits spent so far, exact.
    pub credits_spent: Credits,
    /// Steps executed so far.
    pub steps_run: u64,
}

/// Execution progress of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunProgress {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub metrics: RunMetrics,
}

impl RunProgress {
    /// A freshly started run with zeroed metrics.
    pub fn started(run_id: Uuid) -> Self {
        Self {
            run_id,
            status: RunStatus::Running,
            metrics: RunMetrics::default(),
        }
    }
}

/// What to do with a run when a budget is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitBehavior {
    /// Suspend the run so it can be resumed later.
    Pause,
    /// Terminate the run.
    #[default]
    Fail,
}

/// Per-run budget ceilings, supplied by the caller at run start.
///
/// Each limit is optional and carries its own pause-or-fail policy, so a
/// caller can pause on a time limit it intends to extend while hard-failing
/// on runaway spend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRequestLimits {
    /// Maximum wall time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time_ms: Option<u64>,
    /// Maximum credits spent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_credits: Option<Credits>,
    /// Maximum steps executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,
    #[serde(default)]
    pub on_max_time: LimitBehavior,
    #[serde(default)]
    pub on_max_credits: LimitBehavior,
    #[serde(default)]
    pub on_max_steps: LimitBehavior,
}

/// Why the limits manager changed a run's status.
///
/// Returned to the caller, never stored on the run itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatusChangeReason {
    MaxTime,
    MaxCredits,
    MaxSteps,
}
