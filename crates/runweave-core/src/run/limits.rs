//! Per-run budget enforcement.
//!
//! The driver calls [`RunLimiter::check_limits`] after each step. Budgets
//! are routinely hit in normal operation, so exceeding one is not an
//! error: it is a status transition (`Paused` or `Failed`, per the limit's
//! declared behavior) plus a reason code returned to the caller.
//!
//! Stateless handler -- all logic is in associated functions that take the
//! run, its limits, and the clock as parameters.

use std::time::{Duration, Instant};

use runweave_types::credits::Credits;
use runweave_types::run::{
    LimitBehavior, RunProgress, RunRequestLimits, RunStatus, RunStatusChangeReason,
};

/// Stateless gate over a run's time, credit, and step budgets.
pub struct RunLimiter;

impl RunLimiter {
    /// Check the run's budgets against its limits, in fixed priority
    /// order: time, then credits, then steps. The first exceeded budget
    /// wins; remaining checks are skipped.
    ///
    /// On a hit, `run.status` is set to `Paused` or `Failed` per the
    /// matching `on_max_*` behavior and the reason is returned. On no hit
    /// the run is left untouched. Metrics are never modified here.
    pub fn check_limits(
        run: &mut RunProgress,
        limits: &RunRequestLimits,
        started_at: Instant,
    ) -> Option<RunStatusChangeReason> {
        Self::check_limits_at(run, limits, started_at.elapsed())
    }

    /// Clock-independent form of [`check_limits`](Self::check_limits);
    /// `elapsed` is the wall time since the run started.
    pub fn check_limits_at(
        run: &mut RunProgress,
        limits: &RunRequestLimits,
        elapsed: Duration,
    ) -> Option<RunStatusChangeReason> {
        if let Some(max_time_ms) = limits.max_time_ms {
            if elapsed.as_millis() as u64 >= max_time_ms {
                Self::apply(run, limits.on_max_time, RunStatusChangeReason::MaxTime);
                return Some(RunStatusChangeReason::MaxTime);
            }
        }

        if let Some(max_credits) = limits.max_credits {
            // Exact integer comparison; credit totals never touch floats.
            if run.metrics.credits_spent >= max_credits {
                Self::apply(run, limits.on_max_credits, RunStatusChangeReason::MaxCredits);
                return Some(RunStatusChangeReason::MaxCredits);
            }
        }

        if let Some(max_steps) = limits.max_steps {
            if run.metrics.steps_run >= max_steps {
                Self::apply(run, limits.on_max_steps, RunStatusChangeReason::MaxSteps);
                return Some(RunStatusChangeReason::MaxSteps);
            }
        }

        None
    }

    fn apply(run: &mut RunProgress, behavior: LimitBehavior, reason: RunStatusChangeReason) {
        run.status = match behavior {
            LimitBehavior::Pause => RunStatus::Paused,
            LimitBehavior::Fail => RunStatus::Failed,
        };
        tracing::info!(
            run_id = %run.run_id,
            reason = ?reason,
            status = ?run.status,
            "run budget exhausted"
        );
    }

    /// Milliseconds of wall time left under the limit, `None` when no time
    /// limit is set.
    pub fn time_remaining_ms(limits: &RunRequestLimits, elapsed: Duration) -> Option<u64> {
        limits
            .max_time_ms
            .map(|max| max.saturating_sub(elapsed.as_millis() as u64))
    }

    /// Credits left under the limit, `None` when no credit limit is set.
    pub fn credits_remaining(run: &RunProgress, limits: &RunRequestLimits) -> Option<Credits> {
        limits
            .max_credits
            .map(|max| run.metrics.credits_spent.remaining_under(max))
    }

    /// Steps left under the limit, `None` when no step limit is set.
    pub fn steps_remaining(run: &RunProgress, limits: &RunRequestLimits) -> Option<u64> {
        limits
            .max_steps
            .map(|max| max.saturating_sub(run.metrics.steps_run))
    }
}
