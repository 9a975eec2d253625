//! Service registry: per-service health state and best-service selection.
//!
//! Services fail in two qualitatively different ways: rate/capacity limits
//! self-heal and should be retried later, while authentication/contract
//! failures will not heal without operator action. The registry keeps the
//! two apart as a small closed state machine per service -- transient
//! faults put a service into a time-boxed cooldown, critical faults disable
//! it until [`ServiceRegistry::enable_service`] is called.
//!
//! The registry is shared state: one instance is constructed at the
//! composition root (usually via [`ServiceRegistry::from_config`]) and
//! handed to every run driver behind an `Arc`. All methods take `&self`;
//! records are locked individually through the `DashMap` entry API, so
//! drivers on parallel tasks never contend except on the same service.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use runweave_types::config::RunnerConfig;
use runweave_types::service::{
    ErrorSeverity, ServiceErrorKind, ServiceState, ServiceStatusInfo,
};

/// Internal state of one service record.
///
/// Cooldown expiry is a monotonic `Instant`; it never crosses a serialization
/// boundary (the operator view renders it as remaining milliseconds).
#[derive(Debug, Clone)]
enum RecordState {
    Active,
    Cooldown { expires_at: Instant },
    Disabled { reason: String },
}

/// Health record for a single service. Mutated only by the registry.
#[derive(Debug)]
struct ServiceRecord {
    state: RecordState,
    last_error: Option<ServiceErrorKind>,
    total_reports: u64,
    last_transition: Option<DateTime<Utc>>,
}

impl ServiceRecord {
    fn active() -> Self {
        Self {
            state: RecordState::Active,
            last_error: None,
            total_reports: 0,
            last_transition: None,
        }
    }

    /// Resolve the externally visible state at `now`, lifting an expired
    /// cooldown back to `Active` in place (check-on-read).
    fn state_at(&mut self, now: Instant) -> ServiceState {
        if let RecordState::Cooldown { expires_at } = self.state {
            if now >= expires_at {
                self.state = RecordState::Active;
                self.last_transition = Some(Utc::now());
            }
        }
        match &self.state {
            RecordState::Active => ServiceState::Active,
            RecordState::Cooldown { .. } => ServiceState::Cooldown,
            RecordState::Disabled { reason } => ServiceState::Disabled {
                reason: reason.clone(),
            },
        }
    }
}

/// Tracks health of interchangeable completion services and selects the
/// best available one per request.
///
/// Unknown service ids are registered as `Active` on first reference, so a
/// caller can query an ad-hoc service without an explicit registration
/// step.
pub struct ServiceRegistry {
    records: DashMap<String, ServiceRecord>,
    /// Model id -> ordered service preference list. Read-only after
    /// construction.
    preferences: HashMap<String, Vec<String>>,
    cooldown: Duration,
}

impl ServiceRegistry {
    /// Create a registry with the given preference table and cooldown
    /// duration. No services are seeded; they register on first reference.
    pub fn new(preferences: HashMap<String, Vec<String>>, cooldown: Duration) -> Self {
        Self {
            records: DashMap::new(),
            preferences,
            cooldown,
        }
    }

    /// Construct from configuration, seeding all statically known services
    /// as `Active`.
    pub fn from_config(config: &RunnerConfig) -> Self {
        let registry = Self::new(
            config.services.model_preferences.clone(),
            Duration::from_secs(config.services.cooldown_secs),
        );
        for id in &config.services.known {
            registry.register_service(id.clone());
        }
        registry
    }

    /// Idempotently register a service as `Active`.
    pub fn register_service(&self, id: impl Into<String>) {
        let id = id.into();
        self.records.entry(id).or_insert_with(ServiceRecord::active);
    }

    /// Current state of a service.
    ///
    /// Side-effecting read: an unknown id is registered as `Active` first,
    /// and an expired cooldown is lifted before the state is returned.
    pub fn service_state(&self, id: &str) -> ServiceState {
        self.service_state_at(id, Instant::now())
    }

    fn service_state_at(&self, id: &str, now: Instant) -> ServiceState {
        let mut record = self
            .records
            .entry(id.to_string())
            .or_insert_with(ServiceRecord::active);
        record.state_at(now)
    }

    /// Record an observed error against a service and apply the resulting
    /// state transition.
    ///
    /// Transient errors start (or restart) a cooldown; critical errors
    /// disable the service until [`enable_service`](Self::enable_service).
    /// A disabled service is never downgraded to cooldown by a later
    /// transient report. Unknown ids are registered first, so a never-seen
    /// service can be driven straight to cooldown or disabled.
    pub fn report_error(&self, id: &str, kind: ServiceErrorKind) {
        self.report_error_at(id, kind, Instant::now());
    }

    fn report_error_at(&self, id: &str, kind: ServiceErrorKind, now: Instant) {
        let mut record = self
            .records
            .entry(id.to_string())
            .or_insert_with(ServiceRecord::active);
        record.total_reports += 1;
        record.last_error = Some(kind);

        match kind.severity() {
            ErrorSeverity::Transient => {
                if matches!(record.state, RecordState::Disabled { .. }) {
                    tracing::debug!(
                        service = id,
                        error = %kind,
                        "transient error on disabled service, state unchanged"
                    );
                    return;
                }
                record.state = RecordState::Cooldown {
                    expires_at: now + self.cooldown,
                };
                record.last_transition = Some(Utc::now());
                tracing::info!(
                    service = id,
                    error = %kind,
                    cooldown_secs = self.cooldown.as_secs(),
                    "service entering cooldown"
                );
            }
            ErrorSeverity::Critical => {
                record.state = RecordState::Disabled {
                    reason: kind.to_string(),
                };
                record.last_transition = Some(Utc::now());
                tracing::warn!(
                    service = id,
                    error = %kind,
                    "service disabled until re-enabled"
                );
            }
        }
    }

    /// Explicitly return a service to `Active`, clearing a cooldown or a
    /// disabled state. This is the operator lever for sticky failures.
    pub fn enable_service(&self, id: &str) {
        let mut record = self
            .records
            .entry(id.to_string())
            .or_insert_with(ServiceRecord::active);
        if !matches!(record.state, RecordState::Active) {
            record.state = RecordState::Active;
            record.last_transition = Some(Utc::now());
            tracing::info!(service = id, "service re-enabled");
        }
    }

    /// The first service in the model's preference order whose current
    /// state is `Active`.
    ///
    /// Returns `None` when the model has no preference list or every
    /// candidate is cooling down or disabled. "No service usable right
    /// now" is a value, not an error: retry/backoff policy belongs to the
    /// caller.
    pub fn best_service(&self, model: &str) -> Option<String> {
        self.best_service_at(model, Instant::now())
    }

    fn best_service_at(&self, model: &str, now: Instant) -> Option<String> {
        let candidates = self.preferences.get(model)?;
        for id in candidates {
            if self.service_state_at(id, now).is_active() {
                return Some(id.clone());
            }
        }
        tracing::debug!(model, "no active service in preference list");
        None
    }

    /// Operator snapshot of every known service, sorted by name.
    pub fn status_report(&self) -> Vec<ServiceStatusInfo> {
        let now = Instant::now();
        let mut report: Vec<ServiceStatusInfo> = self
            .records
            .iter_mut()
            .map(|mut entry| {
                let name = entry.key().clone();
                let state = entry.value_mut().state_at(now);
                let record = entry.value();
                let cooldown_remaining_ms = match &record.state {
                    RecordState::Cooldown { expires_at } => Some(
                        expires_at.saturating_duration_since(now).as_millis() as u64,
                    ),
                    _ => None,
                };
                ServiceStatusInfo {
                    name,
                    state: state.to_string(),
                    disabled_reason: match state {
                        ServiceState::Disabled { reason } => Some(reason),
                        _ => None,
                    },
                    cooldown_remaining_ms,
                    last_error: record.last_error.map(|k| k.to_string()),
                    total_reports: record.total_reports,
                    last_transition: record.last_transition.map(|t| t.to_rfc3339()),
                }
            })
            .collect();
        report.sort_by(|a, b| a.name.cmp(&b.name));
        report
    }
}
