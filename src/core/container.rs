//! Per-machine aggregate of provisioning history and derived health flags.

use super::event::{Liveliness, ProvisioningEvent};
use super::state::ProvisioningState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Structural defects of a container.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContainerViolation {
    #[error("Container has no machine id")]
    MissingMachineId,

    #[error("Container has no recorded events")]
    EmptyHistory,

    #[error("Container has events but no last event time")]
    MissingLastEventTime,

    #[error("History holds {len} events, inspection limit is {limit}")]
    HistoryOverLimit { len: usize, limit: usize },
}

/// Provisioning history of one machine.
///
/// The container is keyed by the machine id; there is exactly one per
/// machine. `events` is ordered newest first and bounded by the configured
/// inspection limit.
///
/// # Example
///
/// ```rust
/// use metal_provisioning::core::{ProvisioningEventContainer, ProvisioningState};
///
/// let container = ProvisioningEventContainer::new("machine-1");
/// assert_eq!(container.current_state(), ProvisioningState::Initial);
/// assert!(container.events.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningEventContainer {
    /// Id of the machine this history belongs to
    pub machine_id: String,
    /// Recorded milestones, newest first
    #[serde(default)]
    pub events: Vec<ProvisioningEvent>,
    /// Time of the most recently processed event
    #[serde(default)]
    pub last_event_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub liveliness: Liveliness,
    /// Set once an event arrived that does not fit the provisioning sequence
    #[serde(default)]
    pub crash_loop: bool,
    /// Set when a reclaimed machine phoned home after the grace period
    #[serde(default)]
    pub failed_machine_reclaim: bool,
    /// Most recent unexpected event, annotated with a diagnostic message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_event: Option<ProvisioningEvent>,
    /// Optimistic-concurrency marker owned by the storage layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed: Option<DateTime<Utc>>,
}

impl ProvisioningEventContainer {
    /// Create an empty container for a machine that has not reported yet.
    pub fn new(machine_id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            events: Vec::new(),
            last_event_time: None,
            liveliness: Liveliness::Unknown,
            crash_loop: false,
            failed_machine_reclaim: false,
            last_error_event: None,
            changed: None,
        }
    }

    /// State derived from the newest recorded event.
    pub fn current_state(&self) -> ProvisioningState {
        ProvisioningState::of_history(&self.events)
    }

    /// Most recently recorded event.
    pub fn newest_event(&self) -> Option<&ProvisioningEvent> {
        self.events.first()
    }

    /// Drop the oldest events beyond `limit`. At least one event is kept.
    pub fn trim_events(&mut self, limit: usize) {
        self.events.truncate(limit.max(1));
    }

    /// Check the structural invariants, accumulating every violation.
    ///
    /// Only meaningful for containers that have processed at least one
    /// event; a freshly created container reports `EmptyHistory`.
    pub fn validate(&self, limit: usize) -> Validation<(), NonEmptyVec<ContainerViolation>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<ContainerViolation>>> = Vec::new();

        checks.push(if self.machine_id.is_empty() {
            Validation::fail(ContainerViolation::MissingMachineId)
        } else {
            Validation::success(())
        });

        checks.push(if self.events.is_empty() {
            Validation::fail(ContainerViolation::EmptyHistory)
        } else {
            Validation::success(())
        });

        checks.push(if self.last_event_time.is_none() {
            Validation::fail(ContainerViolation::MissingLastEventTime)
        } else {
            Validation::success(())
        });

        checks.push(if self.events.len() > limit {
            Validation::fail(ContainerViolation::HistoryOverLimit {
                len: self.events.len(),
                limit,
            })
        } else {
            Validation::success(())
        });

        Validation::all_vec(checks).map(|_| ())
    }
}
