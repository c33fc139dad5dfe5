//! Provisioning events as submitted by a machine's boot and install agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

labeled_enum! {
    /// Kind of lifecycle notification a machine reports.
    #[allow(clippy::upper_case_acronyms)]
    pub enum ProvisioningEventType {
        /// Periodic heartbeat, not a milestone.
        Alive => "Alive",
        PXEBooting => "PXE Booting",
        PlannedReboot => "Planned Reboot",
        Preparing => "Preparing",
        Registering => "Registering",
        Waiting => "Waiting",
        Installing => "Installing",
        BootingNewKernel => "Booting New Kernel",
        PhonedHome => "Phoned Home",
        MachineReclaim => "Machine Reclaim",
    }
}

labeled_enum! {
    /// Whether a machine is currently communicating.
    pub enum Liveliness {
        Alive => "Alive",
        Dead => "Dead",
        Unknown => "Unknown",
    }
}

impl Default for Liveliness {
    fn default() -> Self {
        Self::Unknown
    }
}

/// A single timestamped lifecycle notification.
///
/// Events are immutable values; agents may submit the same milestone more
/// than once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProvisioningEvent {
    /// When the agent observed the milestone
    pub time: DateTime<Utc>,
    /// The milestone kind
    pub event: ProvisioningEventType,
    /// Free-text detail supplied by the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProvisioningEvent {
    pub fn new(event: ProvisioningEventType, time: DateTime<Utc>) -> Self {
        Self {
            time,
            event,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
