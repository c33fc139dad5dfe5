//! Provisioning states derived from a container's event history.
//!
//! The state of a machine is never stored. It is the kind of the newest
//! recorded milestone, or `Initial` when none has been recorded yet.
//! Heartbeats carry no state.

use super::event::{ProvisioningEvent, ProvisioningEventType};

labeled_enum! {
    /// Position of a machine in its provisioning lifecycle.
    #[allow(clippy::upper_case_acronyms)]
    pub enum ProvisioningState {
        /// No event has been recorded for the machine.
        Initial => "Initial",
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

impl ProvisioningState {
    /// State a machine is in once an event of this kind heads its history.
    /// `None` for heartbeats.
    pub fn of_event(event: ProvisioningEventType) -> Option<Self> {
        let state = match event {
            ProvisioningEventType::Alive => return None,
            ProvisioningEventType::PXEBooting => Self::PXEBooting,
            ProvisioningEventType::PlannedReboot => Self::PlannedReboot,
            ProvisioningEventType::Preparing => Self::Preparing,
            ProvisioningEventType::Registering => Self::Registering,
            ProvisioningEventType::Waiting => Self::Waiting,
            ProvisioningEventType::Installing => Self::Installing,
            ProvisioningEventType::BootingNewKernel => Self::BootingNewKernel,
            ProvisioningEventType::PhonedHome => Self::PhonedHome,
            ProvisioningEventType::MachineReclaim => Self::MachineReclaim,
        };
        Some(state)
    }

    /// Resolve the state of a newest-first history from its newest milestone.
    pub fn of_history(events: &[ProvisioningEvent]) -> Self {
        events
            .iter()
            .find_map(|event| Self::of_event(event.event))
            .unwrap_or(Self::Initial)
    }

    /// Lowercase rendering used in diagnostic messages.
    pub fn diagnostic_name(&self) -> String {
        self.name().to_lowercase()
    }
}
