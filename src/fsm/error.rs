//! Contract violations raised by the state machine.

use crate::core::{ProvisioningEventType, ProvisioningState};
use thiserror::Error;

/// Errors that indicate a defect in the caller or in the transition table.
///
/// Data-quality problems (duplicated or out-of-order events) are never
/// reported through this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsmError {
    #[error("Provisioning event container has no machine id")]
    MissingMachineId,

    #[error("Event '{event}' from state '{from}' resolves to the initial state")]
    InitialDestination {
        event: ProvisioningEventType,
        from: ProvisioningState,
    },
}
