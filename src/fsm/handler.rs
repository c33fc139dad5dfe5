//! Side effects of taking a transition.
//!
//! Each destination state has one handler. Handlers mutate the container
//! in place and report how much of it they touched.

use super::error::FsmError;
use super::machine::StepContext;
use super::table::{Destination, TransitionRule};
use crate::config::FsmConfig;
use crate::core::{Liveliness, ProvisioningEvent, ProvisioningEventContainer, ProvisioningState};

/// What a handler did to the container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    /// The event was recorded in the history.
    Appended,
    /// Only timestamps, liveliness or flags changed.
    Refreshed,
    /// Nothing changed.
    Unchanged,
}

/// Handler identity, one per destination state.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handler {
    /// Registering, Waiting, Installing and BootingNewKernel.
    Append,
    PXEBooting,
    Preparing,
    /// Heartbeats that keep the current state.
    Alive,
    PhonedHome,
    PlannedReboot,
    MachineReclaim,
    /// Entering `Initial` is never legal.
    InitialGuard,
}

impl Handler {
    /// Handler for a destination state.
    pub fn for_state(state: ProvisioningState) -> Self {
        match state {
            ProvisioningState::Initial => Self::InitialGuard,
            ProvisioningState::PXEBooting => Self::PXEBooting,
            ProvisioningState::Preparing => Self::Preparing,
            ProvisioningState::Registering
            | ProvisioningState::Waiting
            | ProvisioningState::Installing
            | ProvisioningState::BootingNewKernel => Self::Append,
            ProvisioningState::PhonedHome => Self::PhonedHome,
            ProvisioningState::PlannedReboot => Self::PlannedReboot,
            ProvisioningState::MachineReclaim => Self::MachineReclaim,
        }
    }

    /// Handler run when `rule` is taken.
    pub fn for_rule(rule: &TransitionRule) -> Self {
        match rule.destination {
            Destination::To(state) => Self::for_state(state),
            Destination::Stay => Self::Alive,
        }
    }

    /// Apply this handler for a transition out of `from`.
    pub fn apply(
        self,
        container: &mut ProvisioningEventContainer,
        event: &ProvisioningEvent,
        from: ProvisioningState,
        context: &StepContext,
        config: &FsmConfig,
    ) -> Result<Applied, FsmError> {
        let applied = match self {
            Self::Append => append(container, event),
            Self::PXEBooting => {
                container.failed_machine_reclaim = false;
                if from == ProvisioningState::PXEBooting {
                    // agents retry PXE notifications, keep them out of the history
                    refresh(container, event)
                } else {
                    append(container, event)
                }
            }
            Self::Preparing => {
                container.failed_machine_reclaim = false;
                append(container, event)
            }
            // the first event for a machine always starts its history
            Self::Alive if container.events.is_empty() => record(container, event, context),
            Self::Alive => heartbeat(container, event, context),
            Self::PhonedHome => phoned_home(container, event, from, config),
            Self::PlannedReboot | Self::MachineReclaim => {
                container.crash_loop = false;
                append(container, event)
            }
            Self::InitialGuard => {
                return Err(FsmError::InitialDestination {
                    event: event.event,
                    from,
                })
            }
        };
        Ok(applied)
    }
}

fn phoned_home(
    container: &mut ProvisioningEventContainer,
    event: &ProvisioningEvent,
    from: ProvisioningState,
    config: &FsmConfig,
) -> Applied {
    match from {
        ProvisioningState::PhonedHome => refresh(container, event),
        ProvisioningState::MachineReclaim => match container.last_event_time {
            Some(last) if event.time - last > config.reclaim_grace_period => {
                container.failed_machine_reclaim = true;
                container.last_event_time = Some(event.time);
                Applied::Refreshed
            }
            Some(_) => Applied::Unchanged,
            None => {
                container.last_event_time = Some(event.time);
                Applied::Refreshed
            }
        },
        _ => {
            container.crash_loop = false;
            append(container, event)
        }
    }
}

fn append(
    container: &mut ProvisioningEventContainer,
    event: &ProvisioningEvent,
) -> Applied {
    container.events.insert(0, event.clone());
    refresh(container, event);
    Applied::Appended
}

/// Prepend `event` without treating it as proof of life for a hibernating
/// machine.
pub(crate) fn record(
    container: &mut ProvisioningEventContainer,
    event: &ProvisioningEvent,
    context: &StepContext,
) -> Applied {
    container.events.insert(0, event.clone());
    heartbeat(container, event, context);
    Applied::Appended
}

/// Refresh the container for a heartbeat; never touches the history.
pub(crate) fn heartbeat(
    container: &mut ProvisioningEventContainer,
    event: &ProvisioningEvent,
    context: &StepContext,
) -> Applied {
    container.last_event_time = Some(event.time);
    if !context.hibernating {
        container.liveliness = Liveliness::Alive;
    }
    Applied::Refreshed
}

fn refresh(container: &mut ProvisioningEventContainer, event: &ProvisioningEvent) -> Applied {
    container.last_event_time = Some(event.time);
    container.liveliness = Liveliness::Alive;
    Applied::Refreshed
}
