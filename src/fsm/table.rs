//! Declarative transition table.
//!
//! The table is pure data: which event kinds are accepted from which
//! states, and where they lead. Side effects live in [`super::handler`].

use crate::core::ProvisioningEventType as E;
use crate::core::ProvisioningState as S;
use crate::core::{ProvisioningEventType, ProvisioningState};

/// States a rule accepts its event from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sources {
    /// Only the listed states.
    Listed(&'static [ProvisioningState]),
    /// Every state, `Initial` included.
    Any,
}

/// Where a rule leads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    To(ProvisioningState),
    /// The machine keeps its current state.
    Stay,
}

/// A single `(event, sources) -> destination` rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionRule {
    pub event: ProvisioningEventType,
    pub sources: Sources,
    pub destination: Destination,
}

impl TransitionRule {
    /// Check if this rule accepts its event from `state` (pure)
    pub fn permits(&self, state: ProvisioningState) -> bool {
        match self.sources {
            Sources::Listed(states) => states.contains(&state),
            Sources::Any => true,
        }
    }

    /// State the machine is in after taking this rule from `from`.
    pub fn resolve(&self, from: ProvisioningState) -> ProvisioningState {
        match self.destination {
            Destination::To(state) => state,
            Destination::Stay => from,
        }
    }

    /// Whether the rule loops back onto its own destination.
    pub fn is_self_loop(&self) -> bool {
        match (self.destination, self.sources) {
            (Destination::To(state), Sources::Listed(states)) => states.contains(&state),
            _ => false,
        }
    }
}

const fn rule(
    event: ProvisioningEventType,
    sources: &'static [ProvisioningState],
    to: ProvisioningState,
) -> TransitionRule {
    TransitionRule {
        event,
        sources: Sources::Listed(sources),
        destination: Destination::To(to),
    }
}

/// Rules in precedence order; the first one accepting a pair wins.
const RULES: &[TransitionRule] = &[
    rule(E::PXEBooting, &[S::MachineReclaim, S::Initial], S::PXEBooting),
    rule(E::PXEBooting, &[S::PXEBooting], S::PXEBooting),
    rule(
        E::Preparing,
        &[S::PXEBooting, S::MachineReclaim, S::Initial],
        S::Preparing,
    ),
    rule(E::Registering, &[S::Preparing, S::Initial], S::Registering),
    rule(E::Waiting, &[S::Registering, S::Initial], S::Waiting),
    rule(E::Installing, &[S::Waiting, S::Initial], S::Installing),
    rule(
        E::BootingNewKernel,
        &[S::Installing, S::Initial],
        S::BootingNewKernel,
    ),
    rule(
        E::PhonedHome,
        &[S::BootingNewKernel, S::MachineReclaim, S::Initial],
        S::PhonedHome,
    ),
    rule(E::PhonedHome, &[S::PlannedReboot, S::PhonedHome], S::PhonedHome),
    TransitionRule {
        event: E::PlannedReboot,
        sources: Sources::Any,
        destination: Destination::To(S::PlannedReboot),
    },
    TransitionRule {
        event: E::MachineReclaim,
        sources: Sources::Any,
        destination: Destination::To(S::MachineReclaim),
    },
    TransitionRule {
        event: E::Alive,
        sources: Sources::Listed(&[
            S::Preparing,
            S::Registering,
            S::Waiting,
            S::Installing,
            S::BootingNewKernel,
            S::Initial,
        ]),
        destination: Destination::Stay,
    },
];

/// All rules in precedence order.
pub fn rules() -> &'static [TransitionRule] {
    RULES
}

/// Find the rule accepting `event` in `state` (pure)
pub fn lookup(
    state: ProvisioningState,
    event: ProvisioningEventType,
) -> Option<&'static TransitionRule> {
    RULES
        .iter()
        .find(|rule| rule.event == event && rule.permits(state))
}
