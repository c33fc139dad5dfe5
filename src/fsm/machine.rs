//! Dispatcher: one event against one container.

use super::error::FsmError;
use super::handler::{heartbeat, record, Applied, Handler};
use super::table;
use crate::config::FsmConfig;
use crate::core::{
    ProvisioningEvent, ProvisioningEventContainer, ProvisioningEventType, ProvisioningState,
};

/// Facts about the machine the pure step cannot look up itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepContext {
    /// The machine was deliberately put to sleep and stops reporting.
    pub hibernating: bool,
}

impl StepContext {
    pub fn hibernating() -> Self {
        Self { hibernating: true }
    }
}

/// Classification of a processed event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The event was accepted and recorded.
    Transitioned {
        from: ProvisioningState,
        to: ProvisioningState,
    },

    /// The event was accepted without being recorded (repeats, heartbeats
    /// in any state).
    Swallowed { state: ProvisioningState },

    /// No rule accepts the event in this state. It is still recorded and the
    /// container is flagged as crash looping.
    Invalid { state: ProvisioningState },
}

impl StepOutcome {
    /// Transitioned and swallowed events are both accepted.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Invalid { .. })
    }
}

/// Work the caller has to perform after persisting the step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SideEffect {
    /// The machine entered or left `Waiting`; its partition's waiting pool
    /// needs to be re-evaluated.
    AdjustWaitingPool,
}

/// Result of a single step.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub container: ProvisioningEventContainer,
    pub outcome: StepOutcome,
    pub effects: Vec<SideEffect>,
}

/// Process one event for one machine.
///
/// This is a pure function of the previous container and the event. Events
/// that do not fit the provisioning sequence are recorded as anomalies and
/// never returned as errors; `Err` is reserved for contract violations.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use metal_provisioning::core::{ProvisioningEvent, ProvisioningEventContainer, ProvisioningEventType};
/// use metal_provisioning::fsm::{step, StepContext, StepOutcome};
/// use metal_provisioning::FsmConfig;
///
/// let container = ProvisioningEventContainer::new("machine-1");
/// let event = ProvisioningEvent::new(ProvisioningEventType::PXEBooting, Utc::now());
///
/// let step = step(container, event, &StepContext::default(), &FsmConfig::default()).unwrap();
/// assert!(matches!(step.outcome, StepOutcome::Transitioned { .. }));
/// assert_eq!(step.container.events.len(), 1);
/// ```
pub fn step(
    mut container: ProvisioningEventContainer,
    event: ProvisioningEvent,
    context: &StepContext,
    config: &FsmConfig,
) -> Result<Step, FsmError> {
    if container.machine_id.is_empty() {
        return Err(FsmError::MissingMachineId);
    }

    let from = container.current_state();

    let outcome = match table::lookup(from, event.event) {
        Some(rule) => {
            let handler = Handler::for_rule(rule);
            match handler.apply(&mut container, &event, from, context, config)? {
                Applied::Appended => StepOutcome::Transitioned {
                    from,
                    to: rule.resolve(from),
                },
                Applied::Refreshed | Applied::Unchanged => StepOutcome::Swallowed { state: from },
            }
        }
        None if event.event == ProvisioningEventType::Alive => {
            heartbeat(&mut container, &event, context);
            StepOutcome::Swallowed { state: from }
        }
        None => {
            record_unexpected(&mut container, event, from, context);
            StepOutcome::Invalid { state: from }
        }
    };

    container.trim_events(config.event_inspection_limit);

    let to = container.current_state();
    let mut effects = Vec::new();
    if from != to && (from == ProvisioningState::Waiting || to == ProvisioningState::Waiting) {
        effects.push(SideEffect::AdjustWaitingPool);
    }

    match outcome {
        StepOutcome::Invalid { state } => tracing::warn!(
            machine_id = %container.machine_id,
            state = %state,
            "unexpected provisioning event"
        ),
        _ => tracing::debug!(
            machine_id = %container.machine_id,
            from = %from,
            to = %to,
            "provisioning event accepted"
        ),
    }

    Ok(Step {
        container,
        outcome,
        effects,
    })
}

fn record_unexpected(
    container: &mut ProvisioningEventContainer,
    event: ProvisioningEvent,
    state: ProvisioningState,
    context: &StepContext,
) {
    let annotation = format!(
        "{} is unexpectedly received in state {}",
        event.event,
        state.diagnostic_name()
    );
    let message = match &event.message {
        Some(original) => format!("{annotation}: {original}"),
        None => annotation,
    };

    container.crash_loop = true;
    container.last_error_event = Some(ProvisioningEvent {
        message: Some(message),
        ..event.clone()
    });
    record(container, &event, context);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Liveliness, ProvisioningEventType};
    use chrono::{DateTime, Duration, Utc};

    fn at(kind: ProvisioningEventType, time: DateTime<Utc>) -> ProvisioningEvent {
        ProvisioningEvent::new(kind, time)
    }

    fn run(container: ProvisioningEventContainer, event: ProvisioningEvent) -> Step {
        step(
            container,
            event,
            &StepContext::default(),
            &FsmConfig::default(),
        )
        .unwrap()
    }

    fn seeded(kinds: &[ProvisioningEventType]) -> ProvisioningEventContainer {
        let start = Utc::now() - Duration::hours(1);
        kinds
            .iter()
            .enumerate()
            .fold(ProvisioningEventContainer::new("m1"), |container, (i, kind)| {
                run(container, at(*kind, start + Duration::seconds(i as i64))).container
            })
    }

    #[test]
    fn first_event_creates_history() {
        let event = at(ProvisioningEventType::PXEBooting, Utc::now());
        let step = run(ProvisioningEventContainer::new("m1"), event.clone());

        assert_eq!(
            step.outcome,
            StepOutcome::Transitioned {
                from: ProvisioningState::Initial,
                to: ProvisioningState::PXEBooting,
            }
        );
        assert_eq!(step.container.events, vec![event.clone()]);
        assert_eq!(step.container.last_event_time, Some(event.time));
        assert_eq!(step.container.liveliness, Liveliness::Alive);
    }

    #[test]
    fn missing_machine_id_is_a_contract_violation() {
        let result = step(
            ProvisioningEventContainer::new(""),
            at(ProvisioningEventType::PXEBooting, Utc::now()),
            &StepContext::default(),
            &FsmConfig::default(),
        );

        assert_eq!(result, Err(FsmError::MissingMachineId));
    }

    #[test]
    fn unexpected_event_is_recorded_not_rejected() {
        let container = seeded(&[
            ProvisioningEventType::PXEBooting,
            ProvisioningEventType::Preparing,
            ProvisioningEventType::Registering,
        ]);
        let event = at(ProvisioningEventType::Preparing, Utc::now()).with_message("retry");

        let step = run(container, event.clone());

        assert_eq!(
            step.outcome,
            StepOutcome::Invalid {
                state: ProvisioningState::Registering
            }
        );
        assert!(!step.outcome.is_accepted());
        assert!(step.container.crash_loop);
        assert_eq!(step.container.events.len(), 4);
        assert_eq!(step.container.events[0], event);
        assert_eq!(step.container.last_event_time, Some(event.time));

        let error = step.container.last_error_event.unwrap();
        let message = error.message.unwrap();
        assert!(message.contains("unexpectedly received in state registering"));
        assert!(message.ends_with(": retry"));
    }

    #[test]
    fn repeated_phone_home_is_swallowed() {
        let container = seeded(&[
            ProvisioningEventType::BootingNewKernel,
            ProvisioningEventType::PhonedHome,
        ]);

        let event = at(ProvisioningEventType::PhonedHome, Utc::now());
        let step = run(container, event.clone());

        assert_eq!(
            step.outcome,
            StepOutcome::Swallowed {
                state: ProvisioningState::PhonedHome
            }
        );
        assert_eq!(step.container.events.len(), 2);
        assert_eq!(step.container.last_event_time, Some(event.time));
    }

    #[test]
    fn entering_and_leaving_waiting_adjusts_pool() {
        let container = seeded(&[
            ProvisioningEventType::Preparing,
            ProvisioningEventType::Registering,
        ]);

        let entering = run(container, at(ProvisioningEventType::Waiting, Utc::now()));
        assert_eq!(entering.effects, vec![SideEffect::AdjustWaitingPool]);

        let heartbeat = run(
            entering.container,
            at(ProvisioningEventType::Alive, Utc::now()),
        );
        assert!(heartbeat.effects.is_empty());

        let leaving = run(
            heartbeat.container,
            at(ProvisioningEventType::Installing, Utc::now()),
        );
        assert_eq!(leaving.effects, vec![SideEffect::AdjustWaitingPool]);
    }

    #[test]
    fn history_is_bounded_by_inspection_limit() {
        let config = FsmConfig::default().with_event_inspection_limit(3);
        let mut container = ProvisioningEventContainer::new("m1");
        for kind in [
            ProvisioningEventType::PXEBooting,
            ProvisioningEventType::Preparing,
            ProvisioningEventType::Registering,
            ProvisioningEventType::Waiting,
            ProvisioningEventType::Installing,
        ] {
            container = step(
                container,
                at(kind, Utc::now()),
                &StepContext::default(),
                &config,
            )
            .unwrap()
            .container;
        }

        assert_eq!(container.events.len(), 3);
        assert_eq!(container.current_state(), ProvisioningState::Installing);
    }

    #[test]
    fn heartbeat_in_steady_state_is_swallowed() {
        let container = seeded(&[
            ProvisioningEventType::BootingNewKernel,
            ProvisioningEventType::PhonedHome,
        ]);
        let events = container.events.clone();

        let step = run(container, at(ProvisioningEventType::Alive, Utc::now()));
        assert_eq!(
            step.outcome,
            StepOutcome::Swallowed {
                state: ProvisioningState::PhonedHome
            }
        );
        assert!(!step.container.crash_loop);
        assert_eq!(step.container.events, events);

        let step = run(step.container, at(ProvisioningEventType::PhonedHome, Utc::now()));
        assert!(step.outcome.is_accepted());
        assert!(!step.container.crash_loop);
    }

    #[test]
    fn unexpected_event_keeps_hibernating_machine_liveliness() {
        let mut container = seeded(&[ProvisioningEventType::Registering]);
        container.liveliness = Liveliness::Dead;
        let event = at(ProvisioningEventType::Preparing, Utc::now());

        let step = step(
            container,
            event.clone(),
            &StepContext::hibernating(),
            &FsmConfig::default(),
        )
        .unwrap();

        assert!(matches!(step.outcome, StepOutcome::Invalid { .. }));
        assert_eq!(step.container.liveliness, Liveliness::Dead);
        assert_eq!(step.container.last_event_time, Some(event.time));
        assert_eq!(step.container.events[0], event);
    }

    #[test]
    fn first_heartbeat_creates_history() {
        let event = at(ProvisioningEventType::Alive, Utc::now());
        let step = run(ProvisioningEventContainer::new("m1"), event.clone());

        assert!(step.outcome.is_accepted());
        assert_eq!(step.container.events, vec![event]);
        assert!(step.container.validate(FsmConfig::default().event_inspection_limit).is_success());

        let step = run(step.container, at(ProvisioningEventType::PXEBooting, Utc::now()));
        assert_eq!(
            step.outcome,
            StepOutcome::Transitioned {
                from: ProvisioningState::Initial,
                to: ProvisioningState::PXEBooting,
            }
        );
    }
}
