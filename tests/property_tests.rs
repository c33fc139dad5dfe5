//! Property-based tests for the provisioning state machine.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated event streams.

use chrono::{DateTime, Duration, TimeZone, Utc};
use metal_provisioning::core::{
    ProvisioningEvent, ProvisioningEventContainer, ProvisioningEventType, ProvisioningState,
};
use metal_provisioning::fsm::{rules, step, Destination, Handler, StepContext, StepOutcome};
use metal_provisioning::FsmConfig;
use proptest::prelude::*;

prop_compose! {
    fn arbitrary_event_type()(index in 0..ProvisioningEventType::ALL.len()) -> ProvisioningEventType {
        ProvisioningEventType::ALL[index]
    }
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
}

fn seeded_with(kind: ProvisioningEventType) -> ProvisioningEventContainer {
    let mut container = ProvisioningEventContainer::new("machine-1");
    let event = ProvisioningEvent::new(kind, base_time());
    container.last_event_time = Some(event.time);
    container.events.push(event);
    container
}

fn run(
    container: ProvisioningEventContainer,
    kind: ProvisioningEventType,
    time: DateTime<Utc>,
) -> metal_provisioning::Step {
    step(
        container,
        ProvisioningEvent::new(kind, time),
        &StepContext::default(),
        &FsmConfig::default(),
    )
    .unwrap()
}

#[test]
fn no_rule_runs_the_initial_guard() {
    for rule in rules() {
        assert_ne!(
            Handler::for_rule(rule),
            Handler::InitialGuard,
            "rule for {} enters the initial state",
            rule.event
        );
        assert_ne!(rule.destination, Destination::To(ProvisioningState::Initial));
    }
}

#[test]
fn every_enterable_state_is_reachable() {
    for state in ProvisioningState::ALL {
        if *state == ProvisioningState::Initial {
            continue;
        }
        assert!(
            rules()
                .iter()
                .any(|rule| rule.destination == Destination::To(*state)),
            "{state} is not reachable"
        );
    }
}

#[test]
fn every_event_type_has_a_rule() {
    for event in ProvisioningEventType::ALL {
        assert!(rules().iter().any(|rule| rule.event == *event));
    }
}

proptest! {
    #[test]
    fn any_pair_of_events_yields_a_valid_container(
        previous in arbitrary_event_type(),
        next in arbitrary_event_type(),
        offset in 0i64..3600,
    ) {
        let config = FsmConfig::default();
        let step = run(seeded_with(previous), next, base_time() + Duration::seconds(offset));

        prop_assert!(step.container.validate(config.event_inspection_limit).is_success());
    }

    #[test]
    fn any_stream_yields_a_valid_container(
        kinds in prop::collection::vec(arbitrary_event_type(), 1..40)
    ) {
        let config = FsmConfig::default();
        let mut container = ProvisioningEventContainer::new("machine-1");

        for (i, kind) in kinds.iter().enumerate() {
            container = run(container, *kind, base_time() + Duration::seconds(i as i64)).container;
            prop_assert!(!container.events.is_empty());
        }

        prop_assert!(container.last_event_time.is_some());
        prop_assert!(container.events.len() <= config.event_inspection_limit);
    }

    #[test]
    fn invalid_steps_always_flag_crash_loop(
        previous in arbitrary_event_type(),
        next in arbitrary_event_type(),
    ) {
        let step = run(seeded_with(previous), next, base_time() + Duration::seconds(1));

        if let StepOutcome::Invalid { .. } = step.outcome {
            prop_assert!(step.container.crash_loop);
            prop_assert!(step.container.last_error_event.is_some());
            prop_assert_eq!(step.container.events.len(), 2);
            prop_assert_eq!(step.container.events[0].event, next);
        }
    }

    #[test]
    fn heartbeats_never_flag_or_grow_history(
        previous in arbitrary_event_type(),
        repeats in 1usize..10,
    ) {
        let mut container = seeded_with(previous);
        let events = container.events.clone();
        let crash_loop = container.crash_loop;

        for i in 0..repeats {
            let step = run(
                container,
                ProvisioningEventType::Alive,
                base_time() + Duration::seconds(i as i64 + 1),
            );
            prop_assert!(step.outcome.is_accepted());
            container = step.container;
        }

        prop_assert_eq!(container.events, events);
        prop_assert_eq!(container.crash_loop, crash_loop);
    }

    #[test]
    fn repeated_pxe_boots_never_grow_history(repeats in 1usize..20) {
        let mut container = run(
            ProvisioningEventContainer::new("machine-1"),
            ProvisioningEventType::PXEBooting,
            base_time(),
        )
        .container;

        for i in 0..repeats {
            let step = run(
                container,
                ProvisioningEventType::PXEBooting,
                base_time() + Duration::seconds(i as i64 + 1),
            );
            prop_assert!(
                matches!(step.outcome, StepOutcome::Swallowed { .. }),
                "repeat was not swallowed"
            );
            container = step.container;
        }

        prop_assert_eq!(container.events.len(), 1);
        prop_assert!(!container.crash_loop);
    }

    #[test]
    fn overrides_are_accepted_from_any_state(
        previous in arbitrary_event_type(),
        crash_loop in any::<bool>(),
    ) {
        for override_event in [ProvisioningEventType::PlannedReboot, ProvisioningEventType::MachineReclaim] {
            let mut container = seeded_with(previous);
            container.crash_loop = crash_loop;
            let step = run(container, override_event, base_time() + Duration::seconds(1));

            prop_assert!(step.outcome.is_accepted());
            prop_assert!(!step.container.crash_loop);
        }
    }

    #[test]
    fn step_is_deterministic(
        previous in arbitrary_event_type(),
        next in arbitrary_event_type(),
    ) {
        let time = base_time() + Duration::seconds(30);
        let first = run(seeded_with(previous), next, time);
        let second = run(seeded_with(previous), next, time);

        prop_assert_eq!(first, second);
    }
}
