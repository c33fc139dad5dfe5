//! Provisioning Walkthrough
//!
//! This example feeds one machine's boot agent reports through the ingest shell.
//!
//! Key concepts:
//! - Happy path from PXE boot to phoning home
//! - Duplicate and heartbeat events are swallowed
//! - Out-of-order events are recorded and flag a crash loop
//! - A reclaimed machine that phones home too late is flagged
//!
//! Run with: cargo run --example provisioning_walkthrough

use chrono::{DateTime, Duration, Utc};
use metal_provisioning::core::{ProvisioningEvent, ProvisioningEventType};
use metal_provisioning::effects::{process, Environment, MemoryStore, StaticMachines};
use metal_provisioning::FsmConfig;
use std::sync::Arc;

fn report(env: &Environment, kind: ProvisioningEventType, time: DateTime<Utc>) {
    let event = ProvisioningEvent::new(kind, time);
    let report = process(env, "rack-07-node-3", &event, &FsmConfig::default()).unwrap();

    println!(
        "  {:<20} -> {:?} (events: {}, crash loop: {}, failed reclaim: {})",
        kind.name(),
        report.outcome,
        report.container.events.len(),
        report.container.crash_loop,
        report.container.failed_machine_reclaim,
    );
}

fn main() {
    println!("=== Provisioning Walkthrough ===\n");

    let env = Environment::new(Arc::new(MemoryStore::new())).with_machines(Arc::new(
        StaticMachines::new().with_partition("rack-07-node-3", "fra-equ01"),
    ));
    let start = Utc::now() - Duration::hours(2);

    println!("Happy path:");
    for (i, kind) in [
        ProvisioningEventType::PXEBooting,
        ProvisioningEventType::PXEBooting,
        ProvisioningEventType::Preparing,
        ProvisioningEventType::Registering,
        ProvisioningEventType::Waiting,
        ProvisioningEventType::Alive,
        ProvisioningEventType::Installing,
        ProvisioningEventType::BootingNewKernel,
        ProvisioningEventType::PhonedHome,
        ProvisioningEventType::Alive,
    ]
    .into_iter()
    .enumerate()
    {
        report(&env, kind, start + Duration::minutes(i as i64));
    }

    println!("\nReclaim without a reboot:");
    let reclaimed = start + Duration::minutes(30);
    report(&env, ProvisioningEventType::MachineReclaim, reclaimed);
    report(
        &env,
        ProvisioningEventType::PhonedHome,
        reclaimed + Duration::minutes(10),
    );

    println!("\nMachine comes back but skips a milestone:");
    report(
        &env,
        ProvisioningEventType::PXEBooting,
        reclaimed + Duration::minutes(11),
    );
    report(
        &env,
        ProvisioningEventType::Registering,
        reclaimed + Duration::minutes(12),
    );
    report(
        &env,
        ProvisioningEventType::Preparing,
        reclaimed + Duration::minutes(13),
    );

    println!("\nAn operator override clears the crash loop:");
    report(
        &env,
        ProvisioningEventType::PlannedReboot,
        reclaimed + Duration::minutes(14),
    );
}
