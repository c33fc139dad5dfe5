//! Read-step-write cycle for one inbound event.

use super::env::{ProvisioningEnv, StoreError};
use crate::config::FsmConfig;
use crate::core::{ProvisioningEvent, ProvisioningEventContainer};
use crate::fsm::{step, FsmError, SideEffect, Step, StepContext, StepOutcome};
use stillwater::effect::Effect;
use stillwater::prelude::*;
use thiserror::Error;

/// Failures of an ingest. An event that does not fit the provisioning
/// sequence is not one of them.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("Gave up on machine '{machine_id}' after {attempts} conflicting writes")]
    ConflictRetriesExhausted { machine_id: String, attempts: usize },

    #[error(transparent)]
    Fsm(#[from] FsmError),
}

/// Result of a successful ingest.
#[derive(Clone, Debug, PartialEq)]
pub struct IngestReport {
    pub machine_id: String,
    pub outcome: StepOutcome,
    /// The container as persisted.
    pub container: ProvisioningEventContainer,
    /// Non-fatal problems while carrying out side effects.
    pub warnings: Vec<String>,
}

/// Ingest one event for a machine.
///
/// Returns an effect that, when run against an environment, loads the
/// machine's container (creating it on the first event), steps the state
/// machine and persists the result. A write conflict restarts the whole
/// cycle from the read, at most `config.max_conflict_retries` times.
pub fn ingest<Env>(
    machine_id: impl Into<String>,
    event: ProvisioningEvent,
    config: FsmConfig,
) -> impl Effect<Output = IngestReport, Error = IngestError, Env = Env>
where
    Env: ProvisioningEnv + Clone + Send + Sync + 'static,
{
    let machine_id = machine_id.into();
    from_fn(move |env: &Env| process(env, &machine_id, &event, &config))
}

/// Synchronous form of [`ingest`].
pub fn process<Env>(
    env: &Env,
    machine_id: &str,
    event: &ProvisioningEvent,
    config: &FsmConfig,
) -> Result<IngestReport, IngestError>
where
    Env: ProvisioningEnv + ?Sized,
{
    let context = StepContext {
        hibernating: env.machines().is_hibernating(machine_id),
    };

    let mut attempts = 0;
    loop {
        attempts += 1;

        let container = env
            .store()
            .get(machine_id)?
            .unwrap_or_else(|| ProvisioningEventContainer::new(machine_id));
        let Step {
            container,
            outcome,
            effects,
        } = step(container, event.clone(), &context, config)?;

        match env.store().upsert(container) {
            Ok(stored) => {
                let warnings = run_side_effects(env, machine_id, &effects);
                return Ok(IngestReport {
                    machine_id: machine_id.to_string(),
                    outcome,
                    container: stored,
                    warnings,
                });
            }
            Err(StoreError::Conflict { .. }) if attempts <= config.max_conflict_retries => {
                tracing::warn!(machine_id, attempts, "conflicting container write, retrying");
            }
            Err(StoreError::Conflict { .. }) => {
                return Err(IngestError::ConflictRetriesExhausted {
                    machine_id: machine_id.to_string(),
                    attempts,
                })
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn run_side_effects<Env>(env: &Env, machine_id: &str, effects: &[SideEffect]) -> Vec<String>
where
    Env: ProvisioningEnv + ?Sized,
{
    let mut warnings = Vec::new();
    for effect in effects {
        match effect {
            SideEffect::AdjustWaitingPool => {
                let Some(partition_id) = env.machines().partition_id(machine_id) else {
                    tracing::debug!(machine_id, "machine has no partition, pool not adjusted");
                    continue;
                };
                if let Err(e) = env
                    .pool_scaler()
                    .adjust_waiting_pool_size(machine_id, &partition_id)
                {
                    tracing::warn!(machine_id, error = %e, "waiting pool adjustment failed");
                    warnings.push(e.to_string());
                }
            }
        }
    }
    warnings
}
