//! Ingestion shell around the pure state machine.
//!
//! This module provides the "imperative shell": it owns every interaction
//! with collaborators (storage, machine facts, pool scaling) so that
//! [`crate::fsm::step`] stays a pure function.
//!
//! # Key Concepts
//!
//! - **Environment**: collaborator traits bundled behind [`ProvisioningEnv`]
//! - **Ingest**: a stillwater effect running read, step and write, retrying
//!   the whole cycle on write conflicts
//! - **Side effects**: executed after a successful write; failures are
//!   reported as warnings, never as ingest errors

mod env;
mod ingest;

pub use env::{
    ContainerStore, Environment, MachineLookup, MemoryStore, NoopPoolScaler, PoolScaler,
    PoolScalingError, ProvisioningEnv, StaticMachines, StoreError,
};
pub use ingest::{ingest, process, IngestError, IngestReport};
