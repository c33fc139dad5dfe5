//! Provisioning event and container model.
//!
//! This module contains the data the state machine operates on:
//! - Event kinds and the events machines submit
//! - States derived from a machine's history
//! - The per-machine container with its health flags
//!
//! Nothing in here performs I/O.

#[macro_use]
mod macros;

mod container;
mod event;
mod state;

pub use container::{ContainerViolation, ProvisioningEventContainer};
pub use event::{Liveliness, ProvisioningEvent, ProvisioningEventType};
pub use macros::UnknownLabel;
pub use state::ProvisioningState;
