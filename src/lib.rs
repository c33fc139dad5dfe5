//! Metal provisioning: a pure state machine over machine lifecycle events.
//!
//! Physical machines report lifecycle milestones (PXE boot, registration,
//! installation, phoning home) while they are provisioned. This crate turns
//! that duplicated and sometimes out-of-order event stream into a
//! per-machine container holding the event history, the machine's
//! liveliness, and two health flags: crash loop and failed reclaim.
//!
//! The state machine is a pure function of (previous container, new event);
//! storage, machine facts and pool scaling are collaborators of the
//! ingestion shell in [`effects`].
//!
//! # Core Concepts
//!
//! - **Container**: per-machine event history plus derived flags
//! - **Transition table**: declarative `(event, sources) -> destination` rules
//! - **Handlers**: side effects on the container per destination state
//! - **Step**: dispatches one event, classifying it as transitioned,
//!   swallowed or invalid
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use metal_provisioning::core::{ProvisioningEvent, ProvisioningEventContainer, ProvisioningEventType};
//! use metal_provisioning::fsm::{step, StepContext};
//! use metal_provisioning::FsmConfig;
//!
//! let config = FsmConfig::default();
//! let start = Utc::now();
//! let mut container = ProvisioningEventContainer::new("machine-1");
//!
//! for (i, kind) in [
//!     ProvisioningEventType::Registering,
//!     ProvisioningEventType::Preparing,
//! ]
//! .into_iter()
//! .enumerate()
//! {
//!     let event = ProvisioningEvent::new(kind, start + Duration::seconds(i as i64));
//!     container = step(container, event, &StepContext::default(), &config)
//!         .unwrap()
//!         .container;
//! }
//!
//! // Preparing after Registering does not fit the sequence
//! assert!(container.crash_loop);
//! assert_eq!(container.events.len(), 2);
//! ```

pub mod config;
pub mod core;
pub mod effects;
pub mod fsm;
pub mod liveliness;

// Re-export commonly used types
pub use config::{ConfigError, FsmConfig};
pub use crate::core::{
    Liveliness, ProvisioningEvent, ProvisioningEventContainer, ProvisioningEventType,
    ProvisioningState,
};
pub use fsm::{step, FsmError, SideEffect, Step, StepContext, StepOutcome};
