//! The provisioning-event state machine.
//!
//! The machine is split into three pieces:
//! - [`table`]: which event kinds are accepted from which states
//! - [`handler`]: what happens to the container when a rule is taken
//! - [`machine`]: the dispatcher tying both together in [`step`]
//!
//! There is no long-lived machine object. Every call to [`step`] derives
//! the current state from the container it is given.

pub mod handler;
pub mod machine;
pub mod table;

mod error;

pub use error::FsmError;
pub use handler::{Applied, Handler};
pub use machine::{step, SideEffect, Step, StepContext, StepOutcome};
pub use table::{lookup, rules, Destination, Sources, TransitionRule};
