//! Liveliness sweep.
//!
//! The state machine marks a machine `Alive` whenever it reports. Deciding
//! that a silent machine is `Dead` happens here, evaluated periodically
//! against the wall clock by whoever owns the containers.

use crate::config::FsmConfig;
use crate::core::{Liveliness, ProvisioningEventContainer};
use chrono::{DateTime, Utc};

/// Liveliness a container should have at `now` (pure).
///
/// Hibernating machines stop reporting on purpose and keep whatever
/// liveliness was last recorded for them.
pub fn evaluate(
    container: &ProvisioningEventContainer,
    now: DateTime<Utc>,
    hibernating: bool,
    config: &FsmConfig,
) -> Liveliness {
    let Some(last) = container.last_event_time else {
        return Liveliness::Unknown;
    };

    if hibernating {
        return container.liveliness;
    }

    if now - last > config.dead_after {
        Liveliness::Dead
    } else {
        Liveliness::Alive
    }
}

/// Apply [`evaluate`] to a container. Returns `true` if it changed.
pub fn sweep(
    container: &mut ProvisioningEventContainer,
    now: DateTime<Utc>,
    hibernating: bool,
    config: &FsmConfig,
) -> bool {
    let liveliness = evaluate(container, now, hibernating, config);
    if liveliness == container.liveliness {
        return false;
    }

    tracing::info!(
        machine_id = %container.machine_id,
        from = %container.liveliness,
        to = %liveliness,
        "machine liveliness changed"
    );
    container.liveliness = liveliness;
    true
}
