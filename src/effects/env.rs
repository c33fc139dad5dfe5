//! Collaborators the ingestion shell talks to.

use crate::core::ProvisioningEventContainer;
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors reported by a [`ContainerStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The stored container changed since it was read.
    #[error("Container for machine '{machine_id}' was modified concurrently")]
    Conflict { machine_id: String },

    #[error("Container store unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by a [`PoolScaler`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Adjusting waiting pool of partition '{partition_id}' failed: {reason}")]
pub struct PoolScalingError {
    pub partition_id: String,
    pub reason: String,
}

/// Durable storage for containers.
pub trait ContainerStore: Send + Sync {
    fn get(&self, machine_id: &str) -> Result<Option<ProvisioningEventContainer>, StoreError>;

    /// Write a container if its `changed` marker still matches the stored
    /// one, returning the container as stored.
    fn upsert(
        &self,
        container: ProvisioningEventContainer,
    ) -> Result<ProvisioningEventContainer, StoreError>;
}

/// Read-only facts about machines.
pub trait MachineLookup: Send + Sync {
    fn is_hibernating(&self, _machine_id: &str) -> bool {
        false
    }

    fn partition_id(&self, machine_id: &str) -> Option<String>;
}

/// Re-evaluates the size of a partition's pool of waiting machines.
pub trait PoolScaler: Send + Sync {
    fn adjust_waiting_pool_size(
        &self,
        machine_id: &str,
        partition_id: &str,
    ) -> Result<(), PoolScalingError>;
}

/// Capabilities the ingestion shell needs from its environment.
pub trait ProvisioningEnv: Send + Sync {
    fn store(&self) -> &dyn ContainerStore;
    fn machines(&self) -> &dyn MachineLookup;
    fn pool_scaler(&self) -> &dyn PoolScaler;
}

/// Shareable environment assembled from collaborator implementations.
#[derive(Clone)]
pub struct Environment {
    store: Arc<dyn ContainerStore>,
    machines: Arc<dyn MachineLookup>,
    pool_scaler: Arc<dyn PoolScaler>,
}

impl Environment {
    /// Environment over `store` with no machine facts and no pool scaling.
    pub fn new(store: Arc<dyn ContainerStore>) -> Self {
        Self {
            store,
            machines: Arc::new(StaticMachines::default()),
            pool_scaler: Arc::new(NoopPoolScaler),
        }
    }

    pub fn with_machines(mut self, machines: Arc<dyn MachineLookup>) -> Self {
        self.machines = machines;
        self
    }

    pub fn with_pool_scaler(mut self, pool_scaler: Arc<dyn PoolScaler>) -> Self {
        self.pool_scaler = pool_scaler;
        self
    }
}

impl ProvisioningEnv for Environment {
    fn store(&self) -> &dyn ContainerStore {
        self.store.as_ref()
    }

    fn machines(&self) -> &dyn MachineLookup {
        self.machines.as_ref()
    }

    fn pool_scaler(&self) -> &dyn PoolScaler {
        self.pool_scaler.as_ref()
    }
}

/// In-memory store with optimistic concurrency on the `changed` marker.
#[derive(Default)]
pub struct MemoryStore {
    containers: Mutex<HashMap<String, ProvisioningEventContainer>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored containers.
    pub fn count(&self) -> Result<usize, StoreError> {
        self.containers
            .lock()
            .map(|containers| containers.len())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl ContainerStore for MemoryStore {
    fn get(&self, machine_id: &str) -> Result<Option<ProvisioningEventContainer>, StoreError> {
        let containers = self
            .containers
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(containers.get(machine_id).cloned())
    }

    fn upsert(
        &self,
        mut container: ProvisioningEventContainer,
    ) -> Result<ProvisioningEventContainer, StoreError> {
        let mut containers = self
            .containers
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let stored_changed = containers.get(&container.machine_id).map(|c| c.changed);
        let changed = match stored_changed {
            None if container.changed.is_none() => Utc::now(),
            Some(stored) if stored == container.changed => {
                let now = Utc::now();
                match stored {
                    Some(previous) if previous >= now => previous + Duration::microseconds(1),
                    _ => now,
                }
            }
            _ => {
                return Err(StoreError::Conflict {
                    machine_id: container.machine_id,
                })
            }
        };

        container.changed = Some(changed);
        containers.insert(container.machine_id.clone(), container.clone());
        Ok(container)
    }
}

/// Fixed machine facts, keyed by machine id.
#[derive(Debug, Default, Clone)]
pub struct StaticMachines {
    hibernating: HashSet<String>,
    partitions: HashMap<String, String>,
}

impl StaticMachines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partition(
        mut self,
        machine_id: impl Into<String>,
        partition_id: impl Into<String>,
    ) -> Self {
        self.partitions.insert(machine_id.into(), partition_id.into());
        self
    }

    pub fn with_hibernating(mut self, machine_id: impl Into<String>) -> Self {
        self.hibernating.insert(machine_id.into());
        self
    }
}

impl MachineLookup for StaticMachines {
    fn is_hibernating(&self, machine_id: &str) -> bool {
        self.hibernating.contains(machine_id)
    }

    fn partition_id(&self, machine_id: &str) -> Option<String> {
        self.partitions.get(machine_id).cloned()
    }
}

/// Pool scaler that accepts every request and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPoolScaler;

impl PoolScaler for NoopPoolScaler {
    fn adjust_waiting_pool_size(
        &self,
        _machine_id: &str,
        _partition_id: &str,
    ) -> Result<(), PoolScalingError> {
        Ok(())
    }
}
