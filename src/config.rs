//! State machine configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("event_inspection_limit must be at least 1")]
    ZeroInspectionLimit,

    #[error("{field} must not be negative")]
    NegativeDuration { field: &'static str },
}

/// Tuning knobs for event processing.
///
/// Durations are (de)serialized as whole seconds. Keys missing from a
/// configuration document take their default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsmConfig {
    /// Maximum number of events kept in a container's history.
    pub event_inspection_limit: usize,
    /// How long a reclaimed machine may take to phone home again.
    #[serde(with = "seconds")]
    pub reclaim_grace_period: Duration,
    /// Silence after which the liveliness sweep declares a machine dead.
    #[serde(with = "seconds")]
    pub dead_after: Duration,
    /// Conflicting writes tolerated before an ingest gives up.
    pub max_conflict_retries: usize,
}

impl Default for FsmConfig {
    fn default() -> Self {
        Self {
            // two full passes of the expected provisioning sequence
            event_inspection_limit: 16,
            reclaim_grace_period: Duration::minutes(5),
            dead_after: Duration::minutes(5),
            max_conflict_retries: 10,
        }
    }
}

impl FsmConfig {
    /// Parse a JSON document and check its values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_inspection_limit == 0 {
            return Err(ConfigError::ZeroInspectionLimit);
        }
        if self.reclaim_grace_period < Duration::zero() {
            return Err(ConfigError::NegativeDuration {
                field: "reclaim_grace_period",
            });
        }
        if self.dead_after < Duration::zero() {
            return Err(ConfigError::NegativeDuration {
                field: "dead_after",
            });
        }
        Ok(())
    }

    pub fn with_event_inspection_limit(mut self, limit: usize) -> Self {
        self.event_inspection_limit = limit;
        self
    }

    pub fn with_reclaim_grace_period(mut self, period: Duration) -> Self {
        self.reclaim_grace_period = period;
        self
    }

    pub fn with_dead_after(mut self, after: Duration) -> Self {
        self.dead_after = after;
        self
    }

    pub fn with_max_conflict_retries(mut self, retries: usize) -> Self {
        self.max_conflict_retries = retries;
        self
    }
}

mod seconds {
    use chrono::Duration;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Duration::try_seconds(secs)
            .ok_or_else(|| D::Error::custom(format!("{secs} seconds is out of range")))
    }
}
