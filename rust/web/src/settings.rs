use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Timing of the asynchronous session lifecycle.
///
/// Defaults match the protocol bots are written against: ten one-second
/// readiness polls and a one-second pause before each event delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Number of re-checks after the first readiness poll
    pub readiness_attempts: u32,
    /// Pause between readiness polls in milliseconds
    pub readiness_interval_ms: u64,
    /// Pause before every event delivery in milliseconds
    pub delivery_delay_ms: u64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            readiness_attempts: 10,
            readiness_interval_ms: 1_000,
            delivery_delay_ms: 1_000,
        }
    }
}

impl LifecycleSettings {
    /// Millisecond timings suitable for tests.
    pub fn for_tests() -> Self {
        Self {
            readiness_attempts: 3,
            readiness_interval_ms: 10,
            delivery_delay_ms: 1,
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.readiness_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "readiness_interval_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn readiness_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_interval_ms)
    }

    pub fn delivery_delay(&self) -> Duration {
        Duration::from_millis(self.delivery_delay_ms)
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}
