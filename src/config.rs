//! Engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::events::dispatcher::DEFAULT_LOW_POWER_FREQUENCY;
use crate::Error;

/// Tunables of the event service and its bridge collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Start in low-power mode
    pub low_power: bool,
    /// Ticks per second while in low-power mode
    pub low_power_frequency: u32,
    /// Delay before re-checking focus after it leaves an input
    pub focus_recheck_ms: u64,
    /// How long to wait for the host bridge to come up
    pub bridge_timeout_ms: u64,
    /// Interval between bridge readiness probes
    pub bridge_poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            low_power: false,
            low_power_frequency: DEFAULT_LOW_POWER_FREQUENCY,
            focus_recheck_ms: 0,
            bridge_timeout_ms: 3000,
            bridge_poll_interval_ms: 100,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.low_power_frequency == 0 {
            return Err(Error::Config(
                "low_power_frequency must be greater than zero".to_string(),
            ));
        }
        if self.bridge_poll_interval_ms == 0 {
            return Err(Error::Config(
                "bridge_poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn focus_recheck_delay(&self) -> Duration {
        Duration::from_millis(self.focus_recheck_ms)
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge_timeout_ms)
    }

    pub fn bridge_poll_interval(&self) -> Duration {
        Duration::from_millis(self.bridge_poll_interval_ms)
    }
}
