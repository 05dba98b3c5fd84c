//! Run configuration
//!
//! Every investigation run is constructed with an explicit `AgentConfig`.
//! Nothing in here is global: concurrent runs may use different
//! configurations safely.

use crate::error::AgentError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Confidence thresholds that partition [0,1] into recommendation bands.
///
/// Boundary values belong to the lower band: exactly `escalate` maps to
/// VERIFY, exactly `verify` maps to MONITOR, exactly `monitor` maps to
/// DISMISS.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreThresholds {
    pub escalate: f64,
    pub verify: f64,
    pub monitor: f64,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            escalate: 0.85,
            verify: 0.60,
            monitor: 0.40,
        }
    }
}

impl ScoreThresholds {
    /// Thresholds must be strictly decreasing and lie in [0,1] so the
    /// four bands partition the interval with no gap or overlap.
    pub fn validate(&self) -> Result<()> {
        let in_range =
            |v: f64| (0.0..=1.0).contains(&v);

        if !in_range(self.escalate) || !in_range(self.verify) || !in_range(self.monitor) {
            return Err(AgentError::ConfigError(
                "score thresholds must lie in [0,1]".to_string(),
            ));
        }

        if !(self.escalate > self.verify && self.verify > self.monitor) {
            return Err(AgentError::ConfigError(format!(
                "score thresholds must be strictly decreasing: {} > {} > {}",
                self.escalate, self.verify, self.monitor
            )));
        }

        Ok(())
    }
}

/// Configuration for one investigation loop instance.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model identifier sent to the Gemini API.
    pub model: String,
    /// Maximum reasoning/acting cycles before the run is forced to conclude.
    pub max_turns: u32,
    /// Retry budget for rate-limited / transient driver failures.
    pub driver_retries: u32,
    /// Per-call timeout for the reasoning driver.
    pub driver_timeout: Duration,
    /// Per-call timeout for a tool invocation.
    pub tool_timeout: Duration,
    /// Base delay for exponential backoff between driver retries.
    pub retry_base_delay: Duration,
    /// Confidence-to-band thresholds.
    pub thresholds: ScoreThresholds,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-pro".to_string(),
            max_turns: 10,
            driver_retries: 3,
            driver_timeout: Duration::from_secs(30),
            tool_timeout: Duration::from_secs(15),
            retry_base_delay: Duration::from_millis(500),
            thresholds: ScoreThresholds::default(),
        }
    }
}

impl AgentConfig {
    /// Load overrides from the environment on top of the defaults.
    ///
    /// Recognized variables: `AGENT_MODEL`, `AGENT_MAX_TURNS`,
    /// `AGENT_DRIVER_RETRIES`, `AGENT_DRIVER_TIMEOUT_SECS`,
    /// `AGENT_TOOL_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(model) = env::var("AGENT_MODEL") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }

        if let Ok(raw) = env::var("AGENT_MAX_TURNS") {
            config.max_turns = raw.parse().map_err(|_| {
                AgentError::ConfigError(format!("AGENT_MAX_TURNS is not a number: {}", raw))
            })?;
        }

        if let Ok(raw) = env::var("AGENT_DRIVER_RETRIES") {
            config.driver_retries = raw.parse().map_err(|_| {
                AgentError::ConfigError(format!("AGENT_DRIVER_RETRIES is not a number: {}", raw))
            })?;
        }

        if let Ok(raw) = env::var("AGENT_DRIVER_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                AgentError::ConfigError(format!(
                    "AGENT_DRIVER_TIMEOUT_SECS is not a number: {}",
                    raw
                ))
            })?;
            config.driver_timeout = Duration::from_secs(secs);
        }

        if let Ok(raw) = env::var("AGENT_TOOL_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                AgentError::ConfigError(format!("AGENT_TOOL_TIMEOUT_SECS is not a number: {}", raw))
            })?;
            config.tool_timeout = Duration::from_secs(secs);
        }

        config.thresholds.validate()?;

        if config.max_turns == 0 {
            return Err(AgentError::ConfigError(
                "AGENT_MAX_TURNS must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AgentConfig::default();
        assert_eq!(config.max_turns, 10);
        assert_eq!(config.driver_retries, 3);
        assert!(config.thresholds.validate().is_ok());
    }

    #[test]
    fn thresholds_must_decrease() {
        let bad = ScoreThresholds {
            escalate: 0.5,
            verify: 0.6,
            monitor: 0.4,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn thresholds_must_be_in_range() {
        let bad = ScoreThresholds {
            escalate: 1.2,
            verify: 0.6,
            monitor: 0.4,
        };
        assert!(bad.validate().is_err());
    }
}
