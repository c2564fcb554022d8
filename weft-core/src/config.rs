//! Scheduler Configuration
//!
//! Runtime knobs for the scheduling core. Configuration is plain serde
//! data, loadable from a JSON file or built in code with [`Default`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::SchedulingError;

fn default_schedule_timeout_ms() -> u64 {
    10_000
}

fn default_max_schedule_attempts() -> u32 {
    3
}

/// Configuration for the scheduling core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum time a single `attempt_schedule` call blocks waiting for a
    /// free slot, in milliseconds. Zero means "return immediately if no
    /// slot is available".
    #[serde(default = "default_schedule_timeout_ms")]
    pub schedule_timeout_ms: u64,

    /// How many placement attempts the batch scheduler makes per task group
    /// before giving up. Must be at least 1.
    #[serde(default = "default_max_schedule_attempts")]
    pub max_schedule_attempts: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schedule_timeout_ms: default_schedule_timeout_ms(),
            max_schedule_attempts: default_max_schedule_attempts(),
        }
    }
}

impl SchedulerConfig {
    /// The admission timeout as a [`Duration`].
    pub fn schedule_timeout(&self) -> Duration {
        Duration::from_millis(self.schedule_timeout_ms)
    }

    /// Check the configuration for values the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), SchedulingError> {
        if self.max_schedule_attempts == 0 {
            return Err(SchedulingError::InvalidConfig(
                "max_schedule_attempts must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load and validate a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scheduler config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing scheduler config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }
}
