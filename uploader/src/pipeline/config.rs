//! Upload pipeline configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upload pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Concurrent upload workers
    pub workers: usize,

    /// Delay between starting successive workers, in milliseconds
    #[serde(rename = "stagger-ms")]
    pub stagger_ms: u64,

    /// How long a completed item keeps its preview before it is released
    #[serde(rename = "preview-grace-ms")]
    pub preview_grace_ms: u64,

    /// Delete attempts made for a remote object whose metadata write failed
    #[serde(rename = "compensation-attempts")]
    pub compensation_attempts: u32,

    /// Pause between compensation attempts, in milliseconds
    #[serde(rename = "compensation-backoff-ms")]
    pub compensation_backoff_ms: u64,

    /// Event channel capacity
    #[serde(rename = "event-capacity")]
    pub event_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            stagger_ms: 1000,
            preview_grace_ms: 3000,
            compensation_attempts: 3,
            compensation_backoff_ms: 250,
            event_capacity: crate::events::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl PipelineConfig {
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    /// Start delay for the `n`th worker of a batch; saturates instead of overflowing
    pub fn stagger_for(&self, n: usize) -> Duration {
        self.stagger().saturating_mul(u32::try_from(n).unwrap_or(u32::MAX))
    }

    pub fn preview_grace(&self) -> Duration {
        Duration::from_millis(self.preview_grace_ms)
    }

    pub fn compensation_backoff(&self) -> Duration {
        Duration::from_millis(self.compensation_backoff_ms)
    }
}
