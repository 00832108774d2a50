//! Scheduler configuration

use serde::{Deserialize, Serialize};

/// Worker count used when none (or zero) is configured
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Batch scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on concurrent invocations of the operation
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: usize,

    /// Stop dispatching new items after the first item failure
    #[serde(rename = "break-on-item-error", default)]
    pub break_on_item_error: bool,
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            break_on_item_error: false,
        }
    }
}

impl SchedulerConfig {
    /// Number of workers actually started for a batch of `len` items.
    ///
    /// Zero is treated as "unset" and falls back to the default; the result
    /// never exceeds the batch length, so an empty batch gets zero workers.
    pub fn effective_workers(&self, len: usize) -> usize {
        let max = if self.max_workers == 0 {
            DEFAULT_MAX_WORKERS
        } else {
            self.max_workers
        };
        max.min(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_workers, 10);
        assert!(!config.break_on_item_error);
    }

    #[test]
    fn test_effective_workers_clamped_to_len() {
        let config = SchedulerConfig {
            max_workers: 8,
            ..Default::default()
        };
        assert_eq!(config.effective_workers(3), 3);
        assert_eq!(config.effective_workers(20), 8);
        assert_eq!(config.effective_workers(0), 0);
    }

    #[test]
    fn test_zero_max_workers_uses_default() {
        let config = SchedulerConfig {
            max_workers: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_workers(50), DEFAULT_MAX_WORKERS);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SchedulerConfig = serde_yaml::from_str("break-on-item-error: true").unwrap();
        assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
        assert!(config.break_on_item_error);
    }
}
