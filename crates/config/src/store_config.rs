//! Local store configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record lock tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Give up on a busy record lock after this many milliseconds
    pub lock_timeout_ms: u64,

    /// Delay between lock attempts in milliseconds
    pub lock_poll_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 1000,
            lock_poll_interval_ms: 10,
        }
    }
}

impl StoreConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn lock_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock_poll_interval_ms)
    }
}

impl ConfigSection for StoreConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::in_range(self.lock_timeout_ms, 1, 60_000, "store.lock_timeout_ms"),
            Validator::in_range(
                self.lock_poll_interval_ms,
                1,
                1000,
                "store.lock_poll_interval_ms",
            ),
        ];

        if self.lock_poll_interval_ms > self.lock_timeout_ms {
            results.push(Err(ValidationError::with_value(
                "store.lock_poll_interval_ms",
                "must not exceed store.lock_timeout_ms",
                self.lock_poll_interval_ms,
            )));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.lock_timeout_ms = other.lock_timeout_ms;
        self.lock_poll_interval_ms = other.lock_poll_interval_ms;
    }

    fn section_name(&self) -> &'static str {
        "store"
    }
}
