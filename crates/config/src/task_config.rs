//! Background task configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Worker pool and authentication retry settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TaskConfig {
    /// Threads in the shared worker pool
    pub worker_threads: usize,

    /// Attempts allowed before an authenticated request is abandoned
    pub max_auth_attempts: u32,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            max_auth_attempts: 16,
        }
    }
}

impl ConfigSection for TaskConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(self.worker_threads, 1, 64, "tasks.worker_threads"),
            Validator::in_range(self.max_auth_attempts, 1, 100, "tasks.max_auth_attempts"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.worker_threads = other.worker_threads;
        self.max_auth_attempts = other.max_auth_attempts;
    }

    fn section_name(&self) -> &'static str {
        "tasks"
    }
}
