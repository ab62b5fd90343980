//! Lendshelf Configuration System
//!
//! Configuration lives in one TOML file split into sections. Each section
//! implements [`ConfigSection`]; a missing file yields defaults, and saves
//! are atomic with a backup of the previous file.
//!
//! # Example
//!
//! ```rust
//! use lendshelf_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Loans feed: {}", config.catalog.loans_uri);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

// Config sections
pub mod app_config;
mod catalog_config;
mod store_config;
mod task_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::ConfigManager;
pub use persistence::ConfigPersistence;
pub use validation::{ConfigSection, Validator};

pub use app_config::{AppConfig, LogLevel};
pub use catalog_config::CatalogConfig;
pub use store_config::StoreConfig;
pub use task_config::TaskConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Application-level settings
    pub app: AppConfig,

    /// Remote catalog
    pub catalog: CatalogConfig,

    /// Local record store
    pub store: StoreConfig,

    /// Background tasks
    pub tasks: TaskConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }
        if let Err(mut e) = self.catalog.validate() {
            errors.append(&mut e);
        }
        if let Err(mut e) = self.store.validate() {
            errors.append(&mut e);
        }
        if let Err(mut e) = self.tasks.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.catalog.merge(other.catalog);
        self.store.merge(other.store);
        self.tasks.merge(other.tasks);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            catalog: CatalogConfig::default(),
            store: StoreConfig::default(),
            tasks: TaskConfig::default(),
        }
    }
}
