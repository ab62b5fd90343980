//! Remote catalog configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the patron's library lives and how to talk to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Loans feed of the signed-in patron
    pub loans_uri: String,

    /// URI probed with HEAD to check credentials; the loans feed when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_probe_uri: Option<String>,

    /// User agent sent with every request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum redirects to follow
    pub max_redirects: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            loans_uri: "https://circulation.example.org/loans".to_string(),
            login_probe_uri: None,
            user_agent: "Lendshelf".to_string(),
            request_timeout_secs: 30,
            max_redirects: 10,
        }
    }
}

impl CatalogConfig {
    /// URI used to verify credentials at login
    pub fn login_probe(&self) -> &str {
        self.login_probe_uri.as_deref().unwrap_or(&self.loans_uri)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ConfigSection for CatalogConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::http_url(&self.loans_uri, "catalog.loans_uri"),
            Validator::not_empty(&self.user_agent, "catalog.user_agent"),
            Validator::in_range(
                self.request_timeout_secs,
                1,
                600,
                "catalog.request_timeout_secs",
            ),
            Validator::in_range(self.max_redirects, 0, 50, "catalog.max_redirects"),
        ];

        if let Some(probe) = &self.login_probe_uri {
            results.push(Validator::http_url(probe, "catalog.login_probe_uri"));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.loans_uri = other.loans_uri;
        if other.login_probe_uri.is_some() {
            self.login_probe_uri = other.login_probe_uri;
        }
        self.user_agent = other.user_agent;
        self.request_timeout_secs = other.request_timeout_secs;
        self.max_redirects = other.max_redirects;
    }

    fn section_name(&self) -> &'static str {
        "catalog"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(CatalogConfig::default().validate().is_ok());
    }

    #[test]
    fn test_login_probe_falls_back_to_loans() {
        let mut config = CatalogConfig::default();
        assert_eq!(config.login_probe(), config.loans_uri);

        config.login_probe_uri = Some("https://circulation.example.org/patron".to_string());
        assert_eq!(config.login_probe(), "https://circulation.example.org/patron");
    }

    #[test]
    fn test_invalid_values() {
        let config = CatalogConfig {
            loans_uri: "circulation.example.org/loans".to_string(),
            request_timeout_secs: 0,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
