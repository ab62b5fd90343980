//! Wires configuration into a ready-to-use library

use crate::prompt::TerminalPrompt;
use anyhow::{Context, Result};
use lendshelf_config::{Config, ConfigManager};
use lendshelf_feed_parser::JsonFeedParser;
use lendshelf_network::{ClientConfig, ReqwestTransport};
use lendshelf_store::{AccountCredentialStore, LocalBookStore, LockOptions};
use lendshelf_sync_engine::{EngineSettings, Library, LibraryContext, TaskOrchestrator};
use std::sync::Arc;

/// Directory under the data root holding one directory per book
pub const BOOKS_DIR: &str = "books";

pub fn engine_settings(config: &Config) -> EngineSettings {
    let settings = EngineSettings::new(config.catalog.loans_uri.clone())
        .with_max_auth_attempts(config.tasks.max_auth_attempts);
    match &config.catalog.login_probe_uri {
        Some(probe) => settings.with_login_probe(probe.clone()),
        None => settings,
    }
}

pub fn lock_options(config: &Config) -> LockOptions {
    LockOptions::default()
        .with_timeout(config.store.lock_timeout())
        .with_poll_interval(config.store.lock_poll_interval())
}

/// Opens the stores under the configured data directory
///
/// Must be called from within the worker pool.
pub fn open_library(manager: &ConfigManager, config: &Config) -> Result<Library> {
    let data_dir = manager
        .data_dir(config)
        .context("Failed to resolve data directory")?;
    let lock_options = lock_options(config);
    log::debug!("Using data directory {}", data_dir.display());

    let books_root = data_dir.join(BOOKS_DIR);
    let books = LocalBookStore::open_root(&books_root)
        .with_context(|| format!("Failed to open book store at {}", books_root.display()))?
        .with_lock_options(lock_options);
    let credentials = AccountCredentialStore::open(&data_dir, lock_options)
        .with_context(|| format!("Failed to open credentials in {}", data_dir.display()))?;

    let transport = ReqwestTransport::with_config(ClientConfig {
        timeout: config.catalog.request_timeout(),
        user_agent: config.catalog.user_agent.clone(),
        max_redirects: config.catalog.max_redirects,
    })
    .context("Failed to create HTTP client")?;

    let ctx = LibraryContext::new(
        books,
        credentials,
        Arc::new(transport),
        Arc::new(JsonFeedParser::new()),
        Arc::new(TerminalPrompt),
        engine_settings(config),
    );
    Ok(Library::new(ctx, TaskOrchestrator::current()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_engine_settings_from_config() {
        let mut config = Config::default();
        config.tasks.max_auth_attempts = 3;
        let settings = engine_settings(&config);
        assert_eq!(settings.max_auth_attempts, 3);
        assert_eq!(settings.login_probe(), config.catalog.loans_uri);

        config.catalog.login_probe_uri = Some("https://circulation.example.org/patron".into());
        assert_eq!(
            engine_settings(&config).login_probe(),
            "https://circulation.example.org/patron"
        );
    }

    #[tokio::test]
    async fn test_open_library_creates_book_root() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_directory(temp.path().join("config")).unwrap();
        let mut config = Config::default();
        config.app.data_dir = Some(temp.path().join("data"));

        let library = open_library(&manager, &config).unwrap();
        assert!(temp.path().join("data").join(BOOKS_DIR).is_dir());
        assert!(!library.is_signed_in());
        assert!(library.statuses().is_empty());
    }
}
