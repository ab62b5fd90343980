// crates/sync-engine/src/context.rs
//! Collaborators shared by every task

use crate::auth_retry::{AuthRetryLoop, CredentialPrompt, PersistencePolicy, DEFAULT_MAX_ATTEMPTS};
use crate::rights::RightsProvider;
use crate::status_cache::StatusCache;
use lendshelf_feed_parser::FeedParser;
use lendshelf_network::HttpTransport;
use lendshelf_store::{AccountCredentialStore, LocalBookStore};
use std::sync::Arc;

/// Remote endpoints and limits the tasks work with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Loans feed of the signed-in patron
    pub loans_uri: String,
    /// URI probed at login; the loans feed when unset
    pub login_probe_uri: Option<String>,
    pub max_auth_attempts: u32,
}

impl EngineSettings {
    pub fn new(loans_uri: impl Into<String>) -> Self {
        Self {
            loans_uri: loans_uri.into(),
            login_probe_uri: None,
            max_auth_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_login_probe(mut self, uri: impl Into<String>) -> Self {
        self.login_probe_uri = Some(uri.into());
        self
    }

    pub fn with_max_auth_attempts(mut self, attempts: u32) -> Self {
        self.max_auth_attempts = attempts;
        self
    }

    pub fn login_probe(&self) -> &str {
        self.login_probe_uri.as_deref().unwrap_or(&self.loans_uri)
    }
}

/// Everything a task body needs, cheap to clone into a spawned future
#[derive(Clone)]
pub struct LibraryContext {
    pub books: Arc<LocalBookStore>,
    pub credentials: Arc<AccountCredentialStore>,
    pub cache: Arc<StatusCache>,
    pub transport: Arc<dyn HttpTransport>,
    pub parser: Arc<dyn FeedParser>,
    pub prompt: Arc<dyn CredentialPrompt>,
    pub rights: Option<Arc<dyn RightsProvider>>,
    pub settings: EngineSettings,
}

impl LibraryContext {
    pub fn new(
        books: LocalBookStore,
        credentials: AccountCredentialStore,
        transport: Arc<dyn HttpTransport>,
        parser: Arc<dyn FeedParser>,
        prompt: Arc<dyn CredentialPrompt>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            books: Arc::new(books),
            credentials: Arc::new(credentials),
            cache: Arc::new(StatusCache::new()),
            transport,
            parser,
            prompt,
            rights: None,
            settings,
        }
    }

    pub fn with_rights(mut self, rights: Arc<dyn RightsProvider>) -> Self {
        self.rights = Some(rights);
        self
    }

    /// An authentication loop over the stored credentials
    pub fn auth_loop(&self, policy: PersistencePolicy) -> AuthRetryLoop {
        AuthRetryLoop::new(Arc::clone(&self.credentials), Arc::clone(&self.prompt))
            .with_policy(policy)
            .with_max_attempts(self.settings.max_auth_attempts)
    }
}

impl std::fmt::Debug for LibraryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryContext")
            .field("root", &self.books.root())
            .field("signed_in", &self.credentials.is_signed_in())
            .field("cached", &self.cache.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
