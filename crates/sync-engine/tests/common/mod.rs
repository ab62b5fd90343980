// crates/sync-engine/tests/common/mod.rs
//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use lendshelf_core::{AccountCredentials, FeedEntry};
use lendshelf_feed_parser::{FeedParser, JsonFeedParser};
use lendshelf_network::{
    check_status, HttpAuth, HttpMethod, HttpResponse, HttpTransport, NetworkError, NetworkResult,
};
use lendshelf_store::{AccountCredentialStore, LocalBookStore, LockOptions};
use lendshelf_sync_engine::{
    CredentialPrompt, EngineSettings, Library, LibraryContext, NoPrompt, TaskOrchestrator,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Notify;

pub const LOANS: &str = "https://lib.example/loans";
pub const BARCODE: &str = "23333000000001";
pub const PIN: &str = "1234";

/// How the mock answers one URL
#[derive(Debug, Clone)]
pub enum Route {
    /// 200 with the body, whatever the auth
    Body(Vec<u8>),
    /// 200 with the body for the expected PIN, 401 otherwise
    Authenticated { pin: String, body: Vec<u8> },
    /// Always this status
    Status(u16),
    /// Never answers
    Hang,
}

/// In-memory catalog keyed by URL
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<(HttpMethod, String)>>,
    pub hung: Notify,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, route: Route) {
        self.routes.lock().unwrap().insert(url.to_string(), route);
    }

    /// Serves `entries` as the loans feed for the default PIN
    pub fn serve_loans(&self, entries: &[FeedEntry]) {
        let body = JsonFeedParser::new().serialize_feed(entries).unwrap();
        self.route(
            LOANS,
            Route::Authenticated {
                pin: PIN.to_string(),
                body,
            },
        );
    }

    /// Serves `entry` as a standalone document for the default PIN
    pub fn serve_entry(&self, url: &str, entry: &FeedEntry) {
        let body = JsonFeedParser::new().serialize_entry(entry).unwrap();
        self.route(
            url,
            Route::Authenticated {
                pin: PIN.to_string(),
                body,
            },
        );
    }

    pub fn requests_to(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, seen)| seen == url)
            .count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        auth: Option<&HttpAuth>,
    ) -> NetworkResult<HttpResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((method, url.to_string()));
        let route = self.routes.lock().unwrap().get(url).cloned();

        match route {
            None => Err(NetworkError::Transport(format!("no route to {}", url))),
            Some(Route::Body(body)) => Ok(HttpResponse::from_bytes(200, Bytes::from(body))),
            Some(Route::Authenticated { pin, body }) => match auth {
                Some(HttpAuth::Basic { password, .. }) if *password == pin => {
                    Ok(HttpResponse::from_bytes(200, Bytes::from(body)))
                }
                _ => Err(NetworkError::Status {
                    status: 401,
                    message: "Unauthorized".to_string(),
                }),
            },
            Some(Route::Status(status)) => {
                check_status(status, "mock status")?;
                Ok(HttpResponse::empty(status))
            }
            Some(Route::Hang) => {
                self.hung.notify_one();
                std::future::pending::<NetworkResult<HttpResponse>>().await
            }
        }
    }
}

/// Answers with the queued credentials in order, then declines
pub struct ScriptedPrompt {
    answers: Mutex<Vec<Option<AccountCredentials>>>,
    pub calls: AtomicU32,
}

impl ScriptedPrompt {
    pub fn new(mut answers: Vec<Option<AccountCredentials>>) -> Self {
        answers.reverse();
        Self {
            answers: Mutex::new(answers),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialPrompt for ScriptedPrompt {
    async fn request_credentials(
        &self,
        _rejected: Option<&AccountCredentials>,
    ) -> Option<AccountCredentials> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers.lock().unwrap().pop().flatten()
    }
}

pub struct Fixture {
    pub temp: TempDir,
    pub transport: Arc<MockTransport>,
    pub library: Library,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_prompt(Arc::new(NoPrompt))
    }

    pub fn with_prompt(prompt: Arc<dyn CredentialPrompt>) -> Self {
        let temp = TempDir::new().unwrap();
        let books = LocalBookStore::open_root(temp.path().join("books")).unwrap();
        let credentials = AccountCredentialStore::open(temp.path(), LockOptions::default()).unwrap();
        let transport = Arc::new(MockTransport::new());

        let ctx = LibraryContext::new(
            books,
            credentials,
            transport.clone(),
            Arc::new(JsonFeedParser::new()),
            prompt,
            EngineSettings::new(LOANS),
        );

        Self {
            temp,
            transport,
            library: Library::new(ctx, TaskOrchestrator::current()),
        }
    }

    /// Stores the default patron's credentials
    pub fn sign_in(&self) {
        self.library
            .context()
            .credentials
            .set(&AccountCredentials::new(BARCODE, PIN))
            .unwrap();
    }

    pub fn books(&self) -> &LocalBookStore {
        &self.library.context().books
    }

    pub fn books_root(&self) -> PathBuf {
        self.temp.path().join("books")
    }
}
