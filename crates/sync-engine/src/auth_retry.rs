// crates/sync-engine/src/auth_retry.rs
//! Authenticated requests that re-prompt on rejected credentials

use crate::cancel::{run_until_cancelled, CancelToken};
use crate::error::{TaskError, TaskResult};
use async_trait::async_trait;
use lendshelf_core::AccountCredentials;
use lendshelf_network::{HttpAuth, NetworkResult};
use lendshelf_store::AccountCredentialStore;
use std::future::Future;
use std::sync::Arc;

/// Default cap on authentication attempts for one request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Asks the patron for credentials after the server rejected the current ones
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    /// Returns replacement credentials, or `None` to give up
    ///
    /// `rejected` holds the credentials the server just refused.
    async fn request_credentials(
        &self,
        rejected: Option<&AccountCredentials>,
    ) -> Option<AccountCredentials>;
}

/// A prompt that always gives up
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

#[async_trait]
impl CredentialPrompt for NoPrompt {
    async fn request_credentials(
        &self,
        _rejected: Option<&AccountCredentials>,
    ) -> Option<AccountCredentials> {
        None
    }
}

/// When credentials supplied by the prompt are written to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistencePolicy {
    /// As soon as the prompt returns them
    Immediate,
    /// Never by the loop; the caller persists the credentials that worked
    OnSuccess,
}

/// Where the loop currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Attempting(AccountCredentials),
    NeedCredentials(AccountCredentials),
}

/// A successful authenticated request
#[derive(Debug)]
pub struct AuthOutcome<T> {
    pub value: T,
    /// The credentials the server accepted
    pub credentials: AccountCredentials,
    /// Requests issued, including the successful one
    pub attempts: u32,
}

/// Drives one request through the authentication state machine
///
/// A 401 answer moves to [`AuthState::NeedCredentials`] and consults the
/// prompt. Any other failure ends the loop with the matching
/// [`TaskError`]. Cancellation is checked before every attempt and races
/// both the request and the prompt.
#[derive(Clone)]
pub struct AuthRetryLoop {
    credentials: Arc<AccountCredentialStore>,
    prompt: Arc<dyn CredentialPrompt>,
    policy: PersistencePolicy,
    max_attempts: u32,
}

impl AuthRetryLoop {
    pub fn new(credentials: Arc<AccountCredentialStore>, prompt: Arc<dyn CredentialPrompt>) -> Self {
        Self {
            credentials,
            prompt,
            policy: PersistencePolicy::Immediate,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_policy(mut self, policy: PersistencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Caps the number of requests; values below one are raised to one
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn policy(&self) -> PersistencePolicy {
        self.policy
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `request` until it succeeds or the loop gives up
    ///
    /// Starts from `initial` when given, otherwise from the stored
    /// credentials. With neither the loop fails with
    /// [`TaskError::NotSignedIn`] without issuing a request.
    pub async fn run<T, F, Fut>(
        &self,
        token: &CancelToken,
        initial: Option<AccountCredentials>,
        mut request: F,
    ) -> TaskResult<AuthOutcome<T>>
    where
        F: FnMut(HttpAuth) -> Fut,
        Fut: Future<Output = NetworkResult<T>>,
    {
        let mut state = match initial.or_else(|| self.credentials.get()) {
            Some(credentials) => AuthState::Attempting(credentials),
            None => return Err(TaskError::NotSignedIn),
        };
        let mut attempts = 0u32;

        loop {
            state = match state {
                AuthState::Attempting(credentials) => {
                    token.check()?;
                    attempts += 1;

                    let auth = HttpAuth::from_credentials(&credentials);
                    match run_until_cancelled(token, request(auth)).await? {
                        Ok(value) => {
                            return Ok(AuthOutcome {
                                value,
                                credentials,
                                attempts,
                            })
                        }
                        Err(e) if e.is_unauthorized() => {
                            log::info!(
                                "Credentials for {} rejected (attempt {})",
                                credentials.barcode,
                                attempts
                            );
                            AuthState::NeedCredentials(credentials)
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                AuthState::NeedCredentials(rejected) => {
                    if attempts >= self.max_attempts {
                        log::warn!("Giving up after {} authentication attempts", attempts);
                        return Err(TaskError::AuthenticationAbandoned { attempts });
                    }

                    let replacement = run_until_cancelled(
                        token,
                        self.prompt.request_credentials(Some(&rejected)),
                    )
                    .await?;

                    match replacement {
                        Some(credentials) => {
                            if self.policy == PersistencePolicy::Immediate {
                                self.credentials.set(&credentials)?;
                            }
                            AuthState::Attempting(credentials)
                        }
                        None => return Err(TaskError::AuthenticationAbandoned { attempts }),
                    }
                }
            };
        }
    }
}

impl std::fmt::Debug for AuthRetryLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRetryLoop")
            .field("policy", &self.policy)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}
