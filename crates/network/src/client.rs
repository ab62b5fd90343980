// crates/network/src/client.rs
//! reqwest-backed HTTP transport

use crate::error::{NetworkError, NetworkResult};
use crate::transport::{check_status, HttpAuth, HttpMethod, HttpResponse, HttpTransport};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client as ReqwestClient, Url};
use std::time::Duration;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Maximum redirects to follow
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("Lendshelf/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
        }
    }
}

/// Production [`HttpTransport`] over a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: ReqwestClient,
    config: ClientConfig,
}

impl ReqwestTransport {
    /// Creates a new transport with default configuration
    pub fn new() -> NetworkResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a new transport with custom configuration
    pub fn with_config(config: ClientConfig) -> NetworkResult<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| NetworkError::Transport(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            inner: client,
            config,
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        auth: Option<&HttpAuth>,
    ) -> NetworkResult<HttpResponse> {
        let url = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", url, e)))?;

        let mut request = match method {
            HttpMethod::Get => self.inner.get(url.clone()),
            HttpMethod::Head => self.inner.head(url.clone()),
        };
        request = match auth {
            Some(HttpAuth::Basic { username, password }) => {
                request.basic_auth(username, Some(password))
            }
            Some(HttpAuth::Bearer(token)) => request.bearer_auth(token),
            None => request,
        };

        log::debug!("{} {}", method, url);
        let response = request.send().await?;
        let status = response.status();
        check_status(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
        )?;

        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(NetworkError::from))
            .boxed();
        Ok(HttpResponse::new(status.as_u16(), content_length, body))
    }
}
