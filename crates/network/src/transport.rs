// crates/network/src/transport.rs
//! The HTTP seam used by the sync engine

use crate::error::{NetworkError, NetworkResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use lendshelf_core::AccountCredentials;

/// Streamed response body
pub type ByteStream = BoxStream<'static, NetworkResult<Bytes>>;

/// Request methods the engine issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Head => write!(f, "HEAD"),
        }
    }
}

/// Authentication attached to a request
#[derive(Clone, PartialEq, Eq)]
pub enum HttpAuth {
    Basic { username: String, password: String },
    Bearer(String),
}

impl HttpAuth {
    /// Bearer auth when the credentials carry a token, basic auth otherwise
    pub fn from_credentials(credentials: &AccountCredentials) -> Self {
        match &credentials.token {
            Some(token) => HttpAuth::Bearer(token.clone()),
            None => HttpAuth::Basic {
                username: credentials.barcode.clone(),
                password: credentials.pin.clone(),
            },
        }
    }
}

impl std::fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpAuth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            HttpAuth::Bearer(_) => f.debug_tuple("Bearer").field(&"***").finish(),
        }
    }
}

/// A successful response with a streamed body
pub struct HttpResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    body: ByteStream,
}

impl HttpResponse {
    pub fn new(status: u16, content_length: Option<u64>, body: ByteStream) -> Self {
        Self {
            status,
            content_length,
            body,
        }
    }

    /// Creates a response whose whole body is already in memory
    pub fn from_bytes(status: u16, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let length = body.len() as u64;
        Self::new(status, Some(length), stream::once(async move { Ok(body) }).boxed())
    }

    /// Creates a response with no body
    pub fn empty(status: u16) -> Self {
        Self::new(status, Some(0), stream::empty().boxed())
    }

    /// Returns the body stream
    pub fn into_body(self) -> ByteStream {
        self.body
    }

    /// Collects the whole body
    pub async fn bytes(self) -> NetworkResult<Bytes> {
        let capacity = self.content_length.unwrap_or(0).min(16 * 1024 * 1024) as usize;
        let mut buffer = Vec::with_capacity(capacity);
        let mut body = self.body;
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buffer))
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Issues HTTP requests on behalf of the engine
///
/// Implementations return `NetworkError::Status` for every non-2xx answer
/// and `NetworkError::Transport` when no answer arrived at all.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        auth: Option<&HttpAuth>,
    ) -> NetworkResult<HttpResponse>;

    /// Performs a GET request
    async fn get(&self, url: &str, auth: Option<&HttpAuth>) -> NetworkResult<HttpResponse> {
        self.request(HttpMethod::Get, url, auth).await
    }

    /// Performs a HEAD request
    async fn head(&self, url: &str, auth: Option<&HttpAuth>) -> NetworkResult<HttpResponse> {
        self.request(HttpMethod::Head, url, auth).await
    }
}

/// Maps a status code to the transport contract
pub fn check_status(status: u16, message: impl Into<String>) -> NetworkResult<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(NetworkError::Status {
            status,
            message: message.into(),
        })
    }
}
