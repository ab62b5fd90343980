// crates/network/tests/network_tests.rs
//! Integration tests for network module

use async_trait::async_trait;
use bytes::Bytes;
use lendshelf_network::{
    check_status, download_to_file, HttpAuth, HttpMethod, HttpResponse, HttpTransport,
    NetworkError, NetworkResult, ReqwestTransport,
};
use std::collections::HashMap;
use std::sync::Mutex;
use tempfile::TempDir;

/// Serves canned bodies by URL and records the auth it saw
struct CannedTransport {
    routes: HashMap<String, (u16, &'static [u8])>,
    seen: Mutex<Vec<(HttpMethod, Option<HttpAuth>)>>,
}

#[async_trait]
impl HttpTransport for CannedTransport {
    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        auth: Option<&HttpAuth>,
    ) -> NetworkResult<HttpResponse> {
        self.seen.lock().unwrap().push((method, auth.cloned()));
        let (status, body) = self
            .routes
            .get(url)
            .copied()
            .ok_or_else(|| NetworkError::Transport(format!("no route to {}", url)))?;
        check_status(status, "canned")?;
        Ok(HttpResponse::from_bytes(status, Bytes::from_static(body)))
    }
}

fn canned() -> CannedTransport {
    let mut routes = HashMap::new();
    routes.insert("https://lib.example/book".to_string(), (200, &b"EPUB"[..]));
    routes.insert("https://lib.example/denied".to_string(), (401, &b""[..]));
    CannedTransport {
        routes,
        seen: Mutex::new(Vec::new()),
    }
}

#[tokio::test]
async fn test_default_methods_delegate_to_request() {
    let transport = canned();
    let auth = HttpAuth::Bearer("token".to_string());

    transport.head("https://lib.example/book", Some(&auth)).await.unwrap();
    transport.get("https://lib.example/book", None).await.unwrap();

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen[0], (HttpMethod::Head, Some(auth)));
    assert_eq!(seen[1], (HttpMethod::Get, None));
}

#[tokio::test]
async fn test_unauthorized_surfaces_as_status() {
    let transport = canned();
    let err = transport.get("https://lib.example/denied", None).await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_download_through_transport() {
    let temp = TempDir::new().unwrap();
    let destination = temp.path().join("content");
    let transport = canned();

    let response = transport.get("https://lib.example/book", None).await.unwrap();
    let written = download_to_file(response, &destination, None).await.unwrap();

    assert_eq!(written, 4);
    assert_eq!(std::fs::read(&destination).unwrap(), b"EPUB");
}

#[tokio::test]
async fn test_refused_connection_is_transport_error() {
    let transport = ReqwestTransport::new().expect("Failed to create transport");

    // Nothing listens on the discard port locally.
    let result = transport.get("http://127.0.0.1:9/loans", None).await;
    assert!(matches!(result, Err(NetworkError::Transport(_))));
}
