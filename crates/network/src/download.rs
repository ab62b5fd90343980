// crates/network/src/download.rs
//! Streaming response bodies to disk

use crate::error::NetworkResult;
use crate::transport::HttpResponse;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Progress callback type, called with bytes so far and the expected total
pub type ProgressCallback = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Writes a response body to `destination`, returning the bytes written
///
/// The file is created (or truncated), flushed and synced before this
/// returns. On error the partially written file is left for the caller to
/// remove.
pub async fn download_to_file(
    response: HttpResponse,
    destination: &Path,
    progress: Option<&ProgressCallback>,
) -> NetworkResult<u64> {
    let total_size = response.content_length;
    let mut file = File::create(destination).await?;
    let mut stream = response.into_body();
    let mut downloaded = 0u64;

    if let Some(callback) = progress {
        callback(0, total_size);
    }

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(callback) = progress {
            callback(downloaded, total_size);
        }
    }

    file.flush().await?;
    file.sync_all().await?;
    log::debug!("Wrote {} bytes to {}", downloaded, destination.display());
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;
    use bytes::Bytes;
    use futures::stream;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_download_reports_progress() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("book.epub");
        let chunks = vec![
            Ok(Bytes::from_static(b"abcd")),
            Ok(Bytes::from_static(b"efgh")),
        ];
        let response = HttpResponse::new(200, Some(8), stream::iter(chunks).boxed());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_callback = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |done, total| {
            seen_in_callback.lock().unwrap().push((done, total));
        });

        let written = download_to_file(response, &destination, Some(&callback))
            .await
            .unwrap();

        assert_eq!(written, 8);
        assert_eq!(std::fs::read(&destination).unwrap(), b"abcdefgh");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(0, Some(8)), (4, Some(8)), (8, Some(8))]
        );
    }

    #[tokio::test]
    async fn test_download_stream_error() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("book.epub");
        let chunks = vec![
            Ok(Bytes::from_static(b"abcd")),
            Err(NetworkError::Transport("reset".to_string())),
        ];
        let response = HttpResponse::new(200, None, stream::iter(chunks).boxed());

        let result = download_to_file(response, &destination, None).await;
        assert!(matches!(result, Err(NetworkError::Transport(_))));
    }
}
