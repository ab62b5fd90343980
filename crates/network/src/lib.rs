// crates/network/src/lib.rs
//! Network utilities for catalog requests and downloads

mod client;
mod download;
mod error;
mod transport;

pub use client::{ClientConfig, ReqwestTransport};
pub use download::{download_to_file, ProgressCallback};
pub use error::{NetworkError, NetworkResult};
pub use transport::{check_status, ByteStream, HttpAuth, HttpMethod, HttpResponse, HttpTransport};
