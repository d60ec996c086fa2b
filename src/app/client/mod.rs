//! HTTP transport and file download operations
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: reqwest-backed [`Transport`] with rate limiting
//! - `download`: streaming, overwrite-on-success file downloads
//!
//! Everything above this module talks to the network through the
//! [`Transport`] trait, so the downloader, the font pool and the template
//! reconciler can be exercised against an in-memory origin in tests.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use url::Url;

use crate::errors::DownloadResult;

pub mod config;
pub mod download;
pub mod http;

#[cfg(test)]
pub(crate) mod memory;

pub use config::ClientConfig;
pub use download::Downloader;
pub use http::HttpHandler;

/// Streaming response body
pub type BodyStream = BoxStream<'static, DownloadResult<Bytes>>;

/// Status, advertised length and body of a GET request
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Value of the Content-Length header, if the server sent one
    pub content_length: Option<u64>,
    /// Body chunks in arrival order
    pub body: BodyStream,
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Streaming GET capability consumed by the downloader
pub trait Transport: Send + Sync + 'static {
    /// Starts a GET request for `url`
    ///
    /// `timeout` bounds the whole exchange, body included. Transport-level
    /// failures are returned as errors; non-200 statuses are not errors here.
    fn get(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> impl Future<Output = DownloadResult<TransportResponse>> + Send;
}
