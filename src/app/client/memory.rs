//! In-memory origin for tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use url::Url;

use super::{Transport, TransportResponse};
use crate::errors::{DownloadError, DownloadResult};

#[derive(Debug, Clone)]
enum Route {
    Body { bytes: Vec<u8>, advertise_length: bool },
    Status(u16),
    Broken,
}

/// Serves canned responses keyed by absolute URL; unknown URLs get a 404
#[derive(Debug, Default)]
pub(crate) struct MemoryTransport {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn serve(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.insert(
            url,
            Route::Body {
                bytes: body.into(),
                advertise_length: true,
            },
        );
        self
    }

    pub(crate) fn serve_without_length(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.insert(
            url,
            Route::Body {
                bytes: body.into(),
                advertise_length: false,
            },
        );
        self
    }

    pub(crate) fn status(self, url: &str, status: u16) -> Self {
        self.insert(url, Route::Status(status));
        self
    }

    pub(crate) fn broken(self, url: &str) -> Self {
        self.insert(url, Route::Broken);
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn insert(&self, url: &str, route: Route) {
        self.routes.lock().unwrap().insert(url.to_string(), route);
    }
}

impl Transport for MemoryTransport {
    async fn get(&self, url: &Url, _timeout: Duration) -> DownloadResult<TransportResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        let route = self.routes.lock().unwrap().get(url.as_str()).cloned();

        match route {
            Some(Route::Body {
                bytes,
                advertise_length,
            }) => {
                let content_length = advertise_length.then_some(bytes.len() as u64);
                // Small chunks so streaming code sees more than one
                let chunks: Vec<DownloadResult<Bytes>> = bytes
                    .chunks(3)
                    .map(|c| Ok(Bytes::copy_from_slice(c)))
                    .collect();
                Ok(TransportResponse {
                    status: 200,
                    content_length,
                    body: futures::stream::iter(chunks).boxed(),
                })
            }
            Some(Route::Status(status)) => Ok(TransportResponse {
                status,
                content_length: None,
                body: futures::stream::empty().boxed(),
            }),
            Some(Route::Broken) => Err(DownloadError::Other("connection reset".to_string())),
            None => Ok(TransportResponse {
                status: 404,
                content_length: None,
                body: futures::stream::empty().boxed(),
            }),
        }
    }
}
