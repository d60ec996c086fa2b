//! File download operations with atomic writes and streaming
//!
//! Bodies are streamed chunk by chunk into a temporary sibling file which is
//! renamed over the destination only once the whole body has arrived. An
//! existing local file is therefore always overwritten on success and left
//! untouched on failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use indicatif::ProgressBar;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info};

use super::Transport;
use crate::app::models::{AssetRef, BatchReport};
use crate::app::progress::ProgressReporter;
use crate::constants::files;
use crate::errors::{DownloadError, DownloadResult};

/// Streaming downloader over any [`Transport`]
#[derive(Debug)]
pub struct Downloader<T> {
    transport: Arc<T>,
    progress: ProgressReporter,
}

impl<T> Clone for Downloader<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            progress: self.progress.clone(),
        }
    }
}

impl<T: Transport> Downloader<T> {
    /// Creates a downloader sharing `transport`
    pub fn new(transport: Arc<T>, progress: ProgressReporter) -> Self {
        Self {
            transport,
            progress,
        }
    }

    /// The transport requests go through
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The progress reporter bars are drawn on
    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Downloads one asset, overwriting any existing local file on success
    ///
    /// Returns the number of bytes written. Never panics past the item: any
    /// non-200 status, transport error, timeout or I/O failure comes back as
    /// a `DownloadError`.
    pub async fn fetch(&self, asset: &AssetRef, timeout: Duration) -> DownloadResult<u64> {
        if let Some(parent) = asset.local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = temp_path_for(&asset.local);
        let attempt =
            tokio::time::timeout(timeout, self.fetch_to(asset, &temp_path, timeout)).await;

        let outcome = match attempt {
            Ok(result) => result,
            Err(_) => Err(DownloadError::Timeout {
                seconds: timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(bytes) => {
                tokio::fs::rename(&temp_path, &asset.local)
                    .await
                    .map_err(|_e| DownloadError::AtomicOperationFailed {
                        temp_path: temp_path.clone(),
                        final_path: asset.local.clone(),
                    })?;
                tracing::debug!("Downloaded {} ({} bytes)", asset.local.display(), bytes);
                Ok(bytes)
            }
            Err(e) => {
                if tokio::fs::try_exists(&temp_path).await.unwrap_or(false) {
                    let _ = tokio::fs::remove_file(&temp_path).await;
                }
                Err(e)
            }
        }
    }

    /// Streams the body of `asset` into `temp_path`
    async fn fetch_to(
        &self,
        asset: &AssetRef,
        temp_path: &Path,
        timeout: Duration,
    ) -> DownloadResult<u64> {
        let response = self.transport.get(&asset.remote, timeout).await?;

        if response.status != 200 {
            return Err(DownloadError::ServerError {
                status: response.status,
            });
        }

        let bar = self
            .progress
            .file_bar(&asset.name(), response.content_length.unwrap_or(0));
        let result = write_body(response.body, temp_path, &bar).await;
        bar.finish_and_clear();
        result
    }

    /// Downloads `assets` one at a time, continuing past failures
    ///
    /// Each failure is logged with the file name and cause as soon as it
    /// happens. Every asset is attempted exactly once.
    pub async fn fetch_all(
        &self,
        label: &str,
        assets: &[AssetRef],
        timeout: Duration,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let batch = self.progress.batch_bar(label, assets.len() as u64);

        for asset in assets {
            let outcome = self.fetch(asset, timeout).await;
            if let Err(e) = &outcome {
                error!("Failed to download {}: {}", asset.name(), e);
            }
            report.record(asset.clone(), outcome);
            batch.inc(1);
        }

        batch.finish_and_clear();
        info!(
            "{}: {} written, {} failed",
            label,
            report.written.len(),
            report.failed.len()
        );
        report
    }
}

async fn write_body(
    mut body: super::BodyStream,
    temp_path: &Path,
    bar: &ProgressBar,
) -> DownloadResult<u64> {
    let file = File::create(temp_path).await?;
    let mut writer = BufWriter::with_capacity(files::DOWNLOAD_CHUNK_SIZE, file);
    let mut written = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
        bar.inc(chunk.len() as u64);
    }

    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    Ok(written)
}

/// Temporary sibling path used while a download is in flight
pub fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(files::TEMP_FILE_SUFFIX);
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::memory::MemoryTransport;
    use tempfile::tempdir;
    use tokio::fs;
    use url::Url;

    const BASE: &str = "https://origin.test/";

    fn asset(root: &Path, path: &str) -> AssetRef {
        AssetRef::same_path(&Url::parse(BASE).unwrap(), path, root).unwrap()
    }

    fn downloader(transport: MemoryTransport) -> Downloader<MemoryTransport> {
        Downloader::new(Arc::new(transport), ProgressReporter::hidden())
    }

    #[tokio::test]
    async fn test_fetch_creates_directories_and_writes_body() {
        let temp_dir = tempdir().unwrap();
        let transport =
            MemoryTransport::new().serve("https://origin.test/code/ext/hb.wasm", "wasm-bytes");
        let downloader = downloader(transport);
        let target = asset(temp_dir.path(), "code/ext/hb.wasm");

        let bytes = downloader
            .fetch(&target, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(bytes, 10);
        assert_eq!(fs::read_to_string(&target.local).await.unwrap(), "wasm-bytes");
        assert!(!temp_path_for(&target.local).exists());
    }

    #[tokio::test]
    async fn test_fetch_overwrites_existing_file() {
        let temp_dir = tempdir().unwrap();
        let target = asset(temp_dir.path(), "manifest.json");
        fs::write(&target.local, "stale").await.unwrap();

        let transport =
            MemoryTransport::new().serve("https://origin.test/manifest.json", "{\"fresh\":1}");
        downloader(transport)
            .fetch(&target, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(&target.local).await.unwrap(),
            "{\"fresh\":1}"
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_existing_file_untouched() {
        let temp_dir = tempdir().unwrap();
        let target = asset(temp_dir.path(), "img/nft.png");
        fs::create_dir_all(target.local.parent().unwrap())
            .await
            .unwrap();
        fs::write(&target.local, "previous run").await.unwrap();

        let transport = MemoryTransport::new().status("https://origin.test/img/nft.png", 503);
        let result = downloader(transport)
            .fetch(&target, Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(DownloadError::ServerError { status: 503 })));
        assert_eq!(
            fs::read_to_string(&target.local).await.unwrap(),
            "previous run"
        );
        assert!(!temp_path_for(&target.local).exists());
    }

    #[tokio::test]
    async fn test_missing_content_length_still_downloads() {
        let temp_dir = tempdir().unwrap();
        let transport = MemoryTransport::new()
            .serve_without_length("https://origin.test/plugins/gallery.json", "[1,2,3]");
        let target = asset(temp_dir.path(), "plugins/gallery.json");

        let bytes = downloader(transport)
            .fetch(&target, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(bytes, 7);
    }

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let temp_dir = tempdir().unwrap();
        let transport = MemoryTransport::new()
            .serve("https://origin.test/a.js", "a")
            .status("https://origin.test/b.js", 404)
            .broken("https://origin.test/c.js")
            .serve("https://origin.test/d.js", "d");
        let downloader = downloader(transport);
        let assets: Vec<AssetRef> = ["a.js", "b.js", "c.js", "d.js"]
            .iter()
            .map(|p| asset(temp_dir.path(), p))
            .collect();

        let report = downloader
            .fetch_all("Core Files", &assets, Duration::from_secs(5))
            .await;

        assert_eq!(report.attempted(), 4);
        let written: Vec<&str> = report.written.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(written, vec!["a.js", "d.js"]);
        let failed: Vec<String> = report.failures().into_iter().map(|(n, _)| n).collect();
        assert_eq!(failed, vec!["b.js".to_string(), "c.js".to_string()]);
        assert!(temp_dir.path().join("a.js").exists());
        assert!(!temp_dir.path().join("b.js").exists());
        assert!(temp_dir.path().join("d.js").exists());
        assert_eq!(downloader.transport.requests().len(), 4);
    }

    #[test]
    fn test_temp_file_path_generation() {
        let temp_path = temp_path_for(Path::new("/tmp/test.css"));
        assert!(temp_path.to_string_lossy().ends_with(".css.tmp"));

        let temp_path = temp_path_for(Path::new("/tmp/testfile"));
        assert_eq!(temp_path, Path::new("/tmp/testfile.tmp"));

        let temp_path = temp_path_for(Path::new("/m/rsrc/fonts/fs/Foo"));
        assert_eq!(temp_path, Path::new("/m/rsrc/fonts/fs/Foo.tmp"));
    }
}
