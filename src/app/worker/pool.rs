//! Bounded concurrent download pool
//!
//! A fixed number of tokio tasks pull assets from one shared queue until it
//! is empty. Each task reports every outcome over an mpsc channel, so the
//! pool returns exactly one result per asset. Completion order is not
//! preserved.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::WorkerConfig;
use crate::app::client::{Downloader, Transport};
use crate::app::models::{AssetRef, BatchReport};
use crate::constants::workers;
use crate::errors::{DownloadError, DownloadResult};

type Outcome = (AssetRef, DownloadResult<u64>);

/// Pool of download workers sharing one queue
#[derive(Debug)]
pub struct WorkerPool<T> {
    config: WorkerConfig,
    downloader: Downloader<T>,
}

impl<T: Transport> WorkerPool<T> {
    /// Creates a pool after validating `config`
    pub fn new(config: WorkerConfig, downloader: Downloader<T>) -> DownloadResult<Self> {
        config.validate()?;
        Ok(Self { config, downloader })
    }

    /// The pool configuration
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Downloads every asset, at most `worker_count` at a time
    ///
    /// Returns once the queue is drained and every worker has exited. A
    /// failure (or panic) while fetching one asset is recorded for that asset
    /// only.
    pub async fn run(&self, label: &str, assets: Vec<AssetRef>) -> BatchReport {
        let total = assets.len();
        if total == 0 {
            return BatchReport::default();
        }

        let worker_count = self.config.worker_count.min(total);
        info!("Starting {} workers for {} downloads", worker_count, total);

        let queue = Arc::new(Mutex::new(VecDeque::from(assets)));
        let completed = Arc::new(AtomicUsize::new(0));
        let bar = self.downloader.progress().batch_bar(label, total as u64);
        let (result_tx, mut result_rx) =
            mpsc::channel::<Outcome>(worker_count * workers::CHANNEL_BUFFER_PER_WORKER);

        let handles: Vec<JoinHandle<()>> = (0..worker_count)
            .map(|worker_id| {
                let queue = Arc::clone(&queue);
                let completed = Arc::clone(&completed);
                let result_tx = result_tx.clone();
                let downloader = self.downloader.clone();
                let bar = bar.clone();
                let timeout = self.config.download_timeout;

                tokio::spawn(async move {
                    loop {
                        let next = queue.lock().await.pop_front();
                        let Some(asset) = next else {
                            break;
                        };

                        let outcome = AssertUnwindSafe(downloader.fetch(&asset, timeout))
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|_| {
                                Err(DownloadError::TaskFailed {
                                    name: asset.name(),
                                    reason: "download task panicked".to_string(),
                                })
                            });

                        completed.fetch_add(1, Ordering::Relaxed);
                        bar.inc(1);

                        if result_tx.send((asset, outcome)).await.is_err() {
                            break;
                        }
                    }
                    debug!("Worker {} finished", worker_id);
                })
            })
            .collect();

        // Only the workers hold senders now, so the channel closes when they exit
        drop(result_tx);

        let mut report = BatchReport::default();
        while let Some((asset, outcome)) = result_rx.recv().await {
            if let Err(e) = &outcome {
                error!("Failed to download '{}': {}", asset.name(), e);
            }
            report.record(asset, outcome);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Worker task ended abnormally: {}", e);
            }
        }
        bar.finish_and_clear();

        info!(
            "{}: {}/{} completed, {} written, {} failed",
            label,
            completed.load(Ordering::Relaxed),
            total,
            report.written.len(),
            report.failed.len()
        );
        report
    }
}
