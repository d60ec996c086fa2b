//! Font manifest generation and font file synchronisation
//!
//! Every font file lives at `rsrc/fonts/<sourcePath>` both remotely and
//! under the mirror root. Synchronisation only ever fetches files that are
//! missing locally; existing font files are never re-downloaded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use crate::app::catalog::FontRecord;
use crate::app::client::download::temp_path_for;
use crate::app::client::{Downloader, Transport};
use crate::app::models::{AssetRef, BatchReport};
use crate::app::worker::WorkerPool;
use crate::constants::fonts;
use crate::errors::{CatalogError, CatalogResult};

/// Writes the decoded catalog to `<root>/font-manifest.json`, replacing it
pub async fn write_manifest(local_root: &Path, records: &[FontRecord]) -> CatalogResult<PathBuf> {
    let path = local_root.join(fonts::MANIFEST_FILE);
    let write_error = |reason: String| CatalogError::ManifestWrite {
        path: path.clone(),
        reason,
    };

    let json = serde_json::to_vec(records).map_err(|e| write_error(e.to_string()))?;

    tokio::fs::create_dir_all(local_root)
        .await
        .map_err(|e| write_error(e.to_string()))?;
    let temp_path = temp_path_for(&path);
    tokio::fs::write(&temp_path, json)
        .await
        .map_err(|e| write_error(e.to_string()))?;
    tokio::fs::rename(&temp_path, &path)
        .await
        .map_err(|e| write_error(e.to_string()))?;

    info!(
        "Successfully created {} with {} fonts.",
        fonts::MANIFEST_FILE,
        records.len()
    );
    Ok(path)
}

/// Downloads font files from the origin into the mirror
#[derive(Debug)]
pub struct FontMirror<T> {
    downloader: Downloader<T>,
    remote_base: Url,
    local_root: PathBuf,
}

impl<T: Transport> FontMirror<T> {
    /// Creates a font mirror for `remote_base` under `local_root`
    pub fn new(downloader: Downloader<T>, remote_base: Url, local_root: PathBuf) -> Self {
        Self {
            downloader,
            remote_base,
            local_root,
        }
    }

    /// Local path of a font file
    pub fn local_path(&self, font: &FontRecord) -> PathBuf {
        self.local_root.join(font.relative_path())
    }

    /// Download target for a font, or `None` if its URL cannot be built
    pub fn asset(&self, font: &FontRecord) -> Option<AssetRef> {
        match AssetRef::same_path(&self.remote_base, &font.relative_path(), &self.local_root) {
            Ok(asset) => Some(asset),
            Err(e) => {
                warn!("Skipping font '{}': {}", font.post_script_name, e);
                None
            }
        }
    }

    /// Fonts from `records` with no file in the mirror
    pub async fn missing<'a>(&self, records: &'a [FontRecord]) -> Vec<&'a FontRecord> {
        let mut missing = Vec::new();
        for font in records {
            let present = tokio::fs::metadata(self.local_path(font))
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !present {
                missing.push(font);
            }
        }
        missing
    }

    /// Fetches missing faces of the default family, one at a time
    pub async fn sync_defaults(&self, records: &[FontRecord], timeout: Duration) -> BatchReport {
        info!("Checking for default fonts ({})...", fonts::DEFAULT_FAMILY);

        let defaults: Vec<FontRecord> = records
            .iter()
            .filter(|font| font.is_default_face())
            .cloned()
            .collect();
        let missing = self.missing(&defaults).await;

        let mut report = BatchReport::default();
        for font in missing {
            let Some(asset) = self.asset(font) else {
                continue;
            };
            info!(
                "  Downloading missing default font: {}",
                font.post_script_name
            );
            let outcome = self.downloader.fetch(&asset, timeout).await;
            if let Err(e) = &outcome {
                tracing::error!("Failed to download {}: {}", asset.name(), e);
            }
            report.record(asset, outcome);
        }
        report
    }

    /// Fetches every missing font through `pool`
    pub async fn sync_missing(&self, pool: &WorkerPool<T>, records: &[FontRecord]) -> BatchReport {
        let missing = self.missing(records).await;
        if missing.is_empty() {
            info!("All fonts are up to date.");
            return BatchReport::default();
        }

        info!(
            "Found {} new/missing fonts. Downloading...",
            missing.len()
        );
        let assets = missing
            .into_iter()
            .filter_map(|font| self.asset(font))
            .collect();
        pool.run("Downloading Fonts", assets).await
    }
}
