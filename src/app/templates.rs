//! Template manifest reconciliation
//!
//! The template manifest lists every template as a tuple. Each one is
//! downloaded from one of two storage buckets into
//! `<root>/templates/file/<bucket>/<file>`. Afterwards any `.psd` file under
//! the template directory that the manifest no longer references is deleted.
//! Referenced files are never deleted, even when their download failed.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::app::client::{Downloader, Transport};
use crate::app::models::{AssetRef, BatchReport};
use crate::constants::{http, templates};
use crate::errors::{TemplateError, TemplateResult};

/// `[templates]` configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Remote storage the template buckets live under
    pub bucket_base: String,
    /// Timeout for each template download
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            bucket_base: templates::BUCKET_BASE.to_string(),
            timeout: http::DEFAULT_TIMEOUT,
        }
    }
}

/// One template referenced by the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    /// Storage bucket the file lives in
    pub bucket: &'static str,
    /// File name within the bucket
    pub file: String,
    /// Download source and local destination
    pub asset: AssetRef,
}

/// Bucket holding a template, chosen from its source attribution
pub fn bucket_for(source: &str) -> &'static str {
    if source.contains(templates::SHARED_HOST_MARKER) {
        templates::SHARED_BUCKET
    } else {
        templates::RESOURCE_BUCKET
    }
}

/// Outcome of one reconcile pass
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Per-template download outcomes
    pub downloaded: BatchReport,
    /// Unreferenced files that were deleted
    pub removed: Vec<PathBuf>,
    /// Deletions and directory scans that failed
    pub remove_errors: Vec<TemplateError>,
}

/// Keeps the local template directory in line with the manifest
#[derive(Debug)]
pub struct TemplateReconciler<T> {
    downloader: Downloader<T>,
    bucket_base: Url,
    local_root: PathBuf,
    timeout: Duration,
}

impl<T: Transport> TemplateReconciler<T> {
    /// Creates a reconciler for the mirror at `local_root`
    pub fn new(
        downloader: Downloader<T>,
        bucket_base: Url,
        local_root: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            downloader,
            bucket_base,
            local_root,
            timeout,
        }
    }

    /// Root of the local template tree
    pub fn template_dir(&self) -> PathBuf {
        self.local_root.join(templates::LOCAL_DIR)
    }

    /// Path of the mirrored template manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.local_root.join(templates::MANIFEST_PATH)
    }

    /// Reads the mirrored manifest and reconciles against it
    pub async fn run(&self) -> TemplateResult<ReconcileReport> {
        let path = self.manifest_path();
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| TemplateError::ManifestUnreadable { path, source })?;
        let manifest: Value =
            serde_json::from_str(&text).map_err(|e| TemplateError::ManifestInvalid {
                reason: e.to_string(),
            })?;

        self.reconcile(&manifest).await
    }

    /// Derives the download list from a parsed manifest
    ///
    /// Tuples without a usable file name are warned about and skipped.
    pub fn entries(&self, manifest: &Value) -> TemplateResult<Vec<TemplateEntry>> {
        let list = manifest
            .get("list")
            .and_then(Value::as_array)
            .ok_or_else(|| TemplateError::ManifestInvalid {
                reason: "missing 'list' array".to_string(),
            })?;

        let entries = list
            .iter()
            .enumerate()
            .filter_map(|(index, tuple)| match self.entry(tuple) {
                Some(entry) => Some(entry),
                None => {
                    warn!("Skipping template #{}: {}", index, tuple);
                    None
                }
            })
            .collect();
        Ok(entries)
    }

    fn entry(&self, tuple: &Value) -> Option<TemplateEntry> {
        let file = tuple.get(templates::FILE_FIELD)?.as_str()?;
        let source = tuple
            .get(templates::SOURCE_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !is_plain_relative(file) {
            return None;
        }

        let bucket = bucket_for(source);
        let remote = self.bucket_base.join(&format!("{}/{}", bucket, file)).ok()?;
        let local = self.template_dir().join(bucket).join(file);

        Some(TemplateEntry {
            bucket,
            file: file.to_string(),
            asset: AssetRef::new(remote, local),
        })
    }

    /// Downloads every referenced template, then prunes unreferenced files
    pub async fn reconcile(&self, manifest: &Value) -> TemplateResult<ReconcileReport> {
        let entries = self.entries(manifest)?;
        info!("Checking {} templates...", entries.len());

        let assets: Vec<AssetRef> = entries.into_iter().map(|e| e.asset).collect();
        let downloaded = self
            .downloader
            .fetch_all("Updating Templates", &assets, self.timeout)
            .await;

        info!("Checking for unused local templates to remove...");
        let referenced: HashSet<PathBuf> = assets.into_iter().map(|a| a.local).collect();
        let mut report = ReconcileReport {
            downloaded,
            ..Default::default()
        };

        for path in self.local_templates(&mut report.remove_errors).await {
            if referenced.contains(&path) {
                continue;
            }
            info!(
                "Removing unused template: {}",
                path.strip_prefix(&self.local_root).unwrap_or(&path).display()
            );
            match tokio::fs::remove_file(&path).await {
                Ok(()) => report.removed.push(path),
                Err(source) => {
                    let error = TemplateError::RemoveFailed { path, source };
                    warn!("{}", error);
                    report.remove_errors.push(error);
                }
            }
        }

        Ok(report)
    }

    /// Every template file below the template directory
    async fn local_templates(&self, errors: &mut Vec<TemplateError>) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut pending = vec![self.template_dir()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => {
                    let error = TemplateError::ScanFailed { path: dir, source };
                    warn!("{}", error);
                    errors.push(error);
                    continue;
                }
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(source) => {
                        errors.push(TemplateError::ScanFailed {
                            path: dir.clone(),
                            source,
                        });
                        break;
                    }
                };

                let path = entry.path();
                match entry.file_type().await {
                    Ok(kind) if kind.is_dir() => pending.push(path),
                    Ok(kind) if kind.is_file() && is_template(&path) => found.push(path),
                    _ => {}
                }
            }
        }

        found
    }
}

fn is_template(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == templates::TEMPLATE_EXTENSION)
}

/// Rejects names that would escape the bucket directory
fn is_plain_relative(file: &str) -> bool {
    !file.is_empty()
        && Path::new(file)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}
