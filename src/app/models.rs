//! Data models shared by the download phases
//!
//! An [`AssetRef`] pairs a remote URL with the local path it is mirrored to.
//! Batch downloads report one outcome per asset through a [`BatchReport`].

use std::path::{Path, PathBuf};

use serde::Serialize;
use url::Url;

use crate::errors::{DownloadError, DownloadResult};

/// One remote file and where it lands locally
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetRef {
    /// Absolute remote URL
    pub remote: Url,
    /// Local destination path
    pub local: PathBuf,
}

impl AssetRef {
    /// Creates an asset from an already-built URL and local path
    pub fn new(remote: Url, local: impl Into<PathBuf>) -> Self {
        Self {
            remote,
            local: local.into(),
        }
    }

    /// Mirrors `remote_path` under `base` to `local_path` under `local_root`
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::InvalidUrl` if `remote_path` cannot be joined
    /// onto `base`
    pub fn mirrored(
        base: &Url,
        remote_path: &str,
        local_root: &Path,
        local_path: &str,
    ) -> DownloadResult<Self> {
        let remote = base
            .join(remote_path)
            .map_err(|e| DownloadError::InvalidUrl {
                url: format!("{}{}", base, remote_path),
                error: e.to_string(),
            })?;
        Ok(Self::new(remote, local_root.join(local_path)))
    }

    /// Same relative path remotely and locally
    pub fn same_path(base: &Url, path: &str, local_root: &Path) -> DownloadResult<Self> {
        Self::mirrored(base, path, local_root, path)
    }

    /// Short display name (local file name)
    pub fn name(&self) -> String {
        self.local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.remote.to_string())
    }
}

/// A file that was written successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    /// Display name of the asset
    pub name: String,
    /// Local path written
    pub path: PathBuf,
    /// Number of bytes written
    pub bytes: u64,
}

/// A file that could not be fetched
#[derive(Debug)]
pub struct FetchFailure {
    /// Display name of the asset
    pub name: String,
    /// The asset that failed
    pub asset: AssetRef,
    /// Why it failed
    pub error: DownloadError,
}

impl FetchFailure {
    /// Human readable failure reason
    pub fn reason(&self) -> String {
        self.error.to_string()
    }
}

/// Per-item outcomes of a batch download
///
/// Every asset handed to a batch ends up in exactly one of the two lists.
/// For concurrent batches the order of either list is unspecified.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Assets written to disk
    pub written: Vec<WrittenFile>,
    /// Assets that failed
    pub failed: Vec<FetchFailure>,
}

impl BatchReport {
    /// Records one outcome
    pub fn record(&mut self, asset: AssetRef, outcome: DownloadResult<u64>) {
        let name = asset.name();
        match outcome {
            Ok(bytes) => self.written.push(WrittenFile {
                name,
                path: asset.local,
                bytes,
            }),
            Err(error) => self.failed.push(FetchFailure { name, asset, error }),
        }
    }

    /// Number of assets attempted
    pub fn attempted(&self) -> usize {
        self.written.len() + self.failed.len()
    }

    /// Whether every attempted asset was written
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total bytes written
    pub fn bytes_written(&self) -> u64 {
        self.written.iter().map(|w| w.bytes).sum()
    }

    /// (name, reason) pairs for every failure
    pub fn failures(&self) -> Vec<(String, String)> {
        self.failed
            .iter()
            .map(|f| (f.name.clone(), f.reason()))
            .collect()
    }
}
