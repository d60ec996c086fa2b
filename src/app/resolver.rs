//! Bootstrap document resolution
//!
//! The origin stamps a version number into the file names of its largest
//! bundles. The only way to learn the current names is to download the
//! bootstrap document and look for them. [`AssetResolver::resolve`] does
//! exactly that and produces a [`DynamicPathSet`] that is guaranteed to hold
//! the required bundles.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use tracing::{error, info, warn};
use url::Url;

use crate::app::client::{Downloader, Transport};
use crate::app::models::AssetRef;
use crate::constants::{origin, patterns};
use crate::errors::{ResolveError, ResolveResult};

/// Logical names of the version-stamped bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DynamicAsset {
    /// Style sheet bundle (optional)
    Style,
    /// Extension bundle (optional)
    Extension,
    /// Database bundle holding the font catalog (required)
    Database,
    /// Application logic bundle (required)
    AppLogic,
}

impl DynamicAsset {
    /// Every dynamic asset, in scan order
    pub const ALL: [DynamicAsset; 4] = [
        DynamicAsset::Style,
        DynamicAsset::Extension,
        DynamicAsset::Database,
        DynamicAsset::AppLogic,
    ];

    /// Stable name used in logs and reports
    pub fn name(self) -> &'static str {
        match self {
            DynamicAsset::Style => "style",
            DynamicAsset::Extension => "ext",
            DynamicAsset::Database => "database",
            DynamicAsset::AppLogic => "app-logic",
        }
    }

    /// Pattern matching the versioned file name
    pub fn pattern(self) -> &'static str {
        match self {
            DynamicAsset::Style => patterns::STYLE,
            DynamicAsset::Extension => patterns::EXTENSION,
            DynamicAsset::Database => patterns::DATABASE,
            DynamicAsset::AppLogic => patterns::APP_LOGIC,
        }
    }

    /// Whether a run can proceed without this asset
    pub fn is_required(self) -> bool {
        matches!(self, DynamicAsset::Database | DynamicAsset::AppLogic)
    }
}

impl fmt::Display for DynamicAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Discovered relative paths of the version-stamped bundles
///
/// Construction fails unless every required asset is present, so the
/// accessors for required assets are infallible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicPathSet {
    paths: BTreeMap<DynamicAsset, String>,
}

impl DynamicPathSet {
    /// Builds a set from discovered paths
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::MissingDynamicPath` naming the first required
    /// asset that is absent
    pub fn new(paths: BTreeMap<DynamicAsset, String>) -> ResolveResult<Self> {
        if let Some(missing) = DynamicAsset::ALL
            .into_iter()
            .find(|asset| asset.is_required() && !paths.contains_key(asset))
        {
            return Err(ResolveError::MissingDynamicPath {
                name: missing.name(),
            });
        }
        Ok(Self { paths })
    }

    /// Scans `document` for every dynamic asset, first match wins
    pub fn scan(document: &str) -> ResolveResult<Self> {
        let mut paths = BTreeMap::new();

        for asset in DynamicAsset::ALL {
            match first_match(asset.pattern(), document) {
                Some(path) => {
                    info!("Found {}: {}", asset, path);
                    paths.insert(asset, path);
                }
                None if asset.is_required() => {
                    error!("Could not find required path for '{}'", asset);
                }
                None => warn!("Could not find path for '{}'", asset),
            }
        }

        Self::new(paths)
    }

    /// Path of any dynamic asset, if discovered
    pub fn get(&self, asset: DynamicAsset) -> Option<&str> {
        self.paths.get(&asset).map(String::as_str)
    }

    /// Path of the database bundle
    pub fn database(&self) -> &str {
        self.get(DynamicAsset::Database).unwrap_or_default()
    }

    /// Path of the application logic bundle
    pub fn app_logic(&self) -> &str {
        self.get(DynamicAsset::AppLogic).unwrap_or_default()
    }

    /// Discovered (asset, path) pairs in scan order
    pub fn iter(&self) -> impl Iterator<Item = (DynamicAsset, &str)> {
        self.paths.iter().map(|(asset, path)| (*asset, path.as_str()))
    }

    /// Number of discovered paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether no path was discovered (never true for a constructed set)
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// First match of `pattern` in `document`
fn first_match(pattern: &str, document: &str) -> Option<String> {
    match Regex::new(pattern) {
        Ok(regex) => regex.find(document).map(|m| m.as_str().to_string()),
        Err(e) => {
            warn!("Invalid dynamic path pattern {}: {}", pattern, e);
            None
        }
    }
}

/// Downloads the bootstrap document and resolves the dynamic paths
#[derive(Debug)]
pub struct AssetResolver<'a, T> {
    downloader: &'a Downloader<T>,
    remote_base: &'a Url,
    local_root: &'a Path,
    timeout: Duration,
}

impl<'a, T: Transport> AssetResolver<'a, T> {
    /// Creates a resolver mirroring `remote_base` under `local_root`
    pub fn new(
        downloader: &'a Downloader<T>,
        remote_base: &'a Url,
        local_root: &'a Path,
        timeout: Duration,
    ) -> Self {
        Self {
            downloader,
            remote_base,
            local_root,
            timeout,
        }
    }

    /// Local path of the bootstrap document
    pub fn bootstrap_path(&self) -> PathBuf {
        self.local_root.join(origin::BOOTSTRAP_DOCUMENT)
    }

    /// Fetches the bootstrap document (overwriting) and scans it
    ///
    /// # Errors
    ///
    /// Fails when the document cannot be downloaded or read back, or when a
    /// required dynamic path is missing from it
    pub async fn resolve(&self) -> ResolveResult<DynamicPathSet> {
        let bootstrap = AssetRef::same_path(
            self.remote_base,
            origin::BOOTSTRAP_DOCUMENT,
            self.local_root,
        )
        .map_err(|e| ResolveError::InvalidUrl {
            path: origin::BOOTSTRAP_DOCUMENT.to_string(),
            error: e.to_string(),
        })?;

        info!("Downloading {}...", origin::BOOTSTRAP_DOCUMENT);
        self.downloader
            .fetch(&bootstrap, self.timeout)
            .await
            .map_err(|source| ResolveError::BootstrapUnavailable {
                name: origin::BOOTSTRAP_DOCUMENT.to_string(),
                source,
            })?;

        let document = tokio::fs::read_to_string(&bootstrap.local)
            .await
            .map_err(|source| ResolveError::BootstrapUnreadable {
                path: bootstrap.local.clone(),
                source,
            })?;

        info!(
            "Parsing {} for dynamic file names...",
            origin::BOOTSTRAP_DOCUMENT
        );
        DynamicPathSet::scan(&document)
    }
}

/// Core batch: the static core list followed by every discovered path
pub fn core_assets(
    remote_base: &Url,
    local_root: &Path,
    dynamic: &DynamicPathSet,
) -> ResolveResult<Vec<AssetRef>> {
    let statics = origin::CORE_FILES
        .iter()
        .map(|(remote, local)| (*remote, *local));
    let dynamics = dynamic.iter().map(|(_, path)| (path, path));

    statics
        .chain(dynamics)
        .map(|(remote, local)| {
            AssetRef::mirrored(remote_base, remote, local_root, local).map_err(|e| {
                ResolveError::InvalidUrl {
                    path: remote.to_string(),
                    error: e.to_string(),
                }
            })
        })
        .collect()
}
