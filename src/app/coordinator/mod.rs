//! Mirror session orchestration
//!
//! A [`MirrorSession`] runs the phases of one mirror pass strictly in order:
//!
//! 1. resolve the bootstrap document and download the core files
//! 2. decode the database file
//! 3. write the font manifest
//! 4. fetch missing default fonts
//! 5. apply the offline patches
//! 6. optionally fetch every missing font through the worker pool
//! 7. optionally reconcile the template directory
//!
//! Only resolution failures and a missing or empty database abort the
//! session. Everything else is recorded in the [`SessionResult`] and the
//! session moves on, so a partial run still leaves a usable mirror that the
//! next run converges further.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pea_mirror::app::client::{ClientConfig, Downloader, HttpHandler};
//! use pea_mirror::app::coordinator::{MirrorSession, SessionConfig};
//! use pea_mirror::app::progress::ProgressReporter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handler = HttpHandler::from_config(&ClientConfig::default())?;
//! let downloader = Downloader::new(Arc::new(handler), ProgressReporter::new(true));
//! let config = SessionConfig::for_origin()?.with_fonts(true);
//!
//! let result = MirrorSession::new(config, downloader).run().await?;
//! println!("{}", result.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod stats;

use std::time::Instant;

use tracing::{info, warn};

use crate::app::catalog::{CatalogDatabase, FontRecord};
use crate::app::client::{Downloader, Transport};
use crate::app::fonts::{write_manifest, FontMirror};
use crate::app::patch::{apply_all, RULES};
use crate::app::resolver::{core_assets, AssetResolver};
use crate::app::templates::TemplateReconciler;
use crate::app::worker::WorkerPool;
use crate::constants::fonts;
use crate::errors::{AppError, Result};

pub use config::{parse_base, SessionConfig};
pub use stats::{PatchSummary, PhaseSummary, SessionResult};

/// One pass over the mirror
#[derive(Debug)]
pub struct MirrorSession<T> {
    config: SessionConfig,
    downloader: Downloader<T>,
}

impl<T: Transport> MirrorSession<T> {
    /// Creates a session downloading through `downloader`
    pub fn new(config: SessionConfig, downloader: Downloader<T>) -> Self {
        Self { config, downloader }
    }

    /// The session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Runs every phase in order
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid, when the dynamic
    /// paths cannot be resolved, or when the database file is unreadable or
    /// holds no declarations. Nothing after the failing phase runs.
    pub async fn run(&self) -> Result<SessionResult> {
        let session_start = Instant::now();
        let config = &self.config;
        config.validate()?;

        let mut result = SessionResult::started();
        info!(
            "Mirroring {} into {}",
            config.remote_base,
            config.local_root.display()
        );

        info!("--- Step 1: Downloading core application files ---");
        let resolver = AssetResolver::new(
            &self.downloader,
            &config.remote_base,
            &config.local_root,
            config.core_timeout,
        );
        let paths = resolver.resolve().await?;
        result.dynamic_paths = paths
            .iter()
            .map(|(asset, path)| (asset.name().to_string(), path.to_string()))
            .collect();

        let core = core_assets(&config.remote_base, &config.local_root, &paths)?;
        info!("Downloading {} core files...", core.len());
        let core_report = self
            .downloader
            .fetch_all("Core Files", &core, config.core_timeout)
            .await;
        result.record_phase("core", &core_report);

        info!("--- Step 2: Parsing database file ---");
        let database = CatalogDatabase::load(&config.local_root.join(paths.database())).await?;
        let font_records = match database.font_catalog() {
            Ok(catalog) => {
                let records = catalog.fonts();
                result.fonts_decoded = Some(records.len());
                Some(records)
            }
            Err(e) => {
                warn!("Font phases will be skipped");
                tolerate(&mut result, e.into())?;
                None
            }
        };

        let font_mirror = FontMirror::new(
            self.downloader.clone(),
            config.remote_base.clone(),
            config.local_root.clone(),
        );

        info!("--- Step 3: Generating font manifest ---");
        match &font_records {
            Some(records) => {
                if let Err(e) = write_manifest(&config.local_root, records).await {
                    tolerate(&mut result, e.into())?;
                }
            }
            None => info!("Could not find font database. Skipping manifest generation."),
        }

        info!("--- Step 4: Downloading default fonts ---");
        match &font_records {
            Some(records) => {
                let report = font_mirror
                    .sync_defaults(records, config.fonts.download_timeout)
                    .await;
                result.record_phase("default fonts", &report);
            }
            None => info!("Could not find font database. Skipping default font download."),
        }

        info!("--- Step 5: Applying critical patches for offline functionality ---");
        let patch_report = apply_all(RULES, &config.local_root, &paths).await;
        result.patches = PatchSummary::from(&patch_report);

        info!("--- Core setup complete. Application is now functional. ---");

        if config.sync_fonts {
            info!("--- Updating all fonts (--fonts) ---");
            self.sync_fonts(&font_mirror, font_records.as_deref(), &mut result)
                .await?;
        }

        if config.sync_templates {
            info!("--- Updating all templates (--templates) ---");
            self.sync_templates(&mut result).await?;
        }

        result.total_duration = session_start.elapsed();
        info!("{}", result.summary());
        Ok(result)
    }

    async fn sync_fonts(
        &self,
        font_mirror: &FontMirror<T>,
        records: Option<&[FontRecord]>,
        result: &mut SessionResult,
    ) -> Result<()> {
        let Some(records) = records else {
            let message = format!(
                "'{}' data not found in database, cannot update fonts",
                fonts::CATALOG_VARIABLE
            );
            warn!("{}", message);
            result.warn(message);
            return Ok(());
        };

        match WorkerPool::new(self.config.fonts.clone(), self.downloader.clone()) {
            Ok(pool) => {
                let report = font_mirror.sync_missing(&pool, records).await;
                result.record_phase("fonts", &report);
                Ok(())
            }
            Err(e) => tolerate(result, e.into()),
        }
    }

    async fn sync_templates(&self, result: &mut SessionResult) -> Result<()> {
        let reconciler = TemplateReconciler::new(
            self.downloader.clone(),
            self.config.template_bucket_base.clone(),
            self.config.local_root.clone(),
            self.config.template_timeout,
        );

        match reconciler.run().await {
            Ok(report) => {
                result.record_phase("templates", &report.downloaded);
                result.templates_removed = report.removed.len();
                for e in report.remove_errors {
                    result.warn(e.to_string());
                }
            }
            Err(e) => {
                warn!("Skipping template update");
                tolerate(result, e.into())?;
            }
        }
        Ok(())
    }
}

/// Records a non-fatal error as a warning and propagates a fatal one
fn tolerate(result: &mut SessionResult, error: AppError) -> Result<()> {
    if error.is_fatal() {
        return Err(error);
    }
    warn!("{} error: {}", error.category(), error);
    result.warn(error.to_string());
    Ok(())
}
