//! Configuration for one mirror session
//!
//! Built from the application config once command line and environment
//! overrides have been applied.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::app::worker::WorkerConfig;
use crate::constants::{http, origin, templates};
use crate::errors::{ConfigError, ConfigResult};

/// Everything a [`MirrorSession`](super::MirrorSession) needs to know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Origin every asset is mirrored from
    pub remote_base: Url,
    /// Root of the local mirror
    pub local_root: PathBuf,
    /// Timeout for the bootstrap document and core files
    pub core_timeout: Duration,
    /// Font pool settings, also used for the default font timeout
    pub fonts: WorkerConfig,
    /// Storage the template buckets live under
    pub template_bucket_base: Url,
    /// Timeout for each template download
    pub template_timeout: Duration,
    /// Run the full font sync
    pub sync_fonts: bool,
    /// Run the template reconcile
    pub sync_templates: bool,
}

impl SessionConfig {
    /// Session with default settings mirroring `remote_base` into `local_root`
    pub fn new(remote_base: Url, local_root: impl Into<PathBuf>) -> ConfigResult<Self> {
        let template_bucket_base = parse_base("templates.bucket_base", templates::BUCKET_BASE)?;
        Ok(Self {
            remote_base,
            local_root: local_root.into(),
            core_timeout: http::DEFAULT_TIMEOUT,
            fonts: WorkerConfig::default(),
            template_bucket_base,
            template_timeout: http::DEFAULT_TIMEOUT,
            sync_fonts: false,
            sync_templates: false,
        })
    }

    /// Session against the public origin
    pub fn for_origin() -> ConfigResult<Self> {
        let remote_base = parse_base("mirror.remote_base", origin::REMOTE_BASE)?;
        Self::new(remote_base, origin::LOCAL_ROOT)
    }

    /// Enable or disable the full font sync
    pub fn with_fonts(mut self, enabled: bool) -> Self {
        self.sync_fonts = enabled;
        self
    }

    /// Enable or disable the template reconcile
    pub fn with_templates(mut self, enabled: bool) -> Self {
        self.sync_templates = enabled;
        self
    }

    /// Set the font worker count
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.fonts.worker_count = count;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        self.fonts
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                field: "fonts".to_string(),
                value: self.fonts.worker_count.to_string(),
                reason: e.to_string(),
            })?;

        if self.core_timeout.is_zero() || self.template_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "timeout".to_string(),
                value: "0s".to_string(),
                reason: "Timeouts must be greater than zero".to_string(),
            });
        }

        for (field, url) in [
            ("mirror.remote_base", &self.remote_base),
            ("templates.bucket_base", &self.template_bucket_base),
        ] {
            if url.cannot_be_a_base() || !url.path().ends_with('/') {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: url.to_string(),
                    reason: "Must be an absolute URL ending in '/'".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Parses a base URL, naming `field` on failure
pub fn parse_base(field: &str, value: &str) -> ConfigResult<Url> {
    Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}
