//! Worker pool configuration
//!
//! Serialized as the `[fonts]` section of the application config file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{http, workers};
use crate::errors::{DownloadError, DownloadResult};

/// Configuration for the concurrent font pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum number of concurrent downloads
    pub worker_count: usize,
    /// Timeout for each font download
    #[serde(rename = "timeout", with = "humantime_serde")]
    pub download_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: workers::DEFAULT_FONT_WORKERS,
            download_timeout: http::FONT_TIMEOUT,
        }
    }
}

impl WorkerConfig {
    /// Validate configuration values and return errors for invalid settings
    pub fn validate(&self) -> DownloadResult<()> {
        if self.worker_count == 0 {
            return Err(DownloadError::Configuration(
                "Worker count cannot be zero".to_string(),
            ));
        }

        if self.worker_count > workers::MAX_FONT_WORKERS {
            return Err(DownloadError::Configuration(format!(
                "Worker count ({}) exceeds maximum ({})",
                self.worker_count,
                workers::MAX_FONT_WORKERS
            )));
        }

        if self.download_timeout.is_zero() {
            return Err(DownloadError::Configuration(
                "Font download timeout cannot be zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Same configuration with a different worker count
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }
}
