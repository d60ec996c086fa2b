//! Prelude module for the pea_mirror library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use pea_mirror::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use pea_mirror::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None).await?;
//!     let handler = HttpHandler::from_config(&config.client)?;
//!     let downloader = Downloader::new(Arc::new(handler), ProgressReporter::new(true));
//!
//!     let result = MirrorSession::new(config.to_session_config()?, downloader)
//!         .run()
//!         .await?;
//!     println!("{}", result.summary());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Configuration
pub use crate::config::AppConfig;

// Essential app components that are used in most integrations
pub use crate::app::{
    AssetRef, BatchReport, CatalogDatabase, ClientConfig, Downloader, FontRecord, HttpHandler,
    MirrorSession, ProgressReporter, SessionConfig, SessionResult, TemplateConfig, Transport,
    WorkerConfig, WorkerPool,
};

// Commonly used constants
pub use crate::constants::{DEFAULT_FONT_WORKERS, DEFAULT_RATE_LIMIT_RPS, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;
