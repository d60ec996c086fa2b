//! Concurrent download workers
//!
//! Used for the font set, which is large and order-independent. The pool
//! performs no retries: a failed asset is reported and a later run picks it
//! up again.
//!
//! # Module Organization
//!
//! - [`config`] - Worker count and per-download timeout
//! - [`pool`] - Bounded pool draining a shared queue
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pea_mirror::app::client::{ClientConfig, Downloader, HttpHandler};
//! use pea_mirror::app::progress::ProgressReporter;
//! use pea_mirror::app::worker::{WorkerConfig, WorkerPool};
//!
//! # async fn example(assets: Vec<pea_mirror::app::models::AssetRef>) -> Result<(), Box<dyn std::error::Error>> {
//! let handler = HttpHandler::from_config(&ClientConfig::default())?;
//! let downloader = Downloader::new(Arc::new(handler), ProgressReporter::new(true));
//! let pool = WorkerPool::new(WorkerConfig::default(), downloader)?;
//!
//! let report = pool.run("Downloading Fonts", assets).await;
//! for (name, reason) in report.failures() {
//!     eprintln!("Failed to download font '{}': {}", name, reason);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod pool;

pub use config::WorkerConfig;
pub use pool::WorkerPool;
