//! Command-line argument parsing for pea_mirror
//!
//! The tool has a single action, a mirror run, so the arguments are flat:
//! global output options plus the switches for the optional phases.

use std::path::PathBuf;

use clap::{Args, Parser};

/// pea_mirror - keep an offline copy of the photo editor up to date
#[derive(Parser, Debug)]
#[command(
    name = "pea_mirror",
    version,
    about = "Mirror the photo editor for offline use",
    long_about = "Downloads the current application files, decodes the font catalog and patches
the mirror so it runs without the origin. Fonts and templates are synced on request."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Mirror run options
    #[command(flatten)]
    pub sync: SyncArgs,
}

/// Output and configuration options
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Options for one mirror run
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Download every font missing from the mirror
    #[arg(long)]
    pub fonts: bool,

    /// Download referenced templates and remove unreferenced ones
    #[arg(long)]
    pub templates: bool,

    /// Local mirror root
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Origin to mirror from
    #[arg(long, value_name = "URL")]
    pub remote: Option<String>,

    /// Number of concurrent font downloads
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Write a default config file and exit
    #[arg(long)]
    pub init_config: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level, falling back to `default` when no flag is set
    pub fn log_level(&self, default: tracing::Level) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            default
        }
    }
}

impl SyncArgs {
    /// Reject flag values clap cannot check on its own
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == Some(0) {
            return Err("Number of workers must be greater than 0".to_string());
        }

        if self.remote.as_deref().is_some_and(|r| !r.ends_with('/')) {
            return Err("--remote must end with '/'".to_string());
        }

        Ok(())
    }
}
