//! pea_mirror CLI application
//!
//! Refreshes a local mirror of the photo editor so it runs offline.

use std::process;

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use pea_mirror::app::ProgressReporter;
use pea_mirror::cli::{Cli, handle_init_config, handle_sync};
use pea_mirror::config::{AppConfig, LoggingConfig};
use pea_mirror::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error ({}): {}", e.category(), e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    if cli.sync.init_config {
        init_logging(&cli, &LoggingConfig::default(), &ProgressReporter::hidden());
        return handle_init_config(&cli.global).await;
    }

    let config = AppConfig::load(cli.global.config.clone()).await?;
    let progress = ProgressReporter::new(!cli.sync.no_progress && !cli.global.quiet);
    init_logging(&cli, &config.logging, &progress);

    info!("pea_mirror v{} starting", env!("CARGO_PKG_VERSION"));
    handle_sync(&cli.global, &cli.sync, config, progress).await
}

/// Initialize logging from the verbosity flags and the `[logging]` section
fn init_logging(cli: &Cli, logging: &LoggingConfig, progress: &ProgressReporter) {
    let default_level = logging.level.parse().unwrap_or(tracing::Level::INFO);
    let log_level = cli.log_level(default_level);

    let mut filter = EnvFilter::from_default_env();
    match format!("pea_mirror={}", log_level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring invalid log directive: {}", e),
    }

    fmt()
        .with_env_filter(filter)
        .with_writer(progress.log_writer())
        .with_target(false)
        .with_ansi(logging.colored_output)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
