//! Command handlers for the CLI
//!
//! Turns parsed arguments and the loaded configuration into a mirror
//! session, runs it and prints the summary.

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::{
    Downloader, HttpHandler, MirrorSession, ProgressReporter, SessionConfig, SessionResult,
};
use crate::cli::args::{GlobalArgs, SyncArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Handle `--init-config`: write a default config file and report where
pub async fn handle_init_config(global: &GlobalArgs) -> Result<()> {
    let path = match &global.config {
        Some(path) => path.clone(),
        None => AppConfig::default_config_path()?,
    };

    if AppConfig::init_config_file(&path).await? {
        println!("📁 Created default configuration file:");
        println!("   {}", path.display());
        println!("   You can customize settings by editing this file.");
    } else {
        println!("ℹ️  Configuration file already exists: {}", path.display());
    }
    Ok(())
}

/// Handle a mirror run
///
/// `progress` must be the reporter whose log writer the subscriber uses.
pub async fn handle_sync(
    global: &GlobalArgs,
    args: &SyncArgs,
    config: AppConfig,
    progress: ProgressReporter,
) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let session_config = session_config(config.clone(), args)?;
    info!(
        "Mirroring {} into {}",
        session_config.remote_base,
        session_config.local_root.display()
    );

    let handler = HttpHandler::from_config(&config.client)?;
    let downloader = Downloader::new(Arc::new(handler), progress);

    let result = MirrorSession::new(session_config, downloader).run().await?;
    print_summary(&result, global.quiet);

    if result.has_failures() {
        warn!("{}", result.summary());
    }
    Ok(())
}

/// Applies command line overrides on top of the loaded configuration
pub fn session_config(mut config: AppConfig, args: &SyncArgs) -> Result<SessionConfig> {
    if let Some(root) = &args.root {
        config.mirror.local_root = root.clone();
    }
    if let Some(remote) = &args.remote {
        config.mirror.remote_base = remote.clone();
    }
    if let Some(workers) = args.workers {
        config.fonts.worker_count = workers;
    }

    Ok(config
        .to_session_config()?
        .with_fonts(args.fonts)
        .with_templates(args.templates))
}

fn print_summary(result: &SessionResult, quiet: bool) {
    println!("\n📊 Mirror Summary:");
    if !quiet {
        for (name, path) in &result.dynamic_paths {
            println!("  {:<10} {}", name, path);
        }
        for phase in &result.phases {
            println!(
                "  {:<14} {} written, {} failed ({} bytes)",
                phase.name, phase.written, phase.failed, phase.bytes
            );
        }
        if let Some(count) = result.fonts_decoded {
            println!("  Fonts decoded: {}", count);
        }
        println!(
            "  Patches: {} applied, {} already applied, {} skipped",
            result.patches.applied, result.patches.already_applied, result.patches.skipped
        );
        if result.templates_removed > 0 {
            println!("  Templates removed: {}", result.templates_removed);
        }
    }

    println!("  Total time: {:.1}s", result.total_duration.as_secs_f64());

    if !result.failures.is_empty() {
        println!("\nFailed downloads:");
        for (file, reason) in &result.failures {
            println!("  • {}: {}", file, reason);
        }
    }
    if !result.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &result.warnings {
            println!("  • {}", warning);
        }
    }
}
