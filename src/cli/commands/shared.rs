//! Shared components for CLI commands
//!
//! Logging setup, progress bars and the end-of-run summary used by every
//! subcommand.

use crate::cli::args::LoggingArgs;
use crate::error::{LinkerError, Result};
use crate::models::ProcessingStats;
use colored::*;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::debug;

/// Set up structured logging on stderr.
///
/// `RUST_LOG` takes precedence over the verbosity flags.
pub fn setup_logging(args: &LoggingArgs) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cohort_linker={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| LinkerError::configuration(format!("Failed to initialise logging: {}", e)))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Create a progress bar with appropriate styling, hidden in quiet mode
pub fn create_progress_bar(total: u64, message: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} ETA: {eta}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Create a spinner for steps without a known length
pub fn create_spinner(message: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Print the end-of-run summary
pub fn print_summary(title: &str, stats: &ProcessingStats) {
    let elapsed = Duration::from_millis(stats.processing_time_ms.try_into().unwrap_or(u64::MAX));

    println!("\n{}", title.bright_green().bold());
    println!(
        "  {} {}",
        "Time elapsed:".bright_cyan(),
        HumanDuration(elapsed).to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Records read:".bright_cyan(),
        stats.records_read.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Records written:".bright_cyan(),
        stats.records_written.to_string().bright_white()
    );
    if stats.files_downloaded > 0 {
        println!(
            "  {} {}",
            "Files downloaded:".bright_cyan(),
            stats.files_downloaded.to_string().bright_white()
        );
    }
    if stats.unmatched_records > 0 {
        println!(
            "  {} {}",
            "Unmatched records:".bright_yellow(),
            stats.unmatched_records.to_string().bright_yellow().bold()
        );
    }
    for path in &stats.output_paths {
        println!("  {} {}", "Output:".bright_cyan(), path.display());
    }
}
