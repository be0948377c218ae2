//! Media Sorter - file photos and videos into a dated tree
//!
//! A CLI tool that moves media files into `YYYY/MM/` folders under names
//! built from their capture time and a stable identifier.

use anyhow::{Context, Result};
use clap::Parser;
use media_sorter::{Cli, Config, FileStatus, SortEngine, SortReport, SystemMetadataReader};
use std::path::Path;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colored summary output for the terminal

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(format!("{}\n", "─".repeat(60))));
    }

    pub fn print_title(title: &str) {
        let _ = stdout().execute(Print(format!("  {}\n", title.bold())));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// Print a labelled statistic
    pub fn print_stat(key: &str, value: usize, color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value.to_string()).with(color).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    /// Print one per-file result line
    pub fn print_result(status_icon: &str, status_color: Color, source: &str, detail: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(status_icon).with(status_color).bold()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(source).italic()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(detail).with(CliTheme::HINT)));
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = setup_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Media Sorter starting");

    let config = load_config(&cli)?;
    if config.verbose {
        info!(?config, "Configuration loaded");
    }

    let reader = SystemMetadataReader::new(&config.ffprobe_path);
    if !reader.video_support_available() {
        warn!(
            ffprobe = %config.ffprobe_path.display(),
            "FFprobe not found; videos will be reported as unsupported"
        );
    }

    let engine = SortEngine::new(&config, Arc::new(reader));

    let cancel = engine.cancel_handle();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, finishing files in progress");
        cancel.cancel();
    })
    .context("Failed to install Ctrl-C handler")?;

    match engine.sort(&config.source_dir, &config.destination_dir) {
        Ok(report) => {
            print_summary(&report, &config);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Sort failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli) -> Result<Config> {
    let config = match cli.config {
        Some(ref path) => {
            info!(config_file = %path.display(), "Loading configuration from file");
            cli.merge_with_config(Config::load_from_file(path)?)
        }
        None => cli.to_config(),
    };

    if config.source_dir.as_os_str().is_empty() || config.destination_dir.as_os_str().is_empty() {
        anyhow::bail!("Both a source and a destination directory are required");
    }

    Ok(config)
}

/// Setup logging (stderr, plus a log file when requested)
fn setup_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr));

    let Some(ref log_path) = cli.log_file else {
        subscriber.init();
        return Ok(None);
    };

    let file = open_log_file(log_path)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .init();
    }

    Ok(Some(guard))
}

fn open_log_file(log_path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = log_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))
}

fn print_summary(report: &SortReport, config: &Config) {
    use cli_output::*;

    print_separator();
    print_title(if config.dry_run {
        "Dry run complete"
    } else {
        "Sort complete"
    });
    print_separator();

    if config.dry_run {
        print_stat("Planned", report.count(FileStatus::Planned), CliTheme::ACCENT);
    } else {
        print_stat("Photos", report.counters.photos, CliTheme::SUCCESS);
        print_stat("Videos", report.counters.videos, CliTheme::SUCCESS);
    }
    print_stat("Collisions", report.count(FileStatus::Collision), CliTheme::WARNING);
    print_stat("Unsupported", report.count(FileStatus::Unsupported), CliTheme::HINT);
    print_stat("Failed", report.count(FileStatus::Failed), CliTheme::ERROR);

    for outcome in &report.outcomes {
        let source = outcome.source.display().to_string();
        let destination = outcome
            .destination
            .as_ref()
            .map(|p| format!("→ {}", p.display()))
            .unwrap_or_default();

        match outcome.status {
            FileStatus::Failed => {
                let message = outcome.error.as_deref().unwrap_or("unknown error");
                print_result("✗", CliTheme::ERROR, &source, message);
            }
            _ if !config.verbose => {}
            FileStatus::Relocated => print_result("✓", CliTheme::SUCCESS, &source, &destination),
            FileStatus::Planned => print_result("~", CliTheme::ACCENT, &source, &destination),
            FileStatus::Collision => print_result("≡", CliTheme::WARNING, &source, &destination),
            FileStatus::Unsupported => {
                print_result("⊘", CliTheme::HINT, &source, "unsupported format")
            }
            FileStatus::Cancelled => print_result("-", CliTheme::HINT, &source, "cancelled"),
        }
    }

    if report.cancelled {
        print_warning("Run was cancelled; remaining files were left in place");
    }
    if config.dry_run {
        print_warning("Dry run: no files were moved");
    }
}
