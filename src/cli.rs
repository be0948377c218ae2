//! CLI argument parsing with clap

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Media Sorter - file photos and videos into a dated tree
///
/// Moves every photo and video found directly inside SOURCE to
/// DESTINATION/YYYY/MM/ under a name built from its capture time and a
/// stable identifier. Files without a date go to DESTINATION/Unsorted/.
#[derive(Parser, Debug)]
#[command(name = "media-sorter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory containing the files to sort
    pub source: Option<PathBuf>,

    /// Root directory of the sorted tree (created if missing)
    pub destination: Option<PathBuf>,

    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Use the file system creation date when a file has no embedded date
    #[arg(short = 'f', long)]
    pub file_creation_date: bool,

    /// Number of threads for parallel processing (0 = auto)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// FFprobe executable used to read video metadata
    #[arg(long, env = "MEDIA_SORTER_FFPROBE")]
    pub ffprobe: Option<PathBuf>,

    /// Dry run mode - show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Write the log to this file in addition to stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Output log file format as JSON
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref source) = self.source {
            config.source_dir = source.clone();
        }
        if let Some(ref destination) = self.destination {
            config.destination_dir = destination.clone();
        }
        if self.file_creation_date {
            config.use_file_creation_time = true;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(ref ffprobe) = self.ffprobe {
            config.ffprobe_path = ffprobe.clone();
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}
