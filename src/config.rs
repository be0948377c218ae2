//! Configuration types for the media sorter

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for a sort run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the files to sort (not searched recursively)
    pub source_dir: PathBuf,

    /// Root of the dated destination tree
    pub destination_dir: PathBuf,

    /// Fall back to the file system creation time when no embedded date exists
    pub use_file_creation_time: bool,

    /// Number of worker threads (0 = available parallelism)
    pub threads: usize,

    /// Dry run mode - report destinations without moving anything
    pub dry_run: bool,

    /// Verbose output
    pub verbose: bool,

    /// FFprobe executable used to read video metadata
    pub ffprobe_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::new(),
            destination_dir: PathBuf::new(),
            use_file_creation_time: false,
            threads: 0, // Auto-detect
            dry_run: false,
            verbose: false,
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

impl Config {
    /// Number of workers to use for a run
    pub fn worker_count(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Media Sorter Configuration File
# This file uses TOML format (https://toml.io)

# Directory with the files to sort (only its top level is scanned)
source_dir = "D:/Camera Roll"

# Root of the sorted tree: files land in YYYY/MM/ or Unsorted/
destination_dir = "D:/Sorted"

# Use the file system creation time when a file has no embedded date
use_file_creation_time = false

# Number of threads for parallel processing (0 = auto-detect)
threads = 0

# Dry run mode - show what would be done without actually doing it
dry_run = false

# Verbose output - list every file in the summary
verbose = false

# FFprobe executable used to read video metadata
ffprobe_path = "ffprobe"
"#
        .to_string()
    }
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file '{}': {source}", .path.display())]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    #[error("Failed to parse config file '{}': {source}", .path.display())]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}
