//! Media Sorter - files photos and videos into a dated tree
//!
//! This library moves media files from a flat source directory into
//! `YYYY/MM/` folders under deterministic names:
//! - Photo/video classification via EXIF-capable image sniffing and FFprobe
//! - Capture dates from embedded metadata, optionally the file system
//! - Identifiers from paired-capture metadata or SHA-256 content hashes
//! - Parallel processing with Rayon
//! - Collision detection that never overwrites an existing file

pub mod cli;
pub mod config;
pub mod error;
pub mod hash;
pub mod identity;
pub mod media;
pub mod naming;
pub mod process;
pub mod time;

pub use cli::Cli;
pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use identity::{IdentitySource, Identifier};
pub use media::{ClassifiedFile, Container, MediaKind, MetadataReader, SystemMetadataReader};
pub use process::{CancelHandle, FileOutcome, FileStatus, SortCounters, SortEngine, SortReport};
pub use time::DateComponents;
