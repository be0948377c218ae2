//! Creation date resolution
//!
//! The date of a classified file is taken from, in order:
//! 1. The embedded metadata date (EXIF DateTimeOriginal / video creation date)
//! 2. The file system creation time, when enabled
//!
//! Embedded dates are used exactly as written, without any timezone
//! conversion. The file system fallback is expressed in local time.

pub mod components;

pub use components::{DateComponents, parse_embedded_date};

use crate::media::ClassifiedFile;
use chrono::{DateTime, Datelike, Local, Timelike};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Resolve the creation date of a classified file
pub fn resolve_date(file: &ClassifiedFile, use_file_creation_time: bool) -> Option<DateComponents> {
    let path = &file.path;

    if let Some(raw) = file.container.date_field() {
        if let Some(date) = parse_embedded_date(raw) {
            debug!(?path, raw, "Using embedded date");
            return Some(date);
        }
        debug!(?path, raw, "Embedded date is not parseable");
    }

    if use_file_creation_time {
        if let Some(date) = file_creation_date(path) {
            debug!(?path, "Using file system creation time");
            return Some(date);
        }
        debug!(?path, "File system creation time unavailable");
    }

    None
}

/// File system creation time as local calendar components
pub fn file_creation_date(path: &Path) -> Option<DateComponents> {
    let created = fs::metadata(path).and_then(|m| m.created()).ok()?;
    let local: DateTime<Local> = created.into();

    Some(DateComponents::new(
        local.year().max(0) as u32,
        local.month(),
        local.day(),
        local.hour(),
        local.minute(),
        local.second(),
    ))
}
