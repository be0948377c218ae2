//! Media classification
//!
//! A file is classified by asking a [`MetadataReader`] to open it as each
//! known container kind. Videos are probed first: several still-image
//! probes also accept the wrapper bytes of video containers, while the
//! video probe rejects still images outright.

pub mod exif;
pub mod video;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Kind of media a file was classified as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Photo => f.write_str("photo"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

/// A single metadata value as exposed by a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    Text(String),
    Number(i64),
    Other,
}

impl MetadataValue {
    /// The value as a string, only if it is string-valued
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Metadata read from a still-image container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoMetadata {
    /// Raw EXIF DateTimeOriginal string
    pub date_time_original: Option<String>,
    /// Vendor maker-note dictionary, keyed by decimal tag number
    pub maker_note: Option<BTreeMap<String, MetadataValue>>,
}

/// Metadata read from a video container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoMetadata {
    /// Number of audio/video tracks in the container
    pub track_count: usize,
    /// Container metadata, keys lower-cased
    pub tags: BTreeMap<String, MetadataValue>,
}

/// Metadata key correlating a video with its paired still
pub const CONTENT_IDENTIFIER_KEY: &str = "com.apple.quicktime.content.identifier";

/// Video metadata keys holding the creation date, in priority order
pub const CREATION_DATE_KEYS: &[&str] = &["com.apple.quicktime.creationdate", "creation_time", "date"];

/// Maker-note field holding the paired-capture identifier
pub const MAKER_NOTE_CONTENT_IDENTIFIER: &str = "17";

/// Container-specific reader state for a classified file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    Photo(PhotoMetadata),
    Video(VideoMetadata),
}

impl Container {
    pub fn kind(&self) -> MediaKind {
        match self {
            Container::Photo(_) => MediaKind::Photo,
            Container::Video(_) => MediaKind::Video,
        }
    }

    /// The embedded creation-date string, if the container carries one
    pub fn date_field(&self) -> Option<&str> {
        match self {
            Container::Photo(meta) => meta.date_time_original.as_deref(),
            Container::Video(meta) => CREATION_DATE_KEYS
                .iter()
                .find_map(|key| meta.tags.get(*key).and_then(MetadataValue::as_text)),
        }
    }

    /// The embedded collection identifier, if present and string-valued
    pub fn collection_identifier(&self) -> Option<&str> {
        match self {
            Container::Photo(meta) => meta
                .maker_note
                .as_ref()
                .and_then(|note| note.get(MAKER_NOTE_CONTENT_IDENTIFIER))
                .and_then(MetadataValue::as_text),
            Container::Video(meta) => meta
                .tags
                .get(CONTENT_IDENTIFIER_KEY)
                .and_then(MetadataValue::as_text),
        }
    }
}

/// A file that was recognized as a supported media container
#[derive(Debug, Clone)]
pub struct ClassifiedFile {
    pub path: PathBuf,
    pub container: Container,
}

impl ClassifiedFile {
    pub fn kind(&self) -> MediaKind {
        self.container.kind()
    }
}

/// Capability to open media containers and read their metadata.
///
/// Each method returns `None` when the file is not a container of that
/// kind. Implementations are shared by all workers of a sort run.
pub trait MetadataReader: Send + Sync {
    fn read_video(&self, path: &Path) -> Option<VideoMetadata>;

    fn read_photo(&self, path: &Path) -> Option<PhotoMetadata>;
}

/// Classify a file, returning `None` if no container kind recognizes it
pub fn classify(path: &Path, reader: &dyn MetadataReader) -> Option<ClassifiedFile> {
    if !path.is_file() {
        debug!(?path, "Not a regular file");
        return None;
    }

    if let Some(meta) = reader.read_video(path) {
        if meta.track_count > 0 {
            return Some(ClassifiedFile {
                path: path.to_path_buf(),
                container: Container::Video(meta),
            });
        }
        debug!(?path, "Video container has no media tracks");
    }

    reader.read_photo(path).map(|meta| ClassifiedFile {
        path: path.to_path_buf(),
        container: Container::Photo(meta),
    })
}

/// Metadata reader backed by ffprobe (videos) and kamadak-exif (photos)
#[derive(Debug, Clone)]
pub struct SystemMetadataReader {
    ffprobe: PathBuf,
}

impl SystemMetadataReader {
    pub fn new(ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    /// Whether the configured ffprobe binary can be executed
    pub fn video_support_available(&self) -> bool {
        video::is_ffprobe_available(&self.ffprobe)
    }
}

impl Default for SystemMetadataReader {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MetadataReader for SystemMetadataReader {
    fn read_video(&self, path: &Path) -> Option<VideoMetadata> {
        match video::probe_video(&self.ffprobe, path) {
            Ok(meta) => meta,
            Err(e) => {
                debug!(?path, error = %e, "Video probe failed");
                None
            }
        }
    }

    fn read_photo(&self, path: &Path) -> Option<PhotoMetadata> {
        exif::read_photo(path)
    }
}
