//! Video container probing via FFprobe

use crate::error::{Error, Result};
use crate::media::{MetadataValue, VideoMetadata};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing::{debug, trace};

/// Demuxer names FFprobe reports for still images
const STILL_IMAGE_FORMATS: &[&str] = &["image2", "gif", "apng", "webp"];

/// ISO base media brands used by still-image containers (HEIF/AVIF)
const STILL_IMAGE_BRANDS: &[&str] = &["heic", "heix", "heim", "heis", "mif1", "msf1", "avif", "avis"];

/// Cached FFprobe availability, per executable path
static FFPROBE_AVAILABLE: OnceLock<Mutex<HashMap<PathBuf, bool>>> = OnceLock::new();

/// Check if the given ffprobe executable can be run (cached for the process)
pub fn is_ffprobe_available(ffprobe: &Path) -> bool {
    let mut cache = FFPROBE_AVAILABLE
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    *cache.entry(ffprobe.to_path_buf()).or_insert_with(|| {
        let available = Command::new(ffprobe).arg("-version").output().is_ok();
        debug!(?ffprobe, available, "Checked FFprobe availability");
        available
    })
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    format_name: String,
    #[serde(default)]
    tags: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, serde_json::Value>,
}

/// Probe a file as a video container.
///
/// Returns `Ok(None)` when FFprobe does not recognize the file or recognizes
/// it as a still image.
pub fn probe_video(ffprobe: &Path, path: &Path) -> Result<Option<VideoMetadata>> {
    if !is_ffprobe_available(ffprobe) {
        return Err(Error::FfprobeNotFound);
    }

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| Error::VideoMetadata {
            path: path.to_path_buf(),
            message: format!("Failed to execute ffprobe: {}", e),
        })?;

    if !output.status.success() {
        trace!(?path, "FFprobe did not recognize file");
        return Ok(None);
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    trace!(?path, "FFprobe output: {}", json_str);

    let meta = parse_probe_output(&json_str)?;
    if let Some(ref meta) = meta {
        debug!(?path, tracks = meta.track_count, "Recognized video container");
    }
    Ok(meta)
}

/// Turn FFprobe JSON into video metadata, or `None` for still images
fn parse_probe_output(json: &str) -> Result<Option<VideoMetadata>> {
    let probe: ProbeOutput = serde_json::from_str(json)?;

    let Some(format) = probe.format else {
        return Ok(None);
    };

    if is_still_image(&format) {
        return Ok(None);
    }

    let track_count = probe
        .streams
        .iter()
        .filter(|s| matches!(s.codec_type.as_deref(), Some("video") | Some("audio")))
        .count();

    // Stream tags first so format-level tags win on conflicts
    let mut tags = BTreeMap::new();
    for stream in &probe.streams {
        insert_tags(&mut tags, &stream.tags);
    }
    insert_tags(&mut tags, &format.tags);

    Ok(Some(VideoMetadata { track_count, tags }))
}

fn is_still_image(format: &ProbeFormat) -> bool {
    let by_demuxer = format.format_name.split(',').any(|name| {
        let name = name.trim();
        STILL_IMAGE_FORMATS.contains(&name) || name.ends_with("_pipe")
    });

    let by_brand = format
        .tags
        .get("major_brand")
        .and_then(|v| v.as_str())
        .map(|brand| STILL_IMAGE_BRANDS.contains(&brand.trim()))
        .unwrap_or(false);

    by_demuxer || by_brand
}

fn insert_tags(
    target: &mut BTreeMap<String, MetadataValue>,
    source: &BTreeMap<String, serde_json::Value>,
) {
    for (key, value) in source {
        let value = match value {
            serde_json::Value::String(s) => MetadataValue::Text(s.clone()),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(MetadataValue::Number)
                .unwrap_or(MetadataValue::Other),
            _ => MetadataValue::Other,
        };
        target.insert(key.to_lowercase(), value);
    }
}
