//! Still-image recognition and EXIF metadata extraction

use crate::media::{MetadataValue, PhotoMetadata};
use exif::{In, Reader, Tag, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, trace};

/// Number of leading bytes needed to recognize a container
const SNIFF_LEN: u64 = 16;

/// `ftyp` brands of ISO base media files that hold still images
const STILL_IMAGE_BRANDS: &[&[u8; 4]] = &[
    b"heic", b"heix", b"hevc", b"heim", b"heis", b"hevm", b"mif1", b"msf1", b"avif", b"avis",
    b"crx ",
];

/// Header of Apple's maker note
const APPLE_MAKER_NOTE_HEADER: &[u8] = b"Apple iOS\0";

/// Offset of the byte-order mark inside Apple's maker note
const APPLE_BYTE_ORDER_OFFSET: usize = 12;

/// Offset of the IFD entry count inside Apple's maker note
const APPLE_IFD_OFFSET: usize = 14;

/// Read still-image metadata, or `None` if the file is not a still image
pub fn read_photo(path: &Path) -> Option<PhotoMetadata> {
    let header = read_header(path)?;
    if !is_still_image(&header) {
        return None;
    }

    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            debug!(?path, error = %e, "Image has no readable EXIF data");
            return Some(PhotoMetadata::default());
        }
    };

    let date_time_original = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .and_then(|field| match &field.value {
            Value::Ascii(parts) => parts
                .first()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        });

    let maker_note = exif
        .get_field(Tag::MakerNote, In::PRIMARY)
        .and_then(|field| match &field.value {
            Value::Undefined(bytes, _) => parse_apple_maker_note(bytes),
            _ => None,
        });

    trace!(?path, ?date_time_original, has_maker_note = maker_note.is_some(), "Read EXIF");
    Some(PhotoMetadata {
        date_time_original,
        maker_note,
    })
}

fn read_header(path: &Path) -> Option<Vec<u8>> {
    let file = File::open(path).ok()?;
    let mut header = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN).read_to_end(&mut header).ok()?;
    Some(header)
}

/// Recognize still-image containers by their leading bytes
fn is_still_image(header: &[u8]) -> bool {
    let starts = |magic: &[u8]| header.starts_with(magic);

    if starts(&[0xFF, 0xD8, 0xFF])
        || starts(b"\x89PNG\r\n\x1a\n")
        || starts(b"II*\0")
        || starts(b"MM\0*")
        || starts(b"IIRO")
        || starts(b"IIRS")
        || starts(b"MMOR")
        || starts(b"IIU\0")
        || starts(b"FUJIFILMCCD-RAW")
        || starts(b"GIF87a")
        || starts(b"GIF89a")
        || starts(b"BM")
    {
        return true;
    }

    if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP" {
        return true;
    }

    header.len() >= 12
        && &header[4..8] == b"ftyp"
        && STILL_IMAGE_BRANDS.iter().any(|brand| &header[8..12] == *brand)
}

/// Parse the IFD inside an Apple maker note into a tag-number dictionary
fn parse_apple_maker_note(data: &[u8]) -> Option<BTreeMap<String, MetadataValue>> {
    if !data.starts_with(APPLE_MAKER_NOTE_HEADER) {
        return None;
    }

    let big_endian = match data.get(APPLE_BYTE_ORDER_OFFSET..APPLE_IFD_OFFSET)? {
        b"MM" => true,
        b"II" => false,
        _ => return None,
    };

    let read_u16 = |offset: usize| -> Option<u16> {
        let bytes: [u8; 2] = data.get(offset..offset + 2)?.try_into().ok()?;
        Some(if big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    };
    let read_u32 = |offset: usize| -> Option<u32> {
        let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
        Some(if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    };

    let count = read_u16(APPLE_IFD_OFFSET)? as usize;
    let mut fields = BTreeMap::new();

    for index in 0..count {
        let entry = APPLE_IFD_OFFSET + 2 + index * 12;
        let (Some(tag), Some(field_type), Some(len)) =
            (read_u16(entry), read_u16(entry + 2), read_u32(entry + 4))
        else {
            break;
        };
        let len = len as usize;

        let value = match (field_type, len) {
            // ASCII, stored inline when it fits in four bytes
            (2, _) => {
                let bytes = if len <= 4 {
                    data.get(entry + 8..entry + 8 + len)
                } else {
                    read_u32(entry + 8)
                        .map(|offset| offset as usize)
                        .and_then(|offset| data.get(offset..offset + len))
                };
                match bytes {
                    Some(bytes) => {
                        let text = String::from_utf8_lossy(bytes);
                        MetadataValue::Text(text.trim_end_matches('\0').to_string())
                    }
                    None => MetadataValue::Other,
                }
            }
            (3, 1) => read_u16(entry + 8)
                .map(|v| MetadataValue::Number(v as i64))
                .unwrap_or(MetadataValue::Other),
            (4, 1) => read_u32(entry + 8)
                .map(|v| MetadataValue::Number(v as i64))
                .unwrap_or(MetadataValue::Other),
            (9, 1) => read_u32(entry + 8)
                .map(|v| MetadataValue::Number(v as i32 as i64))
                .unwrap_or(MetadataValue::Other),
            _ => MetadataValue::Other,
        };

        fields.insert(tag.to_string(), value);
    }

    Some(fields)
}
