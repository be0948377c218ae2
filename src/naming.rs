//! Destination path synthesis
//!
//! Dated files go to `YYYY/MM/` and are renamed to
//! `YYYY-MM-DD-hh-mm-ss-<identifier>.<ext>`. Undated files go to
//! `Unsorted/` and keep their original name, which is the only
//! distinguishing information left for them.

use crate::identity::Identifier;
use crate::time::DateComponents;
use std::path::{Path, PathBuf};

/// Folder for files without a known date
pub const UNSORTED_DIR: &str = "Unsorted";

/// Subdirectory of the destination root for a file
pub fn destination_subpath(date: Option<&DateComponents>) -> PathBuf {
    match date {
        Some(date) => {
            let mut subpath = PathBuf::from(format!("{:04}", date.year.unwrap_or(0)));
            subpath.push(format!("{:02}", date.month.unwrap_or(0)));
            subpath
        }
        None => PathBuf::from(UNSORTED_DIR),
    }
}

/// Final file name for a file inside its destination subdirectory
pub fn final_filename(original: &Path, date: Option<&DateComponents>, id: &Identifier) -> String {
    let Some(date) = date else {
        return original
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
    };

    let stem = format!(
        "{:04}-{:02}-{:02}-{:02}-{:02}-{:02}-{}",
        date.year.unwrap_or(0),
        date.month.unwrap_or(0),
        date.day.unwrap_or(0),
        date.hour.unwrap_or(0),
        date.minute.unwrap_or(0),
        date.second.unwrap_or(0),
        id
    );

    match original.extension() {
        Some(ext) => format!("{}.{}", stem, ext.to_string_lossy().to_lowercase()),
        None => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashed_id() -> Identifier {
        let mut digest = [0xABu8; 32];
        digest[0] = 0x01;
        Identifier::from_digest(&digest)
    }

    #[test]
    fn test_dated_subpath() {
        let date = DateComponents::new(2024, 7, 4, 10, 15, 30);
        assert_eq!(destination_subpath(Some(&date)), Path::new("2024").join("07"));
    }

    #[test]
    fn test_undated_subpath() {
        assert_eq!(destination_subpath(None), PathBuf::from("Unsorted"));
    }

    #[test]
    fn test_dated_filename_lowercases_extension() {
        let date = DateComponents::new(2024, 7, 4, 10, 15, 30);
        let name = final_filename(Path::new("/src/IMG_0001.JPG"), Some(&date), &hashed_id());
        assert_eq!(
            name,
            "2024-07-04-10-15-30-01ABABAB-ABAB-ABAB-ABAB-ABABABABABAB.jpg"
        );
    }

    #[test]
    fn test_missing_fields_format_as_zero() {
        let date = DateComponents {
            year: Some(987),
            month: Some(3),
            day: Some(9),
            ..Default::default()
        };
        assert_eq!(destination_subpath(Some(&date)), Path::new("0987").join("03"));

        let name = final_filename(Path::new("clip.MOV"), Some(&date), &Identifier::embedded("X"));
        assert_eq!(name, "0987-03-09-00-00-00-X.mov");
    }

    #[test]
    fn test_undated_keeps_original_name() {
        let name = final_filename(Path::new("/src/Weird Name (1).Png"), None, &hashed_id());
        assert_eq!(name, "Weird Name (1).Png");
    }

    #[test]
    fn test_no_extension() {
        let date = DateComponents::new(2001, 2, 3, 4, 5, 6);
        let name = final_filename(Path::new("/src/RAWFILE"), Some(&date), &Identifier::sentinel());
        assert_eq!(name, "2001-02-03-04-05-06-00000000-0000-0000-0000-000000000000");
    }
}
