//! End-to-end tests for the sort engine
//!
//! Files are driven through a scripted metadata reader: each test file's
//! text describes the container it pretends to be.

use media_sorter::hash::digest_file;
use media_sorter::media::{
    CONTENT_IDENTIFIER_KEY, MAKER_NOTE_CONTENT_IDENTIFIER, MetadataValue, PhotoMetadata,
    VideoMetadata,
};
use media_sorter::time::file_creation_date;
use media_sorter::{
    Config, Error, FileStatus, Identifier, MetadataReader, SortCounters, SortEngine, SortReport,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

/// Reads container descriptions of the form:
///
/// ```text
/// photo | video | empty-video
/// date: 2024:07:04 10:15:30
/// id: PAIR-ID
/// ```
///
/// Anything else is unsupported.
struct ScriptedReader;

struct Script {
    kind: String,
    date: Option<String>,
    id: Option<String>,
}

fn read_script(path: &Path) -> Option<Script> {
    let text = fs::read_to_string(path).ok()?;
    let mut lines = text.lines();
    let kind = lines.next()?.trim().to_string();
    let mut script = Script {
        kind,
        date: None,
        id: None,
    };
    for line in lines {
        if let Some(date) = line.strip_prefix("date: ") {
            script.date = Some(date.to_string());
        } else if let Some(id) = line.strip_prefix("id: ") {
            script.id = Some(id.to_string());
        }
    }
    Some(script)
}

impl MetadataReader for ScriptedReader {
    fn read_video(&self, path: &Path) -> Option<VideoMetadata> {
        let script = read_script(path)?;
        let track_count = match script.kind.as_str() {
            "video" => 2,
            "empty-video" => 0,
            _ => return None,
        };

        let mut tags = BTreeMap::new();
        if let Some(date) = script.date {
            tags.insert("creation_time".to_string(), MetadataValue::Text(date));
        }
        if let Some(id) = script.id {
            tags.insert(CONTENT_IDENTIFIER_KEY.to_string(), MetadataValue::Text(id));
        }
        Some(VideoMetadata { track_count, tags })
    }

    fn read_photo(&self, path: &Path) -> Option<PhotoMetadata> {
        let script = read_script(path)?;
        if script.kind != "photo" {
            return None;
        }

        let maker_note = script.id.map(|id| {
            let mut note = BTreeMap::new();
            note.insert(
                MAKER_NOTE_CONTENT_IDENTIFIER.to_string(),
                MetadataValue::Text(id),
            );
            note
        });
        Some(PhotoMetadata {
            date_time_original: script.date,
            maker_note,
        })
    }
}

struct Fixture {
    _root: TempDir,
    source: PathBuf,
    destination: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("incoming");
        let destination = root.path().join("library");
        fs::create_dir(&source).unwrap();
        Self {
            _root: root,
            source,
            destination,
        }
    }

    fn add(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.source.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn engine(&self, config: Config) -> SortEngine {
        SortEngine::new(&config, Arc::new(ScriptedReader))
    }

    fn sort(&self) -> SortReport {
        self.sort_with(test_config())
    }

    fn sort_with(&self, config: Config) -> SortReport {
        self.engine(config)
            .sort(&self.source, &self.destination)
            .unwrap()
    }
}

fn test_config() -> Config {
    Config {
        threads: 4,
        ..Config::default()
    }
}

fn content_id(path: &Path) -> Identifier {
    Identifier::from_digest(&digest_file(path).unwrap())
}

#[test]
fn test_photo_lands_under_dated_hash_name() {
    let fx = Fixture::new();
    let source = fx.add("IMG_0001.JPG", "photo\ndate: 2024:07:04 10:15:30\n");
    let id = content_id(&source);

    let report = fx.sort();

    let expected = fx
        .destination
        .join("2024")
        .join("07")
        .join(format!("2024-07-04-10-15-30-{}.jpg", id));
    assert!(expected.is_file());
    assert!(!source.exists());
    assert_eq!(report.counters, SortCounters { photos: 1, videos: 0 });
    assert_eq!(report.outcomes[0].status, FileStatus::Relocated);
    assert_eq!(report.outcomes[0].destination.as_deref(), Some(expected.as_path()));
}

#[test]
fn test_paired_capture_shares_identifier() {
    let fx = Fixture::new();
    fx.add(
        "IMG_0002.HEIC",
        "photo\ndate: 2023:12:31 23:59:58\nid: 6E0E6F2F-1C5B-4C9A-9E6B-5A5D1E2C3B4A\n",
    );
    fx.add(
        "IMG_0002.MOV",
        "video\ndate: 2023-12-31T23:59:58.000000Z\nid: 6E0E6F2F-1C5B-4C9A-9E6B-5A5D1E2C3B4A\n",
    );

    let report = fx.sort();

    let month = fx.destination.join("2023").join("12");
    let stem = "2023-12-31-23-59-58-6E0E6F2F-1C5B-4C9A-9E6B-5A5D1E2C3B4A";
    assert!(month.join(format!("{}.heic", stem)).is_file());
    assert!(month.join(format!("{}.mov", stem)).is_file());
    assert_eq!(report.counters, SortCounters { photos: 1, videos: 1 });
}

#[test]
fn test_undated_file_keeps_name_in_unsorted() {
    let fx = Fixture::new();
    let source = fx.add("Scan 12.png", "photo\ndate: sometime last summer\n");

    let report = fx.sort();

    assert!(fx.destination.join("Unsorted").join("Scan 12.png").is_file());
    assert!(!source.exists());
    assert_eq!(report.counters.photos, 1);
}

#[test]
fn test_unsupported_and_trackless_files_stay_put() {
    let fx = Fixture::new();
    let notes = fx.add("notes.txt", "shopping list\n");
    let empty = fx.add("broken.mov", "empty-video\ndate: 2024:01:01 00:00:00\n");

    let report = fx.sort();

    assert!(notes.exists());
    assert!(empty.exists());
    assert_eq!(report.count(FileStatus::Unsupported), 2);
    assert_eq!(report.counters.total(), 0);
}

#[test]
fn test_hidden_entries_are_ignored() {
    let fx = Fixture::new();
    let ds_store = fx.add(".DS_Store", "photo\ndate: 2024:01:01 00:00:00\n");
    fx.add("a.jpg", "photo\ndate: 2024:01:01 00:00:00\n");

    let report = fx.sort();

    assert!(ds_store.exists());
    assert_eq!(report.outcomes.len(), 1);
    assert!(report.outcomes.iter().all(|o| o.source != ds_store));
    assert_eq!(report.counters.photos, 1);
}

#[test]
fn test_collision_leaves_second_file_untouched() {
    let fx = Fixture::new();
    let first = fx.add("first.jpg", "photo\ndate: 2022:02:02 02:02:02\nid: SAME\nfirst\n");
    let second = fx.add("second.jpg", "photo\ndate: 2022:02:02 02:02:02\nid: SAME\nsecond\n");

    let report = fx.sort();

    let target = fx
        .destination
        .join("2022")
        .join("02")
        .join("2022-02-02-02-02-02-SAME.jpg");
    assert!(target.is_file());
    assert_eq!(report.counters.photos, 1);
    assert_eq!(report.count(FileStatus::Relocated), 1);
    assert_eq!(report.count(FileStatus::Collision), 1);

    // Exactly one source is gone and the survivor is unchanged
    let survivors: Vec<&PathBuf> = [&first, &second].into_iter().filter(|p| p.exists()).collect();
    assert_eq!(survivors.len(), 1);
    let moved = fs::read_to_string(&target).unwrap();
    let kept = fs::read_to_string(survivors[0]).unwrap();
    assert_ne!(moved, kept);
}

#[test]
fn test_rerun_over_copies_only_collides() {
    let fx = Fixture::new();
    let files = [
        ("a.jpg", "photo\ndate: 2021:05:06 07:08:09\n"),
        ("b.mov", "video\ndate: 2021-05-06T07:08:10Z\n"),
        ("c.png", "photo\n"),
    ];
    for (name, contents) in files {
        fx.add(name, contents);
    }
    let first = fx.sort();
    assert_eq!(first.counters, SortCounters { photos: 2, videos: 1 });

    let snapshot = |dir: &Path| -> Vec<(PathBuf, Vec<u8>)> {
        let mut all: Vec<_> = walk(dir).into_iter().map(|p| {
            let bytes = fs::read(&p).unwrap();
            (p, bytes)
        }).collect();
        all.sort();
        all
    };
    let before = snapshot(&fx.destination);

    for (name, contents) in files {
        fx.add(name, contents);
    }
    let second = fx.sort();

    assert_eq!(second.count(FileStatus::Collision), 3);
    assert_eq!(second.counters.total(), 0);
    assert_eq!(snapshot(&fx.destination), before);
    for (name, _) in files {
        assert!(fx.source.join(name).exists());
    }
}

#[test]
fn test_same_bytes_different_names_map_to_same_destination() {
    let contents = "photo\ndate: 2020:10:11 12:13:14\n";

    let fx1 = Fixture::new();
    fx1.add("DSC_1234.JPG", contents);
    let report1 = fx1.sort();

    let fx2 = Fixture::new();
    fx2.add("holiday copy (2).jpeg", contents);
    let report2 = fx2.sort();

    let relative = |fx: &Fixture, report: &SortReport| {
        report.outcomes[0]
            .destination
            .as_ref()
            .unwrap()
            .strip_prefix(&fx.destination)
            .unwrap()
            .with_extension("")
    };
    assert_eq!(relative(&fx1, &report1), relative(&fx2, &report2));
}

#[test]
fn test_concurrent_counting_is_exact() {
    for round in 0..5 {
        let fx = Fixture::new();
        let mut expected = SortCounters::default();

        for i in 0..120 {
            // Three months so many workers race to create the same folders
            let month = i % 3 + 1;
            if i % 4 == 0 {
                fx.add(
                    &format!("clip_{:03}.mp4", i),
                    &format!("video\ndate: 2019-{:02}-01T00:00:00Z\n{}-{}\n", month, round, i),
                );
                expected.videos += 1;
            } else {
                fx.add(
                    &format!("img_{:03}.jpg", i),
                    &format!("photo\ndate: 2019:{:02}:01 00:00:00\n{}-{}\n", month, round, i),
                );
                expected.photos += 1;
            }
        }
        fx.add("readme.txt", "not media");

        let report = fx.sort_with(Config {
            threads: 3,
            ..Config::default()
        });

        assert_eq!(report.counters, expected);
        assert_eq!(report.count(FileStatus::Relocated), expected.total());
        assert_eq!(walk(&fx.destination).len(), expected.total());
    }
}

#[test]
fn test_dry_run_touches_nothing() {
    let fx = Fixture::new();
    let source = fx.add("a.jpg", "photo\ndate: 2024:02:29 12:00:00\n");

    let report = fx.sort_with(Config {
        dry_run: true,
        ..test_config()
    });

    assert!(source.exists());
    assert!(!fx.destination.exists());
    assert_eq!(report.count(FileStatus::Planned), 1);
    assert_eq!(report.counters.total(), 0);
}

#[test]
fn test_dry_run_matches_real_run_on_shared_target() {
    let fx = Fixture::new();
    fx.add("first.jpg", "photo\ndate: 2022:02:02 02:02:02\nid: SAME\nfirst\n");
    fx.add("second.jpg", "photo\ndate: 2022:02:02 02:02:02\nid: SAME\nsecond\n");

    let dry = fx.sort_with(Config {
        dry_run: true,
        ..test_config()
    });
    assert_eq!(dry.count(FileStatus::Planned), 1);
    assert_eq!(dry.count(FileStatus::Collision), 1);
    assert_eq!(dry.counters.total(), 0);

    let real = fx.sort();
    assert_eq!(real.count(FileStatus::Relocated), 1);
    assert_eq!(real.count(FileStatus::Collision), 1);
    assert_eq!(real.counters.photos, 1);
}

#[test]
fn test_overlapping_runs_keep_separate_counts() {
    let photos = Fixture::new();
    let videos = Fixture::new();
    for i in 0..150 {
        photos.add(
            &format!("img_{:03}.jpg", i),
            &format!("photo\ndate: 2018:03:04 05:06:07\nphoto-{}\n", i),
        );
        videos.add(
            &format!("clip_{:03}.mov", i),
            &format!("video\ndate: 2018-03-04T05:06:07Z\nvideo-{}\n", i),
        );
    }

    let engine = Arc::new(SortEngine::new(&test_config(), Arc::new(ScriptedReader)));
    let (photo_report, video_report) = thread::scope(|scope| {
        let first = scope.spawn(|| engine.sort(&photos.source, &photos.destination).unwrap());
        let second = scope.spawn(|| engine.sort(&videos.source, &videos.destination).unwrap());
        (first.join().unwrap(), second.join().unwrap())
    });

    assert_eq!(photo_report.counters, SortCounters { photos: 150, videos: 0 });
    assert_eq!(video_report.counters, SortCounters { photos: 0, videos: 150 });
    assert_eq!(photo_report.count(FileStatus::Relocated), 150);
    assert_eq!(video_report.count(FileStatus::Relocated), 150);
}

#[test]
fn test_cancelled_run_processes_nothing() {
    let fx = Fixture::new();
    let source = fx.add("a.jpg", "photo\ndate: 2024:02:29 12:00:00\n");

    let engine = fx.engine(test_config());
    engine.cancel_handle().cancel();
    let report = engine.sort(&fx.source, &fx.destination).unwrap();

    assert!(report.cancelled);
    assert!(source.exists());
    assert_eq!(report.count(FileStatus::Cancelled), 1);
    assert_eq!(report.counters.total(), 0);
}

#[test]
fn test_cancellation_is_cleared_after_the_run() {
    let fx = Fixture::new();
    let source = fx.add("a.jpg", "photo\ndate: 2024:02:29 12:00:00\n");

    let engine = fx.engine(test_config());
    engine.cancel_handle().cancel();
    let cancelled = engine.sort(&fx.source, &fx.destination).unwrap();
    assert!(cancelled.cancelled);
    assert!(source.exists());

    let resumed = engine.sort(&fx.source, &fx.destination).unwrap();
    assert!(!resumed.cancelled);
    assert_eq!(resumed.count(FileStatus::Relocated), 1);
    assert!(!source.exists());
}

#[test]
fn test_file_creation_time_is_last_date_source() {
    let script = "photo\ndate: unknown\n";

    let without = Fixture::new();
    without.add("undated.jpg", script);
    let report = without.sort();
    assert_eq!(
        report.outcomes[0].destination.as_deref(),
        Some(without.destination.join("Unsorted").join("undated.jpg").as_path())
    );

    let with = Fixture::new();
    let source = with.add("undated.jpg", script);
    let expected_dir = match file_creation_date(&source) {
        Some(date) => with
            .destination
            .join(format!("{:04}", date.year.unwrap()))
            .join(format!("{:02}", date.month.unwrap())),
        // No birth time on this file system, so still undated
        None => with.destination.join("Unsorted"),
    };

    let report = with.sort_with(Config {
        use_file_creation_time: true,
        ..test_config()
    });

    let destination = report.outcomes[0].destination.clone().unwrap();
    assert_eq!(destination.parent(), Some(expected_dir.as_path()));
    assert!(destination.is_file());
}

/// Recognizes files like [`ScriptedReader`], then deletes them before they
/// can be hashed or moved
struct VanishingReader;

impl MetadataReader for VanishingReader {
    fn read_video(&self, path: &Path) -> Option<VideoMetadata> {
        ScriptedReader.read_video(path)
    }

    fn read_photo(&self, path: &Path) -> Option<PhotoMetadata> {
        let meta = ScriptedReader.read_photo(path)?;
        fs::remove_file(path).unwrap();
        Some(meta)
    }
}

#[test]
fn test_unhashable_file_gets_sentinel_identifier() {
    let fx = Fixture::new();
    fx.add("gone.JPG", "photo\ndate: 2017:08:09 10:11:12\n");

    let engine = SortEngine::new(&test_config(), Arc::new(VanishingReader));
    let report = engine.sort(&fx.source, &fx.destination).unwrap();

    let target = fx
        .destination
        .join("2017")
        .join("08")
        .join("2017-08-09-10-11-12-00000000-0000-0000-0000-000000000000.jpg");
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.destination.as_deref(), Some(target.as_path()));
    // The move itself fails and its reservation is released
    assert_eq!(outcome.status, FileStatus::Failed);
    assert!(!target.exists());
    assert_eq!(report.counters.total(), 0);
}

#[test]
fn test_missing_source_is_configuration_error() {
    let fx = Fixture::new();
    let engine = fx.engine(test_config());

    let err = engine
        .sort(&fx.source.join("nope"), &fx.destination)
        .unwrap_err();
    assert!(matches!(err, Error::SourceNotDirectory { .. }));
    assert!(!fx.destination.exists());
}

#[test]
fn test_destination_file_is_configuration_error() {
    let fx = Fixture::new();
    let source = fx.add("a.jpg", "photo\ndate: 2024:02:29 12:00:00\n");
    fs::write(&fx.destination, b"i am a file").unwrap();

    let err = fx
        .engine(test_config())
        .sort(&fx.source, &fx.destination)
        .unwrap_err();

    assert!(matches!(err, Error::DestinationNotDirectory { .. }));
    assert!(source.exists());
}

/// All regular files below `dir`
fn walk(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(walk(&path));
        } else {
            files.push(path);
        }
    }
    files
}
