//! Sort engine with Rayon parallel processing
//!
//! Handles the core logic of:
//! - Validating the source and destination directories
//! - Listing the source directory (top level only, hidden entries skipped)
//! - Running the per-file pipeline on a bounded worker pool
//! - Relocating files without ever overwriting an existing destination
//!
//! Workers share the engine's directory lock, which serializes creation of
//! missing destination directories, and the state of their own run: the
//! photo/video counters and, in dry runs, the destinations already planned.
//! No lock is held while hashing or moving files.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::identity::resolve_identity;
use crate::media::{MediaKind, MetadataReader, classify};
use crate::naming::{destination_subpath, final_filename};
use crate::time::resolve_date;

use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{Level, debug, error, info, span, warn};
use walkdir::WalkDir;

/// Number of files relocated per media kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortCounters {
    pub photos: usize,
    pub videos: usize,
}

impl SortCounters {
    pub fn total(&self) -> usize {
        self.photos + self.videos
    }

    fn record(&mut self, kind: MediaKind) {
        match kind {
            MediaKind::Photo => self.photos += 1,
            MediaKind::Video => self.videos += 1,
        }
    }
}

/// State shared by the workers of one run
#[derive(Default)]
struct RunState {
    counters: Mutex<SortCounters>,
    /// Destinations claimed by planned moves (dry run only)
    planned: Mutex<HashSet<PathBuf>>,
}

impl RunState {
    fn record(&self, kind: MediaKind) {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(kind);
    }

    /// Claim `target` for a planned move; false if another file has it
    fn claim(&self, target: &Path) -> bool {
        self.planned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(target.to_path_buf())
    }
}

/// Status of a single source entry after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// File was moved to its destination
    Relocated,
    /// Dry run - would have been moved
    Planned,
    /// Not a recognized photo or video container
    Unsupported,
    /// Destination already exists; source left in place
    Collision,
    /// Directory creation or the move itself failed
    Failed,
    /// Run was cancelled before this entry started
    Cancelled,
}

/// Result of processing a single source entry
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Source file path
    pub source: PathBuf,
    /// Media kind, once classified
    pub kind: Option<MediaKind>,
    /// Destination file path, once synthesized
    pub destination: Option<PathBuf>,
    /// Processing status
    pub status: FileStatus,
    /// Error message (if failed)
    pub error: Option<String>,
}

impl FileOutcome {
    fn new(source: &Path, status: FileStatus) -> Self {
        Self {
            source: source.to_path_buf(),
            kind: None,
            destination: None,
            status,
            error: None,
        }
    }
}

/// Aggregate result of a sort run
#[derive(Debug, Clone)]
pub struct SortReport {
    /// Files actually relocated, per kind (always zero in a dry run)
    pub counters: SortCounters,
    pub outcomes: Vec<FileOutcome>,
    /// Whether the run was cancelled before every entry was dispatched
    pub cancelled: bool,
}

impl SortReport {
    /// Number of entries that ended with the given status
    pub fn count(&self, status: FileStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Cloneable handle that stops a running sort from starting new files
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Sorts the top level of a source directory into a dated destination tree
pub struct SortEngine {
    reader: Arc<dyn MetadataReader>,
    use_file_creation_time: bool,
    dry_run: bool,
    workers: usize,
    directory_lock: Mutex<()>,
    cancel: CancelHandle,
}

impl SortEngine {
    pub fn new(config: &Config, reader: Arc<dyn MetadataReader>) -> Self {
        Self {
            reader,
            use_file_creation_time: config.use_file_creation_time,
            dry_run: config.dry_run,
            workers: config.worker_count(),
            directory_lock: Mutex::new(()),
            cancel: CancelHandle::default(),
        }
    }

    /// Handle for cancelling runs of this engine from another thread.
    ///
    /// A cancellation applies to the runs in progress (or the next one to
    /// start) and is cleared when that run returns.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Sort every entry of `source` into `destination`.
    ///
    /// Returns once every dispatched file has been processed. Configuration
    /// errors are reported before any file is touched; per-file problems
    /// only show up in the report. Runs may overlap on one engine; each
    /// report only counts its own files.
    pub fn sort(&self, source: &Path, destination: &Path) -> Result<SortReport> {
        let result = self.run(source, destination);
        self.cancel.reset();
        result
    }

    fn run(&self, source: &Path, destination: &Path) -> Result<SortReport> {
        let _span = span!(Level::INFO, "sort_run", ?source, ?destination).entered();

        debug!("Validating directories");
        self.validate(source, destination)?;

        info!("Scanning source directory...");
        let entries = scan_source(source)?;
        info!(count = entries.len(), "Found source entries");

        let state = RunState::default();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;

        info!(workers = self.workers, dry_run = self.dry_run, "Processing files...");
        let outcomes: Vec<FileOutcome> = pool.install(|| {
            entries
                .par_iter()
                .map(|path| self.process_entry(path, destination, &state))
                .collect()
        });

        // Every task has joined; the counters are final
        let counters = *state.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let cancelled = outcomes.iter().any(|o| o.status == FileStatus::Cancelled);

        info!(
            photos = counters.photos,
            videos = counters.videos,
            cancelled,
            "Sort complete"
        );

        Ok(SortReport {
            counters,
            outcomes,
            cancelled,
        })
    }

    fn validate(&self, source: &Path, destination: &Path) -> Result<()> {
        if !source.is_dir() {
            return Err(Error::SourceNotDirectory {
                path: source.to_path_buf(),
            });
        }

        if destination.exists() {
            if !destination.is_dir() {
                return Err(Error::DestinationNotDirectory {
                    path: destination.to_path_buf(),
                });
            }
        } else if !self.dry_run {
            fs::create_dir_all(destination).map_err(|e| Error::DestinationCreate {
                path: destination.to_path_buf(),
                source: e,
            })?;
            info!(?destination, "Created destination directory");
        }

        Ok(())
    }

    /// Run the full pipeline for one source entry
    fn process_entry(&self, source: &Path, destination_root: &Path, run: &RunState) -> FileOutcome {
        if self.cancel.is_cancelled() {
            return FileOutcome::new(source, FileStatus::Cancelled);
        }

        let _file_span = span!(Level::DEBUG, "sort_file", ?source).entered();

        let Some(file) = classify(source, self.reader.as_ref()) else {
            warn!(?source, "Unsupported file format, skipping");
            return FileOutcome::new(source, FileStatus::Unsupported);
        };
        let kind = file.kind();

        let date = resolve_date(&file, self.use_file_creation_time);
        let directory = destination_root.join(destination_subpath(date.as_ref()));

        if !self.dry_run
            && let Err(e) = self.ensure_directory(&directory)
        {
            error!(?source, ?directory, error = %e, "Failed to create destination directory");
            return FileOutcome {
                kind: Some(kind),
                error: Some(e.to_string()),
                ..FileOutcome::new(source, FileStatus::Failed)
            };
        }

        let id = resolve_identity(&file);
        let target = directory.join(final_filename(source, date.as_ref(), &id));

        let status = if self.dry_run {
            plan(source, &target, kind, run)
        } else {
            match relocate(source, &target) {
                Ok(()) => {
                    run.record(kind);
                    info!(%kind, ?source, destination = ?target, "Relocated file");
                    FileStatus::Relocated
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!(?source, destination = ?target, "Destination already exists, skipping");
                    FileStatus::Collision
                }
                Err(e) => {
                    error!(?source, destination = ?target, error = %e, "Failed to relocate file");
                    return FileOutcome {
                        kind: Some(kind),
                        destination: Some(target),
                        error: Some(e.to_string()),
                        ..FileOutcome::new(source, FileStatus::Failed)
                    };
                }
            }
        };

        FileOutcome {
            kind: Some(kind),
            destination: Some(target),
            ..FileOutcome::new(source, status)
        }
    }

    /// Create `directory` if missing.
    ///
    /// The existence check runs unlocked; only workers that find the
    /// directory missing queue up on the lock.
    fn ensure_directory(&self, directory: &Path) -> io::Result<()> {
        if directory.is_dir() {
            return Ok(());
        }

        let _guard = self
            .directory_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !directory.is_dir() {
            fs::create_dir_all(directory)?;
            debug!(?directory, "Created destination directory");
        }
        Ok(())
    }
}

/// List the top level of the source directory, skipping hidden entries
fn scan_source(source: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(source)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        entries.push(entry.into_path());
    }

    Ok(entries)
}

/// Dry-run counterpart of relocation.
///
/// Nothing is counted; a target that exists on disk or was already planned
/// for another file of the run is a collision.
fn plan(source: &Path, target: &Path, kind: MediaKind, run: &RunState) -> FileStatus {
    if target.exists() {
        warn!(?source, destination = ?target, "Destination already exists, would skip");
        return FileStatus::Collision;
    }

    if !run.claim(target) {
        warn!(?source, destination = ?target, "Destination already planned for another file, would skip");
        return FileStatus::Collision;
    }

    info!(%kind, ?source, destination = ?target, "Would relocate file");
    FileStatus::Planned
}

/// Move `source` to `target` unless `target` already exists.
///
/// The target name is claimed with an exclusive create first, so two
/// workers racing for the same name cannot both win. The rename then
/// replaces the empty placeholder.
fn relocate(source: &Path, target: &Path) -> io::Result<()> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)?;

    if let Err(e) = fs::rename(source, target) {
        if let Err(cleanup) = fs::remove_file(target) {
            warn!(destination = ?target, error = %cleanup, "Failed to release destination reservation");
        }
        return Err(e);
    }

    Ok(())
}
