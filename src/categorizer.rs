//! Date-based categorization of a directory's top-level entries.
//!
//! A [`Categorizer`] validates its source and destination on construction and
//! then runs a fixed pipeline: snapshot the source, plan the date buckets,
//! build the destination skeleton, and transfer every entry into
//! `destination/OUTPUT/<date>/<name>`. Entries already present at their
//! destination are skipped and never counted.
//!
//! # Examples
//!
//! ```no_run
//! use datetidy::categorizer::{Categorizer, Mode};
//! use datetidy::progress::ProgressUpdate;
//!
//! let mut categorizer = Categorizer::new("/path/to/src", "/path/to/dst", Mode::Copy)?;
//! let report = categorizer.run(&mut |update: ProgressUpdate| {
//!     println!("{}% ({}/{})", update.progress, update.finished, update.total);
//! })?;
//! println!("Transferred {} entries", report.finished);
//! # Ok::<(), datetidy::CategorizeError>(())
//! ```

use crate::config::{AppConfig, CompiledFilters, ConfigError, validate_output_folder};
use crate::date_bucket::{BucketKey, DateBucketer};
use crate::error::{CategorizeError, CategorizeResult};
use crate::progress::{ProgressObserver, ProgressTracker};
use crate::transfer::{
    EntryKind, TransferRecord, serialize_path, serialize_paths, transfer_entry,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Name of the folder created inside the destination to hold the buckets.
pub const DEFAULT_OUTPUT_FOLDER: &str = "OUTPUT";

/// Whether entries are copied or moved into their buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Copy,
    Move,
}

impl Mode {
    /// Selects a mode by ordinal: 0 is copy, 1 is move.
    pub fn from_ordinal(ordinal: i64) -> CategorizeResult<Self> {
        match ordinal {
            0 => Ok(Mode::Copy),
            1 => Ok(Mode::Move),
            other => Err(CategorizeError::InvalidMode {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Copy => f.write_str("copy"),
            Mode::Move => f.write_str("move"),
        }
    }
}

impl FromStr for Mode {
    type Err = CategorizeError;

    /// Accepts an ordinal (`0`, `1`) or a name (`copy`, `move`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(ordinal) = trimmed.parse::<i64>() {
            return Self::from_ordinal(ordinal);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "copy" => Ok(Mode::Copy),
            "move" => Ok(Mode::Move),
            _ => Err(CategorizeError::InvalidMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Stage of a categorization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Validating,
    Planning,
    BuildingSkeleton,
    Transferring,
    Completed,
    Failed,
}

/// The immediate children of the source directory, taken once before any transfer.
///
/// Names are kept as the OS returned them, so entries whose names are not
/// valid UTF-8 can still be found again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Subdirectory names, sorted.
    pub directories: Vec<OsString>,
    /// File names, sorted.
    pub files: Vec<OsString>,
}

impl Snapshot {
    /// Iterates directories first, then files.
    pub fn entries(&self) -> impl Iterator<Item = (&OsStr, EntryKind)> {
        self.directories
            .iter()
            .map(|name| (name.as_os_str(), EntryKind::Directory))
            .chain(
                self.files
                    .iter()
                    .map(|name| (name.as_os_str(), EntryKind::File)),
            )
    }

    pub fn len(&self) -> usize {
        self.directories.len() + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where one snapshot entry is headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub name: OsString,
    pub kind: EntryKind,
    pub bucket: BucketKey,
    /// The destination already exists; the entry will be skipped.
    pub already_present: bool,
}

/// The outcome of planning: buckets to create and entries to transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Every snapshot entry, directories first.
    pub entries: Vec<PlannedEntry>,
    /// Distinct bucket keys in first-seen order.
    pub buckets: Vec<BucketKey>,
    /// Entries whose destination does not exist yet.
    pub total: usize,
}

impl Plan {
    /// Entries that will actually be transferred.
    pub fn pending(&self) -> impl Iterator<Item = &PlannedEntry> {
        self.entries.iter().filter(|entry| !entry.already_present)
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: Mode,
    #[serde(serialize_with = "serialize_path")]
    pub source: PathBuf,
    #[serde(serialize_with = "serialize_path")]
    pub target: PathBuf,
    pub total: usize,
    pub finished: usize,
    pub progress: u8,
    pub buckets: Vec<BucketKey>,
    pub transfers: Vec<TransferRecord>,
    /// Source entries left alone because their destination already existed.
    #[serde(serialize_with = "serialize_paths")]
    pub skipped: Vec<PathBuf>,
}

/// Sorts the top-level entries of a source directory into date buckets.
#[derive(Debug, Clone)]
pub struct Categorizer {
    mode: Mode,
    source: PathBuf,
    destination: PathBuf,
    output_folder: String,
    target: PathBuf,
    bucketer: DateBucketer,
    filters: CompiledFilters,
    state: RunState,
}

impl Categorizer {
    /// Validates the source and destination and prepares a run.
    ///
    /// # Errors
    ///
    /// Returns `SourceMissing`, `SourceNotDirectory`, `DestinationMissing` or
    /// `DestinationNotDirectory`. Nothing on disk is modified.
    pub fn new(
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        mode: Mode,
    ) -> CategorizeResult<Self> {
        let source = validate_source(source.as_ref())?;
        let destination = validate_destination(destination.as_ref())?;
        let target = destination.join(DEFAULT_OUTPUT_FOLDER);

        Ok(Self {
            mode,
            source,
            destination,
            output_folder: DEFAULT_OUTPUT_FOLDER.to_string(),
            target,
            bucketer: DateBucketer::default(),
            filters: CompiledFilters::allow_all(),
            state: RunState::Validating,
        })
    }

    /// Like [`Categorizer::new`], selecting the mode by ordinal (0 copy, 1 move).
    ///
    /// The ordinal is checked before the paths are looked at.
    pub fn from_ordinal(
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        ordinal: i64,
    ) -> CategorizeResult<Self> {
        let mode = Mode::from_ordinal(ordinal)?;
        Self::new(source, destination, mode)
    }

    /// Builds a categorizer from loaded configuration.
    ///
    /// `mode` overrides the configured default when given.
    pub fn from_config(
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        mode: Option<Mode>,
        config: &AppConfig,
    ) -> CategorizeResult<Self> {
        let mode = mode.unwrap_or(config.categorizer.mode);
        let bucketer = config.categorizer.bucketer()?;
        let filters = CompiledFilters::new(&config.filters)?;

        Ok(Self::new(source, destination, mode)?
            .with_bucketer(bucketer)
            .with_filters(filters)
            .with_output_folder(&config.categorizer.output_folder)?)
    }

    /// Uses a different output folder name than `OUTPUT`.
    pub fn with_output_folder(mut self, name: &str) -> Result<Self, ConfigError> {
        let name = validate_output_folder(name)?;
        self.output_folder = name.to_string();
        self.target = self.destination.join(name);
        Ok(self)
    }

    pub fn with_bucketer(mut self, bucketer: DateBucketer) -> Self {
        self.bucketer = bucketer;
        self
    }

    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The folder the buckets are created in: `destination/OUTPUT`.
    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Lists the immediate children of the source directory.
    ///
    /// The output folder is left out when it lives inside the source and is the
    /// very folder the run writes to. Entries rejected by the filters are left out too.
    pub fn snapshot(&self) -> CategorizeResult<Snapshot> {
        let entries = fs::read_dir(&self.source).map_err(|e| CategorizeError::ReadDirFailed {
            path: self.source.clone(),
            source: e,
        })?;

        let mut snapshot = Snapshot::default();
        for entry in entries {
            let entry = entry.map_err(|e| CategorizeError::ReadDirFailed {
                path: self.source.clone(),
                source: e,
            })?;
            let name = entry.file_name();

            if !self.filters.should_include(&name.to_string_lossy()) {
                debug!(entry = %name.to_string_lossy(), "excluded by filters");
                continue;
            }

            let is_dir = match entry.file_type() {
                Ok(file_type) if file_type.is_symlink() => entry.path().is_dir(),
                Ok(file_type) => file_type.is_dir(),
                Err(e) => {
                    return Err(CategorizeError::MetadataFailed {
                        path: entry.path(),
                        source: e,
                    });
                }
            };

            if is_dir {
                if name == self.output_folder.as_str() && self.is_target(&entry.path()) {
                    debug!(path = %entry.path().display(), "skipping output folder inside source");
                    continue;
                }
                snapshot.directories.push(name);
            } else {
                snapshot.files.push(name);
            }
        }

        snapshot.directories.sort();
        snapshot.files.sort();
        debug!(
            directories = snapshot.directories.len(),
            files = snapshot.files.len(),
            "snapshot taken"
        );
        Ok(snapshot)
    }

    /// Computes the bucket of every snapshot entry and the set of buckets needed.
    ///
    /// # Errors
    ///
    /// Returns `CategorizeError::EntryNotFound` if an entry vanished since the snapshot.
    pub fn plan(&self, snapshot: &Snapshot) -> CategorizeResult<Plan> {
        let mut entries = Vec::with_capacity(snapshot.len());
        let mut buckets = Vec::new();
        let mut seen = HashSet::new();
        let mut total = 0;

        for (name, kind) in snapshot.entries() {
            let bucket = self.bucket_of(name)?;
            let already_present = self.destination_of(&bucket, name).exists();
            if !already_present {
                total += 1;
            }
            if seen.insert(bucket.clone()) {
                buckets.push(bucket.clone());
            }
            entries.push(PlannedEntry {
                name: name.to_os_string(),
                kind,
                bucket,
                already_present,
            });
        }

        debug!(total, buckets = buckets.len(), "plan computed");
        Ok(Plan {
            entries,
            buckets,
            total,
        })
    }

    /// Creates the output folder and one folder per planned bucket.
    ///
    /// Existing folders are left untouched.
    pub fn build_skeleton(&self, plan: &Plan) -> CategorizeResult<()> {
        create_dir_if_missing(&self.target)?;
        for bucket in &plan.buckets {
            create_dir_if_missing(&self.target.join(bucket))?;
        }
        Ok(())
    }

    /// Transfers every snapshot entry into its bucket, directories first.
    ///
    /// Each entry's creation time is read again here rather than taken from
    /// `plan`. Entries whose destination exists are skipped without a progress
    /// notification. The observer gets a final update with `completed` set.
    ///
    /// The first failure aborts the run; entries already transferred stay where
    /// they are.
    pub fn execute(
        &self,
        snapshot: &Snapshot,
        plan: &Plan,
        observer: &mut dyn ProgressObserver,
    ) -> CategorizeResult<RunReport> {
        let mut tracker = ProgressTracker::new(plan.total);
        let mut transfers = Vec::new();
        let mut skipped = Vec::new();

        for (name, kind) in snapshot.entries() {
            let original_path = self.source.join(name);
            let bucket = self.bucket_of(name)?;
            let new_path = self.destination_of(&bucket, name);

            if new_path.exists() {
                debug!(
                    entry = %name.to_string_lossy(),
                    destination = %new_path.display(),
                    "already present, skipping"
                );
                skipped.push(original_path);
                continue;
            }

            transfer_entry(self.mode, kind, &original_path, &new_path)?;
            info!(
                mode = %self.mode,
                from = %original_path.display(),
                to = %new_path.display(),
                "transferred"
            );

            let record = TransferRecord {
                original_path,
                new_path,
                bucket,
                kind,
            };
            observer.on_transfer(&record);
            transfers.push(record);

            observer.on_progress(tracker.record_finished());
        }

        let done = tracker.completion();
        observer.on_progress(done);

        Ok(RunReport {
            mode: self.mode,
            source: self.source.clone(),
            target: self.target.clone(),
            total: tracker.total(),
            finished: tracker.finished(),
            progress: done.progress,
            buckets: plan.buckets.clone(),
            transfers,
            skipped,
        })
    }

    /// Runs the whole pipeline: snapshot, plan, skeleton, transfer.
    ///
    /// The observer is told the plan size with an initial `(0, total, 0)` update
    /// before anything is created, even when there is nothing to do.
    pub fn run(&mut self, observer: &mut dyn ProgressObserver) -> CategorizeResult<RunReport> {
        let result = self.run_stages(observer);
        self.state = match result {
            Ok(_) => RunState::Completed,
            Err(_) => RunState::Failed,
        };
        result
    }

    fn run_stages(&mut self, observer: &mut dyn ProgressObserver) -> CategorizeResult<RunReport> {
        self.state = RunState::Planning;
        let snapshot = self.snapshot()?;
        let plan = self.plan(&snapshot)?;
        observer.on_progress(ProgressTracker::new(plan.total).snapshot());

        self.state = RunState::BuildingSkeleton;
        self.build_skeleton(&plan)?;

        self.state = RunState::Transferring;
        self.execute(&snapshot, &plan, observer)
    }

    fn bucket_of(&self, name: &OsStr) -> CategorizeResult<BucketKey> {
        self.bucketer
            .bucket_for(&self.source.join(name))
            .map_err(|e| match e {
                CategorizeError::EntryNotFound { name, .. } => CategorizeError::EntryNotFound {
                    name,
                    source_root: self.source.clone(),
                },
                other => other,
            })
    }

    fn destination_of(&self, bucket: &BucketKey, name: &OsStr) -> PathBuf {
        self.target.join(bucket).join(name)
    }

    fn is_target(&self, path: &Path) -> bool {
        if path == self.target {
            return true;
        }
        match (fs::canonicalize(path), fs::canonicalize(&self.target)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

fn validate_source(path: &Path) -> CategorizeResult<PathBuf> {
    if !path.exists() {
        return Err(CategorizeError::SourceMissing(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(CategorizeError::SourceNotDirectory(path.to_path_buf()));
    }
    Ok(path.to_path_buf())
}

fn validate_destination(path: &Path) -> CategorizeResult<PathBuf> {
    if !path.exists() {
        return Err(CategorizeError::DestinationMissing(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(CategorizeError::DestinationNotDirectory(path.to_path_buf()));
    }
    Ok(path.to_path_buf())
}

fn create_dir_if_missing(path: &Path) -> CategorizeResult<()> {
    if path.exists() {
        return Ok(());
    }
    fs::create_dir(path).map_err(|e| CategorizeError::DirectoryCreationFailed {
        path: path.to_path_buf(),
        source: e,
    })
}
