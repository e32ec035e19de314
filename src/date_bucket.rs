//! Date bucketing of directory entries.
//!
//! Every entry is assigned to a bucket named after the calendar date on which it
//! was created, in local time. Two entries created on the same day share a bucket.
//!
//! # Examples
//!
//! ```
//! use chrono::{Local, TimeZone};
//! use datetidy::date_bucket::DateBucketer;
//!
//! let bucketer = DateBucketer::default();
//! let created = Local.with_ymd_and_hms(2023, 4, 3, 18, 30, 0).unwrap();
//! assert_eq!(bucketer.key_for(created).as_str(), "2023-04-03");
//! ```

use crate::config::{ConfigError, validate_output_folder};
use crate::error::{CategorizeError, CategorizeResult};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

/// Default bucket name format, e.g. `2023-04-03`.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Name of a date bucket directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BucketKey(String);

impl BucketKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for BucketKey {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// Turns creation timestamps into bucket keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateBucketer {
    format: String,
}

impl DateBucketer {
    /// Creates a bucketer with a custom strftime format.
    ///
    /// The format is rejected when chrono cannot parse it, or when its output
    /// is not a single folder name (a path separator, `.` or `..`).
    pub fn with_format(format: &str) -> Result<Self, ConfigError> {
        if format.is_empty() || format.contains('/') || format.contains('\\') {
            return Err(ConfigError::InvalidDateFormat(format.to_string()));
        }
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidDateFormat(format.to_string()));
        }
        // composite specifiers such as %D expand to slashes
        let sample = Local::now().format(format).to_string();
        if validate_output_folder(&sample).is_err() {
            return Err(ConfigError::InvalidDateFormat(format.to_string()));
        }
        Ok(Self {
            format: format.to_string(),
        })
    }

    /// Formats a timestamp into its bucket key.
    pub fn key_for(&self, created: DateTime<Local>) -> BucketKey {
        BucketKey(created.format(&self.format).to_string())
    }

    /// Reads the creation time of `path` and returns its bucket key.
    ///
    /// Each call hits the filesystem again; nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns `CategorizeError::EntryNotFound` if the entry no longer exists,
    /// or `CategorizeError::MetadataFailed` for any other metadata failure.
    pub fn bucket_for(&self, path: &Path) -> CategorizeResult<BucketKey> {
        let metadata = read_metadata(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                CategorizeError::EntryNotFound {
                    name: entry_name(path),
                    source_root: path.parent().map(Path::to_path_buf).unwrap_or_default(),
                }
            } else {
                CategorizeError::MetadataFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let created = creation_time(&metadata).map_err(|e| CategorizeError::MetadataFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(self.key_for(created))
    }
}

impl Default for DateBucketer {
    fn default() -> Self {
        Self {
            format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

/// Follows symlinks, falling back to the link itself when it dangles.
fn read_metadata(path: &Path) -> io::Result<Metadata> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata),
        Err(e) if e.kind() == io::ErrorKind::NotFound => fs::symlink_metadata(path),
        Err(e) => Err(e),
    }
}

/// Returns the birth time of an entry, or the platform's closest equivalent
/// when the filesystem does not record one.
pub fn creation_time(metadata: &Metadata) -> io::Result<DateTime<Local>> {
    match metadata.created() {
        Ok(created) => Ok(DateTime::<Local>::from(created)),
        Err(_) => fallback_time(metadata),
    }
}

#[cfg(unix)]
fn fallback_time(metadata: &Metadata) -> io::Result<DateTime<Local>> {
    use std::os::unix::fs::MetadataExt;

    // inode change time
    match DateTime::from_timestamp(metadata.ctime(), metadata.ctime_nsec() as u32) {
        Some(ctime) => Ok(ctime.with_timezone(&Local)),
        None => metadata.modified().map(DateTime::<Local>::from),
    }
}

#[cfg(not(unix))]
fn fallback_time(metadata: &Metadata) -> io::Result<DateTime<Local>> {
    metadata.modified().map(DateTime::<Local>::from)
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
