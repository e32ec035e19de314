/// Copy and move primitives used by the transfer step.
///
/// Directories are copied recursively; moves use a rename and fall back to
/// copy-then-remove when the rename would cross devices. Nothing here is atomic
/// across devices, and nothing is rolled back on failure.
use crate::categorizer::Mode;
use crate::date_bucket::BucketKey;
use crate::error::{CategorizeError, CategorizeResult};
use serde::{Serialize, Serializer};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Whether a top-level entry is a directory or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// Records where a single entry was transferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRecord {
    /// The path of the entry before the transfer.
    #[serde(serialize_with = "serialize_path")]
    pub original_path: PathBuf,
    /// The path of the entry after the transfer.
    #[serde(serialize_with = "serialize_path")]
    pub new_path: PathBuf,
    /// The date bucket the entry was placed into.
    pub bucket: BucketKey,
    pub kind: EntryKind,
}

/// Serializes a path as a string, replacing bytes that are not valid UTF-8.
pub fn serialize_path<P, S>(path: &P, serializer: S) -> Result<S::Ok, S::Error>
where
    P: AsRef<Path>,
    S: Serializer,
{
    serializer.serialize_str(&path.as_ref().to_string_lossy())
}

pub fn serialize_paths<S: Serializer>(paths: &[PathBuf], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(paths.iter().map(|p| p.to_string_lossy()))
}

/// Transfers `from` to `to` according to `mode`.
///
/// The parent of `to` must already exist.
///
/// # Errors
///
/// Returns `CategorizeError::TransferFailed` with the underlying I/O error.
pub fn transfer_entry(mode: Mode, kind: EntryKind, from: &Path, to: &Path) -> CategorizeResult<()> {
    let result = match (mode, kind) {
        (Mode::Copy, EntryKind::Directory) => copy_tree(from, to),
        (Mode::Copy, EntryKind::File) => fs::copy(from, to).map(|_| ()),
        (Mode::Move, _) => move_entry(from, to, kind),
    };

    result.map_err(|e| CategorizeError::TransferFailed {
        mode,
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    })
}

/// Recursively copies the directory `from` to the new directory `to`.
///
/// Fails with `AlreadyExists` if `to` is already present. Symlinks are followed,
/// so the copy holds the content they point to.
pub fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir(to)?;

    for entry in WalkDir::new(from).min_depth(1).follow_links(true) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

/// Moves `from` to `to`.
pub fn move_entry(from: &Path, to: &Path, kind: EntryKind) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::warn!(
                from = %from.display(),
                to = %to.display(),
                "rename crosses devices, falling back to copy and remove"
            );
            match kind {
                EntryKind::Directory => {
                    copy_tree(from, to)?;
                    fs::remove_dir_all(from)
                }
                EntryKind::File => {
                    fs::copy(from, to)?;
                    fs::remove_file(from)
                }
            }
        }
        Err(e) => Err(e),
    }
}
