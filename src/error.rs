//! Error types for the categorization pipeline.
//!
//! Every failure is fatal for the run that produced it. Errors are returned to
//! the caller instead of terminating the process, so the calling layer decides
//! whether to halt, report, or prompt the operator.

use crate::categorizer::Mode;
use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a [`CategorizeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Invalid mode, bad source/destination path, or a bad configuration file.
    Configuration,
    /// An entry seen in the snapshot could not be found later.
    Lookup,
    /// Any other OS-level failure while reading, creating, copying or moving.
    Filesystem,
}

/// Errors that can occur while categorizing a directory.
#[derive(Debug, Error)]
pub enum CategorizeError {
    #[error("Invalid mode '{value}', it should be either 0 (copy) or 1 (move)")]
    InvalidMode { value: String },

    #[error("The source path {0} does not exist")]
    SourceMissing(PathBuf),

    #[error("The source path {0} is not pointing to a directory")]
    SourceNotDirectory(PathBuf),

    #[error("The destination path {0} does not exist")]
    DestinationMissing(PathBuf),

    #[error("The destination path {0} is not pointing to a directory")]
    DestinationNotDirectory(PathBuf),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{name} file/folder does not exist in the source folder {}", source_root.display())]
    EntryNotFound { name: String, source_root: PathBuf },

    #[error("Failed to read directory {}: {source}", path.display())]
    ReadDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read metadata of {}: {source}", path.display())]
    MetadataFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to {mode} {} to {}: {source}", from.display(), to.display())]
    TransferFailed {
        mode: Mode,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write report {}: {source}", path.display())]
    ReportWriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CategorizeError {
    /// Returns which class of failure this is.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidMode { .. }
            | Self::SourceMissing(_)
            | Self::SourceNotDirectory(_)
            | Self::DestinationMissing(_)
            | Self::DestinationNotDirectory(_)
            | Self::Config(_) => ErrorClass::Configuration,
            Self::EntryNotFound { .. } => ErrorClass::Lookup,
            Self::ReadDirFailed { .. }
            | Self::MetadataFailed { .. }
            | Self::DirectoryCreationFailed { .. }
            | Self::TransferFailed { .. }
            | Self::ReportWriteFailed { .. } => ErrorClass::Filesystem,
        }
    }
}

/// Result type for categorization operations.
pub type CategorizeResult<T> = Result<T, CategorizeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_classes() {
        let invalid = CategorizeError::InvalidMode {
            value: "5".to_string(),
        };
        assert_eq!(invalid.class(), ErrorClass::Configuration);

        let missing = CategorizeError::EntryNotFound {
            name: "a.txt".to_string(),
            source_root: PathBuf::from("/src"),
        };
        assert_eq!(missing.class(), ErrorClass::Lookup);

        let failed = CategorizeError::TransferFailed {
            mode: Mode::Move,
            from: PathBuf::from("/src/a.txt"),
            to: PathBuf::from("/dst/OUTPUT/2023-04-03/a.txt"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(failed.class(), ErrorClass::Filesystem);
    }

    #[test]
    fn test_source_failures_are_distinguishable() {
        let missing = CategorizeError::SourceMissing(PathBuf::from("/nope"));
        let not_dir = CategorizeError::SourceNotDirectory(PathBuf::from("/nope"));
        assert_ne!(missing.to_string(), not_dir.to_string());
        assert!(not_dir.to_string().contains("not pointing to a directory"));
    }

    #[test]
    fn test_transfer_failure_message_names_mode() {
        let failed = CategorizeError::TransferFailed {
            mode: Mode::Copy,
            from: PathBuf::from("/src/a.txt"),
            to: PathBuf::from("/dst/a.txt"),
            source: io::Error::other("disk full"),
        };
        let message = failed.to_string();
        assert!(message.starts_with("Failed to copy"));
        assert!(message.contains("disk full"));
    }
}
