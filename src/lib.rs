//! datetidy - sort a directory's contents into date-named folders
//!
//! This library snapshots the top-level entries of a source directory, buckets
//! each one by its creation date, and copies or moves it into
//! `destination/OUTPUT/<YYYY-MM-DD>/`, reporting progress to an observer.

pub mod categorizer;
pub mod cli;
pub mod config;
pub mod date_bucket;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod transfer;

pub use categorizer::{Categorizer, Mode, Plan, RunReport, RunState, Snapshot};
pub use config::{AppConfig, CompiledFilters, ConfigError};
pub use date_bucket::{BucketKey, DateBucketer};
pub use error::{CategorizeError, CategorizeResult, ErrorClass};
pub use progress::{ChannelObserver, ProgressObserver, ProgressUpdate, SilentObserver};
pub use transfer::{EntryKind, TransferRecord};

pub use cli::{Cli, run_cli};
