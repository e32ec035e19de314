//! Configuration loading and entry filtering.
//!
//! This module loads run settings and filtering rules from TOML configuration
//! files. Filters apply to the top-level entries of the source directory, both
//! files and folders:
//! - Exact name matching
//! - Glob pattern matching
//! - Regex pattern matching
//! - Include (whitelist) rules that override exclude rules
//!
//! # Configuration File Format
//!
//! ```toml
//! [categorizer]
//! mode = "copy"
//! output_folder = "OUTPUT"
//! date_format = "%Y-%m-%d"
//!
//! [filters]
//! enable_hidden_files = true
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.tmp"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```

use crate::categorizer::{DEFAULT_OUTPUT_FOLDER, Mode};
use crate::date_bucket::{DEFAULT_DATE_FORMAT, DateBucketer};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("IO error reading configuration: {0}")]
    IoError(String),

    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    #[error("Invalid date format '{0}': it must be a strftime format that yields a single folder name")]
    InvalidDateFormat(String),

    #[error("Invalid output folder name '{0}': it must be a single folder name")]
    InvalidOutputFolder(String),
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub categorizer: CategorizerSettings,
    #[serde(default)]
    pub filters: FilterRules,
}

/// Settings for the categorization run itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizerSettings {
    /// Mode used when none is given on the command line.
    #[serde(default)]
    pub mode: Mode,

    /// Name of the folder created inside the destination.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// strftime format of the bucket folder names.
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_output_folder() -> String {
    DEFAULT_OUTPUT_FOLDER.to_string()
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

impl Default for CategorizerSettings {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            output_folder: default_output_folder(),
            date_format: default_date_format(),
        }
    }
}

impl CategorizerSettings {
    /// Builds the bucketer described by `date_format`.
    pub fn bucketer(&self) -> Result<DateBucketer, ConfigError> {
        DateBucketer::with_format(&self.date_format)
    }
}

/// Checks that `name` can be used as the output folder name.
pub fn validate_output_folder(name: &str) -> Result<&str, ConfigError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(ConfigError::InvalidOutputFolder(name.to_string()));
    }
    Ok(name)
}

/// Root-level filter rules configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to consider hidden entries (starting with "."). Defaults to true.
    #[serde(default = "default_enable_hidden_files")]
    pub enable_hidden_files: bool,

    /// Rules for excluding entries.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including entries (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

fn default_enable_hidden_files() -> bool {
    true
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: default_enable_hidden_files(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// Rules for excluding entries from categorization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact names to exclude (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the entry name (e.g., "*.tmp").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Regex patterns matched against the entry name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including entries, overriding exclude rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl AppConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.datetidyrc.toml` in the current directory
    /// 3. Look for `~/.config/datetidy/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if any file found cannot be parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".datetidyrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("datetidy")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }
}

/// Compiled filter rules, ready for matching entry names.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    /// Compiles filter rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex patterns are invalid.
    pub fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Filters that let every entry through.
    pub fn allow_all() -> Self {
        Self {
            enable_hidden_files: true,
            exclude_filenames: HashSet::new(),
            exclude_patterns: Vec::new(),
            exclude_regexes: Vec::new(),
            include_patterns: Vec::new(),
        }
    }

    /// Check if an entry with this name should be categorized.
    ///
    /// Include patterns win; otherwise the hidden-entry switch, exact names,
    /// glob patterns and regexes can each exclude it.
    pub fn should_include(&self, name: &str) -> bool {
        if self.include_patterns.iter().any(|p| p.matches(name)) {
            return true;
        }

        if !self.enable_hidden_files && name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(name) {
            return false;
        }

        if self.exclude_patterns.iter().any(|p| p.matches(name)) {
            return false;
        }

        !self.exclude_regexes.iter().any(|r| r.is_match(name))
    }
}

impl Default for CompiledFilters {
    fn default() -> Self {
        Self::allow_all()
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}
