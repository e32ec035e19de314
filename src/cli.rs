//! Command-line interface module for datetidy.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing and mode selection
//! - Configuration loading
//! - Running the categorizer with a progress bar
//! - Dry-run planning and the optional JSON report

use crate::categorizer::{Categorizer, Mode, Plan, RunReport};
use crate::config::AppConfig;
use crate::error::{CategorizeError, CategorizeResult};
use crate::output::OutputFormatter;
use crate::progress::{ProgressObserver, ProgressUpdate};
use crate::transfer::TransferRecord;
use clap::Parser;
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Sort the contents of a directory into date-named folders by creation date.
#[derive(Debug, Clone, Parser)]
#[command(name = "datetidy", version, about)]
pub struct Cli {
    /// Directory whose top-level files and folders are sorted.
    pub source: PathBuf,

    /// Directory that receives the OUTPUT folder.
    pub destination: PathBuf,

    /// 0 or "copy" to copy entries, 1 or "move" to move them [default: copy].
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Path to a TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show what would be transferred without touching anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON report of the run to FILE.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Suppress per-entry lines and the progress bar.
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Creates arguments for a quiet copy run with everything else defaulted.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            mode: None,
            config: None,
            dry_run: false,
            report: None,
            quiet: true,
            verbose: 0,
        }
    }
}

/// Observer that drives the terminal progress bar and prints transfer records.
pub struct CliObserver {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl CliObserver {
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }
}

impl ProgressObserver for CliObserver {
    fn on_progress(&mut self, update: ProgressUpdate) {
        if self.quiet {
            return;
        }
        let pb = self
            .bar
            .get_or_insert_with(|| OutputFormatter::create_progress_bar(update.total as u64));
        pb.set_length(update.total as u64);
        pb.set_position(update.finished as u64);
        if update.completed {
            pb.finish_and_clear();
        }
    }

    fn on_transfer(&mut self, record: &TransferRecord) {
        if self.quiet {
            return;
        }
        let line = OutputFormatter::transfer_line(
            &record.original_path.display().to_string(),
            &record.new_path.display().to_string(),
        );
        // a hidden bar drops println output, so print around it instead
        match &self.bar {
            Some(pb) => pb.suspend(|| OutputFormatter::plain(&line)),
            None => OutputFormatter::plain(&line),
        }
    }
}

/// Runs the CLI application with parsed arguments.
///
/// Returns the run report, or `None` for a dry run.
///
/// # Examples
///
/// ```no_run
/// use datetidy::cli::{Cli, run_cli};
///
/// let cli = Cli::new("/path/to/source", "/path/to/destination");
/// match run_cli(&cli) {
///     Ok(_) => println!("Operation completed successfully"),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> CategorizeResult<Option<RunReport>> {
    // The mode is checked before anything on disk is looked at.
    let mode = cli.mode.as_deref().map(str::parse::<Mode>).transpose()?;

    let config = AppConfig::load(cli.config.as_deref())?;
    let categorizer = Categorizer::from_config(&cli.source, &cli.destination, mode, &config)?;

    if cli.dry_run {
        dry_run(&categorizer)?;
        return Ok(None);
    }

    let report = categorize(categorizer, cli.quiet)?;

    if let Some(path) = &cli.report {
        write_report(&report, path)?;
        if !cli.quiet {
            OutputFormatter::info(&format!("Report written to {}", path.display()));
        }
    }

    Ok(Some(report))
}

/// Runs the categorizer, printing one line per transfer and a summary.
fn categorize(mut categorizer: Categorizer, quiet: bool) -> CategorizeResult<RunReport> {
    if !quiet {
        OutputFormatter::info(&format!(
            "Categorizing {} into {} ({})",
            categorizer.source().display(),
            categorizer.target().display(),
            categorizer.mode()
        ));
    }

    let mut observer = CliObserver::new(quiet);
    let report = categorizer.run(&mut observer)?;

    if !quiet {
        let counts = bucket_counts(report.transfers.iter().map(|t| t.bucket.to_string()));
        if !counts.is_empty() {
            OutputFormatter::summary_table(&counts, report.finished);
        }
        if !report.skipped.is_empty() {
            OutputFormatter::warning(&format!(
                "{} already present at the destination, left untouched",
                report.skipped.len()
            ));
        }
        OutputFormatter::success(&format!(
            "Categorization complete: {}/{} transferred",
            report.finished, report.total
        ));
    }

    Ok(report)
}

/// Plans the run and prints where every entry would go.
fn dry_run(categorizer: &Categorizer) -> CategorizeResult<Plan> {
    OutputFormatter::dry_run_notice(&format!(
        "Analyzing contents of: {}",
        categorizer.source().display()
    ));

    let snapshot = categorizer.snapshot()?;
    let plan = categorizer.plan(&snapshot)?;

    if snapshot.is_empty() {
        OutputFormatter::plain("No files or folders found to categorize.");
        return Ok(plan);
    }

    OutputFormatter::header("Entries would be placed as follows:");
    for entry in &plan.entries {
        let name = entry.name.to_string_lossy();
        let destination = categorizer.target().join(&entry.bucket).join(&entry.name);
        if entry.already_present {
            OutputFormatter::plain(&format!(
                " - {} (already at {}, skipped)",
                name,
                destination.display()
            ));
        } else {
            OutputFormatter::plain(&format!(
                " - {}\n   → Would {} to {}",
                name,
                categorizer.mode(),
                destination.display()
            ));
        }
    }

    let counts = bucket_counts(plan.pending().map(|e| e.bucket.to_string()));
    OutputFormatter::summary_table(&counts, plan.total);
    OutputFormatter::dry_run_notice("Dry run complete. No files were modified.");

    Ok(plan)
}

fn bucket_counts(buckets: impl Iterator<Item = String>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for bucket in buckets {
        *counts.entry(bucket).or_insert(0) += 1;
    }
    counts
}

/// Writes the run report as pretty-printed JSON.
pub fn write_report(report: &RunReport, path: &Path) -> CategorizeResult<()> {
    let json = serde_json::to_string_pretty(report).map_err(|e| {
        CategorizeError::ReportWriteFailed {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            ),
        }
    })?;

    fs::write(path, json).map_err(|e| CategorizeError::ReportWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}
