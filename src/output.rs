//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! the transfer progress bar, and the per-bucket summary table.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use datetidy::output::OutputFormatter;
    /// OutputFormatter::success("Categorization complete!");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Formats one transfer record as an aligned `original => new` line.
    ///
    /// ```
    /// use datetidy::output::OutputFormatter;
    /// let line = OutputFormatter::transfer_line("/src/a.txt", "/dst/OUTPUT/2023-04-03/a.txt");
    /// assert!(line.starts_with("/src/a.txt "));
    /// assert!(line.ends_with("=>        /dst/OUTPUT/2023-04-03/a.txt"));
    /// ```
    pub fn transfer_line(original: &str, new: &str) -> String {
        format!("{:<70}   =>        {}", original, new)
    }

    /// Creates a progress bar for the transfer step.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use datetidy::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_with_message("Completed!");
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints a summary table with entry counts per date bucket.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use datetidy::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("2023-04-03".to_string(), 15);
    /// counts.insert("2023-04-04".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(bucket_counts: &BTreeMap<String, usize>, total_entries: usize) {
        Self::header("SUMMARY");

        let width = bucket_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(6); // "Bucket"

        println!(
            "{:<width$} | {}",
            "Bucket".bold(),
            "Entries".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 12));

        for (bucket, count) in bucket_counts {
            println!(
                "{:<width$} | {} {}",
                bucket,
                count.to_string().green(),
                entry_word(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 12));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_entries.to_string().green().bold(),
            entry_word(total_entries),
            width = width
        );
    }
}

fn entry_word(count: usize) -> &'static str {
    if count == 1 { "entry" } else { "entries" }
}
