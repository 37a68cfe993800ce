//! Output formatting and styling module.
//!
//! Every line the tool prints to the operator goes through here: status
//! messages, dry-run notices, progress bars, count tables, file details, move
//! reports and cache conflict listings. Diagnostics meant for logs use
//! `tracing` instead.

use crate::cache::CacheConflict;
use crate::file_list::{FileList, Summary};
use crate::file_organizer::{Collision, MoveReport};
use crate::undo::UndoReport;
use chrono::NaiveDate;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Formats a byte count with a binary unit, e.g. `  1.50 KB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size > 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:6.2} {}", size, UNITS[unit])
}

/// Formats seconds as `H:MM:SS`.
pub fn human_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// ```no_run
    /// use mediatidy::output::OutputFormatter;
    /// OutputFormatter::success("Cache saved");
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

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Reports a move that a dry run would have performed.
    pub fn dry_run_move(from: &Path, to: &Path) {
        println!(
            "{} {}\n    {} {}",
            "[DRY RUN]".yellow(),
            from.display(),
            "->".yellow(),
            to.display().to_string().green()
        );
    }

    /// Creates a progress bar for file operations.
    ///
    /// ```no_run
    /// use mediatidy::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Like [`OutputFormatter::create_progress_bar`], hidden unless `visible`.
    pub fn progress_bar(total: u64, visible: bool) -> ProgressBar {
        if visible {
            Self::create_progress_bar(total)
        } else {
            ProgressBar::hidden()
        }
    }

    /// Prints the count table of one category.
    pub fn summary_table(summary: &Summary) {
        Self::header(&format!(
            "{} files: {} ({})",
            summary.category,
            summary.total_files,
            human_size(summary.total_size).trim()
        ));
        if summary.total_duration > 0.0 {
            println!("Total duration: {}", human_duration(summary.total_duration));
        }
        if summary.columns.is_empty() || summary.total_files == 0 {
            return;
        }

        let label_width = summary
            .rows
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(0);
        let col_width = summary.columns.iter().map(|c| c.len()).max().unwrap_or(0).max(5);

        let mut head = format!("{:<label_width$}", "");
        for column in &summary.columns {
            head.push_str(&format!(" | {:>col_width$}", column));
        }
        println!("{}", head.bold());
        println!("{}", "-".repeat(head.len()));

        for (label, counts) in &summary.rows {
            let mut line = format!("{:<label_width$}", label);
            for count in counts {
                let cell = format!("{:>col_width$}", count);
                if *count > 0 {
                    line.push_str(&format!(" | {}", cell.green()));
                } else {
                    line.push_str(&format!(" | {}", cell));
                }
            }
            if *label == "Sum" {
                println!("{}", "-".repeat(head.len()));
            }
            println!("{}", line);
        }
    }

    /// Prints one line per record with its metadata.
    pub fn details(list: &FileList, show_path: bool) {
        let name_width = list.iter().map(|r| r.name().len()).max().unwrap_or(0).max(8);
        println!(
            "{}",
            format!(
                "{:<name_width$}  {:>10}  {:<10}  {:>9}  {:>11}  {}",
                "Filename", "Size", "Date", "Duration", "Dimensions", "Kind"
            )
            .bold()
        );

        for record in list.iter() {
            let dimensions = match (record.width(), record.height()) {
                (Some(w), Some(h)) => format!("{}x{}", w, h),
                _ => String::new(),
            };
            let kind = [
                record.length().map(|l| l.to_string()),
                record.orientation().map(|o| o.to_string()),
                record.image_type().map(|t| t.to_string()),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("/");
            let kind = if record.broken() {
                format!("{} {}", kind, "broken".red())
            } else {
                kind
            };

            println!(
                "{}  {}  {:<10}  {:>9}  {:>11}  {}",
                format!("{:<name_width$}", record.name()).green(),
                human_size(record.size()).yellow(),
                record.mdate(),
                record.duration_human(),
                dimensions,
                kind
            );
            if show_path {
                println!("    {}", record.path().display().to_string().dimmed());
            }
        }

        println!(
            "{} files, {}",
            list.len(),
            human_size(list.total_size()).trim()
        );
        if list.total_duration() > 0.0 {
            println!("Total duration: {}", human_duration(list.total_duration()));
        }
    }

    /// Prints the distinct modification dates with their file counts.
    pub fn dates(dates: &[(NaiveDate, usize)]) {
        for (date, count) in dates {
            let file_word = if *count == 1 { "file" } else { "files" };
            println!("{}  {} {}", date, count.to_string().green(), file_word);
        }
    }

    /// Lists occupied destinations before asking what to do about them.
    pub fn collisions(collisions: &[Collision]) {
        if collisions.is_empty() {
            return;
        }
        Self::warning("The following destinations already exist:");
        for collision in collisions {
            let existing = collision
                .existing_size
                .map(human_size)
                .unwrap_or_else(|| "   claimed".to_string());
            println!(
                "   - [{}] {}",
                human_size(collision.source_size),
                collision.source.display()
            );
            println!(
                "   + [{}] {}",
                existing,
                collision.destination.display().to_string().yellow()
            );
        }
    }

    /// Prints the outcome of a move batch.
    pub fn move_report(report: &MoveReport) {
        let verb = if report.dry_run { "Would move" } else { "Moved" };
        Self::header("SUMMARY");
        println!(
            "{} {} {}",
            verb,
            report.moved.len().to_string().green().bold(),
            if report.moved.len() == 1 { "file" } else { "files" }
        );
        if report.unchanged > 0 {
            println!("{} already in place", report.unchanged);
        }
        if !report.skipped.is_empty() {
            Self::warning(&format!(
                "Skipped {} file(s) whose destination exists",
                report.skipped.len()
            ));
        }
        if !report.failed.is_empty() {
            Self::warning(&format!("{} file(s) could not be moved:", report.failed.len()));
            for (path, reason) in &report.failed {
                eprintln!("  {} {}: {}", "✗".red(), path.display(), reason);
            }
        }
    }

    /// Lists cache entries whose stored value differed from the new one.
    pub fn cache_conflicts(conflicts: &[CacheConflict]) {
        if conflicts.is_empty() {
            return;
        }
        Self::warning(&format!(
            "{} cache entr{} replaced with different values:",
            conflicts.len(),
            if conflicts.len() == 1 { "y" } else { "ies" }
        ));
        for conflict in conflicts {
            println!("  {}", conflict.key.yellow());
            for diff in &conflict.diffs {
                println!(
                    "    {}: {} -> {}",
                    diff.field,
                    diff.cached.to_string().red(),
                    diff.fresh.to_string().green()
                );
            }
        }
    }

    /// Prints the outcome of an undo.
    pub fn undo_report(report: &UndoReport) {
        Self::header("UNDO SUMMARY");
        println!("Restored: {}", report.restored_files.to_string().green());
        if !report.skipped_files.is_empty() {
            println!("Skipped:  {}", report.skipped_files.len().to_string().yellow());
            for (path, reason) in &report.skipped_files {
                println!("  {} {}: {}", "⚠".yellow(), path.display(), reason);
            }
        }
        if !report.failed_restores.is_empty() {
            println!("Failed:   {}", report.failed_restores.len().to_string().red());
            for (path, reason) in &report.failed_restores {
                eprintln!("  {} {}: {}", "✗".red(), path.display(), reason);
            }
        }
    }
}
