//! Output formatting and styling module.
//!
//! Provides the colored console rendering of reporter events: per-file lines
//! for dry runs and verbose runs, a progress bar otherwise, and a summary
//! table of files per group.

use crate::report::{Event, Reporter, Verb};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

/// Consistent styling for all CLI output.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use organizer::output::OutputFormatter;
    /// OutputFormatter::success("Files organized successfully!");
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

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for `total` file operations.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints a summary table with file counts per group.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use organizer::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("jpg".to_string(), 15);
    /// counts.insert("txt".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(group_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let max_group_len = group_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(5); // "Group"

        println!(
            "{:<width$} | {}",
            "Group".bold(),
            "Files".bold(),
            width = max_group_len
        );
        println!("{}", "-".repeat(max_group_len + 10));

        for (group, count) in group_counts {
            let file_word = if *count == 1 { "file" } else { "files" };
            println!(
                "{:<width$} | {} {}",
                group,
                count.to_string().green(),
                file_word,
                width = max_group_len
            );
        }

        println!("{}", "-".repeat(max_group_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            if total_files == 1 { "file" } else { "files" },
            width = max_group_len
        );
    }
}

/// Renders reporter events on the terminal.
///
/// Live runs show a progress bar unless `verbose` is set, in which case each
/// operation gets its own line. Dry runs always list every action.
pub struct ConsoleReporter {
    verbose: bool,
    progress: Option<ProgressBar>,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            progress: None,
        }
    }

    /// Prints without tearing an active progress bar.
    fn print(&self, f: impl FnOnce()) {
        match &self.progress {
            Some(pb) => pb.suspend(f),
            None => f(),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, event: Event) {
        match event {
            Event::Planned { count } => {
                OutputFormatter::info(&format!("Planned {} operation(s).", count));
            }
            Event::Started {
                verb,
                total,
                dry_run,
            } => {
                if dry_run {
                    OutputFormatter::header(&format!(
                        "DRY RUN: {} action(s) would be performed",
                        total
                    ));
                } else if !self.verbose && total > 0 {
                    let pb = OutputFormatter::create_progress_bar(total as u64);
                    pb.set_message(verb.label());
                    self.progress = Some(pb);
                }
            }
            Event::Action {
                verb,
                from,
                to,
                dry_run,
            } => {
                let line = format!("{} {} -> {}", verb.label(), from.display(), to.display());
                if dry_run {
                    OutputFormatter::dry_run_notice(&line);
                } else if let Some(pb) = &self.progress {
                    pb.inc(1);
                    if let Some(name) = to.file_name() {
                        pb.set_message(name.to_string_lossy().into_owned());
                    }
                } else {
                    OutputFormatter::success(&line);
                }
            }
            Event::Skipped { path, reason } => {
                self.print(|| {
                    OutputFormatter::warning(&format!("Skipped {}: {}", path.display(), reason))
                });
            }
            Event::Warning(message) => {
                self.print(|| OutputFormatter::warning(&message));
            }
            Event::ManifestWritten { path, operations } => {
                self.print(|| {
                    OutputFormatter::info(&format!(
                        "Wrote manifest with {} operation(s) to {}",
                        operations,
                        path.display()
                    ))
                });
            }
            Event::Finished {
                verb,
                count,
                dry_run,
            } => {
                if let Some(pb) = self.progress.take() {
                    pb.finish_and_clear();
                }
                if dry_run {
                    OutputFormatter::success("Dry run complete. No changes made.");
                } else {
                    let what = match verb {
                        Verb::Copy => "Copied",
                        Verb::Move => "Moved",
                        Verb::Undo => "Restored",
                    };
                    OutputFormatter::success(&format!("{} {} file(s).", what, count));
                }
            }
            Event::Summary { groups, total } => {
                self.print(|| OutputFormatter::summary_table(&groups, total));
            }
            Event::Error(message) => {
                self.print(|| OutputFormatter::error(&message));
            }
        }
    }
}
