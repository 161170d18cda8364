/// Undo functionality for reverting an apply run.
///
/// The undo engine reads a manifest and moves every recorded file from where
/// it ended up back to where it came from, last operation first. It always
/// moves, even when the manifest describes a copy run.
use crate::applier::{move_file, next_free_path, path_taken};
use crate::error::{OrganizeError, OrganizeResult};
use crate::manifest::{Manifest, ManifestEntry};
use crate::report::{Event, Reporter, Verb};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Represents the result of an undo operation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UndoReport {
    /// Number of files moved back.
    pub restored: usize,
    /// Number of reversals listed by a dry run.
    pub previewed: usize,
    /// Entries whose organized file no longer exists, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
    /// Files that were in the way at an original location and got renamed.
    pub backed_up: Vec<PathBuf>,
    pub dry_run: bool,
}

impl UndoReport {
    /// Returns the total number of manifest entries processed.
    pub fn total_processed(&self) -> usize {
        self.restored + self.previewed + self.skipped.len()
    }

    /// Returns true if every entry was restored without skips or backups.
    pub fn is_complete_success(&self) -> bool {
        self.skipped.is_empty() && self.backed_up.is_empty()
    }
}

/// Reverses the operations recorded in a manifest.
pub struct UndoManager {
    manifest_path: PathBuf,
    dry_run: bool,
}

impl UndoManager {
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            dry_run: false,
        }
    }

    /// Only report what would be restored.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Undoes every operation in the manifest, most recent first.
    ///
    /// The manifest file is left as it is.
    ///
    /// # Edge Cases Handled
    ///
    /// * **Organized file missing**: skipped and reported, the run continues
    /// * **Identical file at the original location**: overwritten, which is
    ///   what moving a copy back amounts to
    /// * **Different file at the original location**: renamed to
    ///   `name.bak.<timestamp>` first, then the restore proceeds
    /// * **Any other I/O failure**, including one while checking the
    ///   organized file: the run stops with [`OrganizeError::OperationFailure`]
    /// * **Directories the apply created**: removed again once empty; any
    ///   directory that existed before the apply is left alone
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use organizer::report::Event;
    /// use organizer::undo::UndoManager;
    ///
    /// let mut events: Vec<Event> = Vec::new();
    /// match UndoManager::new("/home/me/moves.json").undo(&mut events) {
    ///     Ok(report) => println!("Restored {} files", report.restored),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(&self, reporter: &mut dyn Reporter) -> OrganizeResult<UndoReport> {
        let manifest = Manifest::load(&self.manifest_path)?;

        reporter.report(Event::Started {
            verb: Verb::Undo,
            total: manifest.operations.len(),
            dry_run: self.dry_run,
        });

        let mut report = UndoReport {
            dry_run: self.dry_run,
            ..Default::default()
        };

        let created_dirs: HashSet<&Path> =
            manifest.created_dirs.iter().map(PathBuf::as_path).collect();

        for entry in manifest.operations.iter().rev() {
            let failure = |error: io::Error| OrganizeError::OperationFailure {
                verb: Verb::Undo,
                from: entry.dest.clone(),
                to: entry.src.clone(),
                completed: report.restored,
                error,
            };

            if !path_taken(&entry.dest).map_err(failure)? {
                let reason = "File not found at organized location".to_string();
                reporter.report(Event::Skipped {
                    path: entry.dest.clone(),
                    reason: reason.clone(),
                });
                report.skipped.push((entry.dest.clone(), reason));
                continue;
            }

            if self.dry_run {
                reporter.report(Event::Action {
                    verb: Verb::Undo,
                    from: entry.dest.clone(),
                    to: entry.src.clone(),
                    dry_run: true,
                });
                report.previewed += 1;
                continue;
            }

            let backup = Self::restore_file(entry, &created_dirs).map_err(failure)?;

            if let Some(backup) = backup {
                reporter.report(Event::Warning(format!(
                    "{} already existed with different contents; kept it as {}",
                    entry.src.display(),
                    backup.display()
                )));
                report.backed_up.push(backup);
            }

            reporter.report(Event::Action {
                verb: Verb::Undo,
                from: entry.dest.clone(),
                to: entry.src.clone(),
                dry_run: false,
            });
            report.restored += 1;
        }

        reporter.report(Event::Finished {
            verb: Verb::Undo,
            count: report.restored + report.previewed,
            dry_run: self.dry_run,
        });

        Ok(report)
    }

    /// Moves one file back, returning the backup path if something had to
    /// be moved out of the way.
    fn restore_file(
        entry: &ManifestEntry,
        created_dirs: &HashSet<&Path>,
    ) -> io::Result<Option<PathBuf>> {
        if let Some(parent) = entry.src.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut backup = None;
        if path_taken(&entry.src)? && !same_contents(&entry.src, &entry.dest)? {
            let backup_path = next_free_path(&Self::generate_backup_path(&entry.src))?;
            fs::rename(&entry.src, &backup_path)?;
            backup = Some(backup_path);
        }

        move_file(&entry.dest, &entry.src)?;
        prune_empty_dirs(entry.dest.parent(), created_dirs);

        Ok(backup)
    }

    /// Generates a backup path for a file by appending a timestamp.
    ///
    /// Example: `file.txt` becomes `file.txt.bak.20251109-143052`
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        original_path.with_file_name(format!("{}.bak.{}", filename, timestamp))
    }
}

/// Byte-for-byte comparison of two files.
fn same_contents(a: &Path, b: &Path) -> io::Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }

    let mut left = BufReader::new(File::open(a)?);
    let mut right = BufReader::new(File::open(b)?);
    loop {
        let l = left.fill_buf()?;
        let r = right.fill_buf()?;
        if l.is_empty() || r.is_empty() {
            return Ok(l.is_empty() && r.is_empty());
        }
        let n = l.len().min(r.len());
        if l[..n] != r[..n] {
            return Ok(false);
        }
        left.consume(n);
        right.consume(n);
    }
}

/// Removes `start` and its ancestors while they are empty, but only
/// directories listed in `created_dirs`.
fn prune_empty_dirs(start: Option<&Path>, created_dirs: &HashSet<&Path>) {
    let mut current = start;
    while let Some(dir) = current {
        if !created_dirs.contains(dir) || fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}
