/// Executing a plan: copying or moving files into their group directories.
///
/// Operations run strictly one after another in plan order. Name collisions
/// are resolved right before each transfer, because earlier operations in
/// the same batch can create the very collisions later ones have to avoid.
///
/// A batch stops at the first failing operation. When a manifest path is
/// configured, the operations that did complete are still written to it so
/// they remain undoable.
use crate::error::{OrganizeError, OrganizeResult};
use crate::grouping::{DateField, GroupBy};
use crate::manifest::{MANIFEST_VERSION, Manifest, ManifestEntry};
use crate::planner::{Move, Planner};
use crate::report::{Event, Reporter, Verb};
use std::ffi::OsString;
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};

/// Outcome of an apply run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Realized `(source, final target)` pairs, in the order performed.
    pub operations: Vec<ManifestEntry>,
    /// Number of actions listed by a dry run.
    pub previewed: usize,
    pub dry_run: bool,
    /// Where the manifest was written, if it was.
    pub manifest: Option<PathBuf>,
}

/// Applies planned moves.
///
/// # Examples
///
/// ```no_run
/// use organizer::applier::Applier;
/// use organizer::planner::Planner;
/// use organizer::report::Event;
/// use std::path::PathBuf;
///
/// let planner = Planner::new("/home/me/inbox", "/home/me/inbox/organized");
/// let mut events: Vec<Event> = Vec::new();
/// let moves = planner.plan(&mut events)?;
///
/// let report = Applier::for_planner(&planner)?
///     .copy(true)
///     .manifest(Some(PathBuf::from("/home/me/moves.json")))
///     .apply(&moves, &mut events)?;
/// println!("copied {} files", report.operations.len());
/// # Ok::<(), organizer::OrganizeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Applier {
    copy: bool,
    dry_run: bool,
    manifest_path: Option<PathBuf>,
    by: GroupBy,
    date_field: DateField,
    root: PathBuf,
    dest: PathBuf,
}

impl Applier {
    /// Creates a moving, non-dry-run applier. `root`, `dest`, `by` and
    /// `date_field` are only recorded in the manifest.
    pub fn new(
        root: impl Into<PathBuf>,
        dest: impl Into<PathBuf>,
        by: GroupBy,
        date_field: DateField,
    ) -> Self {
        Self {
            copy: false,
            dry_run: false,
            manifest_path: None,
            by,
            date_field,
            root: root.into(),
            dest: dest.into(),
        }
    }

    /// Creates an applier that records the planner's resolved settings.
    pub fn for_planner(planner: &Planner) -> OrganizeResult<Self> {
        Ok(Self::new(
            planner.resolved_root()?,
            planner.resolved_dest()?,
            planner.group_by(),
            planner.selected_date_field(),
        ))
    }

    /// Copy files instead of moving them.
    pub fn copy(mut self, copy: bool) -> Self {
        self.copy = copy;
        self
    }

    /// Only report what would happen.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Record performed operations to this file. Ignored by dry runs.
    pub fn manifest(mut self, manifest_path: Option<PathBuf>) -> Self {
        self.manifest_path = manifest_path;
        self
    }

    fn verb(&self) -> Verb {
        if self.copy { Verb::Copy } else { Verb::Move }
    }

    /// Runs the moves in order.
    ///
    /// # Errors
    ///
    /// * [`OrganizeError::OperationFailure`] for the first operation that
    ///   fails; later moves are not attempted.
    /// * [`OrganizeError::ManifestWrite`] if every operation succeeded but the
    ///   manifest could not be written.
    pub fn apply(&self, moves: &[Move], reporter: &mut dyn Reporter) -> OrganizeResult<ApplyReport> {
        let verb = self.verb();
        reporter.report(Event::Started {
            verb,
            total: moves.len(),
            dry_run: self.dry_run,
        });

        if self.dry_run {
            for planned in moves {
                reporter.report(Event::Action {
                    verb,
                    from: planned.source.clone(),
                    to: planned.target.clone(),
                    dry_run: true,
                });
            }
            reporter.report(Event::Finished {
                verb,
                count: moves.len(),
                dry_run: true,
            });
            return Ok(ApplyReport {
                previewed: moves.len(),
                dry_run: true,
                ..Default::default()
            });
        }

        let mut applied: Vec<ManifestEntry> = Vec::with_capacity(moves.len());
        let mut created_dirs: Vec<PathBuf> = Vec::new();
        for planned in moves {
            match self.transfer(planned, &mut created_dirs) {
                Ok(final_target) => {
                    reporter.report(Event::Action {
                        verb,
                        from: planned.source.clone(),
                        to: final_target.clone(),
                        dry_run: false,
                    });
                    applied.push(ManifestEntry {
                        src: planned.source.clone(),
                        dest: final_target,
                    });
                }
                Err((to, error)) => {
                    let failure = OrganizeError::OperationFailure {
                        verb,
                        from: planned.source.clone(),
                        to,
                        completed: applied.len(),
                        error,
                    };
                    self.record_partial(&applied, &created_dirs, reporter);
                    return Err(failure);
                }
            }
        }

        let mut manifest = None;
        if let Some(path) = &self.manifest_path {
            self.write_manifest(path, &applied, &created_dirs)?;
            reporter.report(Event::ManifestWritten {
                path: path.clone(),
                operations: applied.len(),
            });
            manifest = Some(path.clone());
        }

        reporter.report(Event::Finished {
            verb,
            count: applied.len(),
            dry_run: false,
        });

        Ok(ApplyReport {
            operations: applied,
            previewed: 0,
            dry_run: false,
            manifest,
        })
    }

    /// Writes the operations that completed before a failure.
    fn record_partial(
        &self,
        applied: &[ManifestEntry],
        created_dirs: &[PathBuf],
        reporter: &mut dyn Reporter,
    ) {
        let Some(path) = &self.manifest_path else {
            return;
        };
        if applied.is_empty() {
            return;
        }

        match self.write_manifest(path, applied, created_dirs) {
            Ok(()) => reporter.report(Event::ManifestWritten {
                path: path.clone(),
                operations: applied.len(),
            }),
            Err(e) => reporter.report(Event::Warning(e.to_string())),
        }
    }

    fn write_manifest(
        &self,
        path: &Path,
        applied: &[ManifestEntry],
        created_dirs: &[PathBuf],
    ) -> OrganizeResult<()> {
        Manifest {
            version: MANIFEST_VERSION,
            copy: self.copy,
            by: self.by,
            date_field: self.date_field,
            root: self.root.clone(),
            dest: self.dest.clone(),
            operations: applied.to_vec(),
            created_dirs: created_dirs.to_vec(),
            created_at: Some(chrono::Local::now()),
        }
        .save(path)
    }

    /// Performs one planned move, returning the path actually used.
    ///
    /// Directories it has to create are appended to `created_dirs`. On
    /// failure, returns the target that was being written alongside the error.
    fn transfer(
        &self,
        planned: &Move,
        created_dirs: &mut Vec<PathBuf>,
    ) -> Result<PathBuf, (PathBuf, io::Error)> {
        let fail = |e: io::Error| (planned.target.clone(), e);

        let parent = planned.target.parent().ok_or_else(|| {
            fail(io::Error::new(
                io::ErrorKind::InvalidInput,
                "target has no parent directory",
            ))
        })?;
        let missing = missing_ancestors(parent).map_err(fail)?;
        fs::create_dir_all(parent).map_err(fail)?;
        created_dirs.extend(missing);

        let final_target = next_free_path(&planned.target).map_err(fail)?;
        let result = if self.copy {
            copy_with_metadata(&planned.source, &final_target)
        } else {
            move_file(&planned.source, &final_target)
        };
        result.map_err(|e| (final_target.clone(), e))?;

        Ok(final_target)
    }
}

/// Returns `target` if nothing exists there, otherwise the first free
/// `stem (n).ext` next to it, counting from 1.
pub fn next_free_path(target: &Path) -> io::Result<PathBuf> {
    let mut candidate = target.to_path_buf();
    let mut counter = 1;
    while path_taken(&candidate)? {
        candidate = disambiguated(target, counter);
        counter += 1;
    }
    Ok(candidate)
}

fn disambiguated(target: &Path, counter: usize) -> PathBuf {
    let mut name: OsString = target.file_stem().map(|s| s.to_os_string()).unwrap_or_default();
    name.push(format!(" ({})", counter));
    if let Some(ext) = target.extension() {
        name.push(".");
        name.push(ext);
    }
    target.with_file_name(name)
}

/// The directories `create_dir_all(dir)` would create, outermost first.
fn missing_ancestors(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut missing = Vec::new();
    for ancestor in dir.ancestors() {
        if ancestor.as_os_str().is_empty() || path_taken(ancestor)? {
            break;
        }
        missing.push(ancestor.to_path_buf());
    }
    missing.reverse();
    Ok(missing)
}

/// Anything at the path counts, including dangling symlinks.
pub(crate) fn path_taken(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Copies contents and permissions, then carries over access and
/// modification times.
pub(crate) fn copy_with_metadata(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;

    let metadata = fs::metadata(from)?;
    let mut times = FileTimes::new().set_modified(metadata.modified()?);
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }

    // A read-only copy cannot be opened for writing everywhere.
    let file = File::options()
        .write(true)
        .open(to)
        .or_else(|_| File::open(to))?;
    file.set_times(times)
}

/// Renames, falling back to copy and delete across filesystems.
pub(crate) fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_with_metadata(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}
