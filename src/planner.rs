/// Planning: decide where every file under a root should go.
///
/// The planner walks the root directory, applies depth and glob filters,
/// skips anything already inside the destination tree and derives a target
/// path for each remaining file. It never writes to the filesystem.
use crate::config::CompiledFilters;
use crate::error::{OrganizeError, OrganizeResult};
use crate::grouping::{DateField, GroupBy};
use crate::report::{Event, Reporter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A single planned transfer.
///
/// `target` is the destination before collision resolution; the applier may
/// end up using a disambiguated name next to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Move {
    /// Absolute path of an existing regular file.
    pub source: PathBuf,
    /// `dest / group key / file name`.
    pub target: PathBuf,
}

/// Computes the moves needed to organize a directory tree.
///
/// # Examples
///
/// ```no_run
/// use organizer::grouping::GroupBy;
/// use organizer::planner::Planner;
/// use organizer::report::Event;
///
/// let mut events: Vec<Event> = Vec::new();
/// let moves = Planner::new("/home/me/Downloads", "/home/me/Downloads/organized")
///     .by(GroupBy::Mime)
///     .max_depth(Some(1))
///     .plan(&mut events)
///     .expect("planning failed");
/// println!("{} files to organize", moves.len());
/// ```
#[derive(Debug, Clone)]
pub struct Planner {
    root: PathBuf,
    dest: PathBuf,
    by: GroupBy,
    date_field: DateField,
    filters: CompiledFilters,
    max_depth: Option<usize>,
}

impl Planner {
    /// Creates a planner grouping by extension with no filters and no depth limit.
    pub fn new(root: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dest: dest.into(),
            by: GroupBy::default(),
            date_field: DateField::default(),
            filters: CompiledFilters::default(),
            max_depth: None,
        }
    }

    pub fn by(mut self, by: GroupBy) -> Self {
        self.by = by;
        self
    }

    pub fn date_field(mut self, date_field: DateField) -> Self {
        self.date_field = date_field;
        self
    }

    pub fn filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Limits traversal to files at most `max_depth` segments below the root.
    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn group_by(&self) -> GroupBy {
        self.by
    }

    pub fn selected_date_field(&self) -> DateField {
        self.date_field
    }

    /// The canonical root directory.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizeError::NotFound`] if the root does not exist or is
    /// not a directory.
    pub fn resolved_root(&self) -> OrganizeResult<PathBuf> {
        let root = fs::canonicalize(&self.root).map_err(|source| OrganizeError::NotFound {
            path: self.root.clone(),
            source,
        })?;
        if !root.is_dir() {
            return Err(OrganizeError::NotFound {
                path: self.root.clone(),
                source: io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            });
        }
        Ok(root)
    }

    /// The absolute destination, canonicalized as far as it exists.
    pub fn resolved_dest(&self) -> OrganizeResult<PathBuf> {
        resolve_path(&self.dest).map_err(|source| OrganizeError::Io {
            path: self.dest.clone(),
            source,
        })
    }

    /// Plans one move per eligible file.
    ///
    /// Files come out in traversal order (sorted by name within each
    /// directory), so planning the same unchanged tree twice yields the same
    /// list.
    pub fn plan(&self, reporter: &mut dyn Reporter) -> OrganizeResult<Vec<Move>> {
        let root = self.resolved_root()?;
        let dest = self.resolved_dest()?;

        let mut moves = Vec::new();
        for entry in self.walk(&root, &dest) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    reporter.report(Event::Skipped {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let source = entry.path();
            // The root itself may sit inside the destination tree.
            if source.parent().is_some_and(|parent| parent.starts_with(&dest)) {
                continue;
            }
            let Ok(relative) = source.strip_prefix(&root) else {
                continue;
            };
            if !self.filters.should_include(relative) {
                continue;
            }

            let key = self.by.key_for(source, self.date_field)?;
            let target = dest.join(key.to_path()).join(entry.file_name());
            moves.push(Move {
                source: source.to_path_buf(),
                target,
            });
        }

        reporter.report(Event::Planned { count: moves.len() });
        Ok(moves)
    }

    /// Fresh traversal of `root`, pruning the destination tree and anything
    /// deeper than the depth limit.
    fn walk(
        &self,
        root: &Path,
        dest: &Path,
    ) -> impl Iterator<Item = walkdir::Result<walkdir::DirEntry>> {
        let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let dest = dest.to_path_buf();
        walker
            .into_iter()
            .filter_entry(move |entry| !(entry.file_type().is_dir() && entry.path().starts_with(&dest)))
    }
}

/// Makes `path` absolute and canonical up to its deepest existing ancestor.
///
/// The destination usually does not exist before the first run, but it must
/// still compare equal to the canonical paths the walker produces.
pub fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;

    for ancestor in absolute.ancestors() {
        if let Ok(canonical) = fs::canonicalize(ancestor) {
            let remainder = absolute
                .strip_prefix(ancestor)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            return Ok(canonical.join(remainder));
        }
    }

    Ok(absolute)
}
