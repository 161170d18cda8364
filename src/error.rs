//! Error types shared by the planner, applier and undo engine.

use crate::config::ConfigError;
use crate::report::Verb;
use std::path::PathBuf;

/// Errors that can occur while planning, applying or undoing an organization.
#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    /// The root directory does not exist or is not a directory.
    #[error("Root directory not found: {}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A grouping mode name that is not `ext`, `mime` or `date`.
    #[error("Unknown grouping '{0}': expected ext, mime or date")]
    UnknownGrouping(String),

    /// The manifest is missing, unreadable or malformed.
    #[error("Failed to read manifest {}: {reason}", path.display())]
    ManifestRead { path: PathBuf, reason: String },

    /// The manifest could not be written after the operations went through.
    #[error("Operations completed but the manifest could not be written to {}: {source}", path.display())]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single copy, move or undo-move failed. The batch stops here.
    #[error("Failed to {verb} {} -> {} after {completed} completed operation(s): {error}", from.display(), to.display())]
    OperationFailure {
        verb: Verb,
        from: PathBuf,
        to: PathBuf,
        completed: usize,
        #[source]
        error: std::io::Error,
    },

    /// Reading file metadata during planning failed.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for organizer operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;
