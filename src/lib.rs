//! organizer - sort a directory tree into extension, MIME or date folders
//!
//! This library plans where each file under a root should go, applies the
//! plan by copying or moving files (renaming around collisions), records what
//! it did in a JSON manifest, and can undo a run from that manifest.

pub mod applier;
pub mod cli;
pub mod config;
pub mod error;
pub mod grouping;
pub mod manifest;
pub mod output;
pub mod planner;
pub mod report;
pub mod undo;

pub use applier::{ApplyReport, Applier};
pub use config::{CompiledFilters, ConfigError, FilterRules, OrganizerConfig};
pub use error::{OrganizeError, OrganizeResult};
pub use grouping::{DateField, GroupBy, GroupKey};
pub use manifest::{Manifest, ManifestEntry};
pub use planner::{Move, Planner};
pub use report::{Event, Reporter, Verb};
pub use undo::{UndoManager, UndoReport};

pub use cli::{Cli, run_cli};
