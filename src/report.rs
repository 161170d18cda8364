//! Progress reporting for planning, applying and undoing.
//!
//! Components never print on their own. They emit [`Event`]s into a
//! [`Reporter`] handed to them by the caller, so the CLI can render colored
//! output while tests simply record what happened.
//!
//! ```
//! use organizer::report::{Event, Reporter};
//!
//! let mut events: Vec<Event> = Vec::new();
//! events.report(Event::Planned { count: 2 });
//! assert_eq!(events, vec![Event::Planned { count: 2 }]);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// The kind of file transfer an action performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Copy the file, leaving the source in place.
    Copy,
    /// Move the file, removing it from the source.
    Move,
    /// Move a previously organized file back to where it came from.
    Undo,
}

impl Verb {
    /// Returns the upper-case label used in reports, e.g. `COPY`.
    pub fn label(&self) -> &'static str {
        match self {
            Verb::Copy => "COPY",
            Verb::Move => "MOVE",
            Verb::Undo => "UNDO",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Copy => write!(f, "copy"),
            Verb::Move => write!(f, "move"),
            Verb::Undo => write!(f, "restore"),
        }
    }
}

/// Something worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Planning finished with this many moves.
    Planned { count: usize },
    /// A batch of `total` actions is about to run.
    Started {
        verb: Verb,
        total: usize,
        dry_run: bool,
    },
    /// One action was performed (or would be, in a dry run).
    Action {
        verb: Verb,
        from: PathBuf,
        to: PathBuf,
        dry_run: bool,
    },
    /// An entry was left alone.
    Skipped { path: PathBuf, reason: String },
    /// Something unexpected that did not stop the run.
    Warning(String),
    /// The manifest was written with this many operations.
    ManifestWritten { path: PathBuf, operations: usize },
    /// The batch finished after processing `count` actions.
    Finished {
        verb: Verb,
        count: usize,
        dry_run: bool,
    },
    /// Planned files per group directory (e.g. `jpg`, `2024/03/07`).
    Summary {
        groups: BTreeMap<String, usize>,
        total: usize,
    },
    /// The run was refused before anything happened.
    Error(String),
}

/// Receives events from the planner, applier and undo engine.
pub trait Reporter {
    fn report(&mut self, event: Event);
}

/// Collects every event, in order.
impl Reporter for Vec<Event> {
    fn report(&mut self, event: Event) {
        self.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_reporter_keeps_order() {
        let mut events: Vec<Event> = Vec::new();
        events.report(Event::Planned { count: 1 });
        events.report(Event::Warning("careful".to_string()));

        assert_eq!(
            events,
            vec![
                Event::Planned { count: 1 },
                Event::Warning("careful".to_string())
            ]
        );
    }

    #[test]
    fn test_verb_labels() {
        assert_eq!(Verb::Copy.label(), "COPY");
        assert_eq!(Verb::Move.label(), "MOVE");
        assert_eq!(Verb::Undo.label(), "UNDO");
        assert_eq!(Verb::Undo.to_string(), "restore");
    }
}
