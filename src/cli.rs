//! Command-line interface module for organizer.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Merging flags with the configuration file
//! - Planning and applying an organization
//! - Undo operation handling

use crate::applier::Applier;
use crate::config::OrganizerConfig;
use crate::error::OrganizeResult;
use crate::grouping::{DateField, GroupBy};
use crate::planner::{Move, Planner};
use crate::report::{Event, Reporter};
use crate::undo::UndoManager;
use clap::Parser;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Exit code for invalid flag combinations.
pub const EXIT_USAGE: u8 = 2;

/// Organize files by extension, MIME type, or date.
#[derive(Debug, Clone, Parser)]
#[command(name = "organizer", version, about, long_about = None)]
pub struct Cli {
    /// Directory to organize
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Grouping strategy [default: ext]
    #[arg(long, value_enum)]
    pub by: Option<GroupBy>,

    /// Which timestamp to use when grouping by date [default: mtime]
    #[arg(long, value_enum)]
    pub date_field: Option<DateField>,

    /// Destination base directory [default: <PATH>/organized]
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Copy files instead of moving them
    #[arg(long)]
    pub copy: bool,

    /// Show what would happen; no changes made
    #[arg(long)]
    pub dry_run: bool,

    /// Manifest file to record operations to, or to undo from
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Glob patterns to include (e.g. '*.jpg' '*.png')
    #[arg(long, num_args = 1..)]
    pub include: Option<Vec<String>>,

    /// Glob patterns to exclude (e.g. '*.tmp')
    #[arg(long, num_args = 1..)]
    pub exclude: Vec<String>,

    /// Recurse at most this many levels below PATH
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Undo the operations recorded in --manifest
    #[arg(long)]
    pub undo: bool,

    /// One line per operation instead of a progress bar
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file [default: ./.organizerrc.toml, then ~/.config/organizer/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Runs the command described by `cli`, returning the process exit code.
///
/// Core failures come back as errors so the caller decides how to exit.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use organizer::cli::{Cli, run_cli};
/// use organizer::output::ConsoleReporter;
///
/// let cli = Cli::parse_from(["organizer", "/home/me/Downloads", "--by", "mime", "--dry-run"]);
/// let code = run_cli(&cli, &mut ConsoleReporter::new(false)).expect("organize failed");
/// assert_eq!(code, 0);
/// ```
pub fn run_cli(cli: &Cli, reporter: &mut dyn Reporter) -> OrganizeResult<u8> {
    if cli.undo {
        let Some(manifest) = &cli.manifest else {
            reporter.report(Event::Error(
                "--undo requires --manifest path to a manifest JSON file.".to_string(),
            ));
            return Ok(EXIT_USAGE);
        };
        UndoManager::new(manifest)
            .dry_run(cli.dry_run)
            .undo(reporter)?;
        return Ok(0);
    }

    let config = OrganizerConfig::load(cli.config.as_deref())?;
    let planner = build_planner(cli, &config)?;
    let moves = planner.plan(reporter)?;

    Applier::for_planner(&planner)?
        .copy(cli.copy || config.organize.copy)
        .dry_run(cli.dry_run)
        .manifest(cli.manifest.clone())
        .apply(&moves, reporter)?;

    if cli.dry_run && !moves.is_empty() {
        let dest = planner.resolved_dest()?;
        reporter.report(Event::Summary {
            groups: group_counts(&moves, &dest),
            total: moves.len(),
        });
    }

    Ok(0)
}

/// Combines flags and configuration; flags win.
fn build_planner(cli: &Cli, config: &OrganizerConfig) -> OrganizeResult<Planner> {
    let by = match cli.by {
        Some(by) => by,
        None => config.organize.group_by()?.unwrap_or_default(),
    };
    let date_field = match cli.date_field {
        Some(field) => field,
        None => config.organize.date_field()?.unwrap_or_default(),
    };
    let dest = cli
        .dest
        .clone()
        .or_else(|| config.organize.dest.clone())
        .unwrap_or_else(|| cli.path.join("organized"));

    let mut rules = config.filters.clone();
    rules.merge_cli(cli.include.clone(), cli.exclude.clone());

    Ok(Planner::new(&cli.path, dest)
        .by(by)
        .date_field(date_field)
        .filters(rules.compile()?)
        .max_depth(cli.max_depth.or(config.organize.max_depth)))
}

/// Counts planned files per group directory, e.g. `jpg` or `2024/03/07`.
fn group_counts(moves: &[Move], dest: &Path) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for planned in moves {
        let group = planned
            .target
            .parent()
            .and_then(|parent| parent.strip_prefix(dest).ok())
            .map(|group| group.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        *counts.entry(group).or_insert(0) += 1;
    }
    counts
}
