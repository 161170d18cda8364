//! Configuration file support and include/exclude filtering.
//!
//! Settings are read from a TOML file and merged with command-line flags,
//! which always win. Filters are compiled once into [`CompiledFilters`] and
//! then matched against each file's path relative to the organized root.
//!
//! # Configuration File Format
//!
//! ```toml
//! [organize]
//! by = "date"
//! date_field = "mtime"
//! copy = false
//! dest = "/data/sorted"
//! max_depth = 3
//!
//! [filters]
//! skip_hidden = false
//! include = ["*.jpg", "*.png"]
//!
//! [filters.exclude]
//! patterns = ["*.tmp", "cache/**"]
//! filenames = [".DS_Store", "Thumbs.db"]
//! extensions = ["bak"]
//! regex = []
//! ```
//!
//! # Glob semantics
//!
//! `*`, `?` and `[...]` never cross a `/`. A pattern without `**` is matched
//! against as many trailing segments of the relative path as the pattern
//! has, so `*.jpg` matches `a.jpg` and `trips/2023/a.jpg` alike while
//! `trips/*.jpg` only matches files directly inside some `trips` directory.
//! Patterns containing `**`, or starting with `/`, must match the whole
//! relative path.

use crate::error::OrganizeResult;
use crate::grouping::{DateField, GroupBy};
use glob::{MatchOptions, Pattern};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".organizerrc.toml";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Errors that can occur during configuration loading and filter compilation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlobPattern { pattern: String, reason: String },
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
    #[error("IO error reading configuration: {0}")]
    Io(String),
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerConfig {
    pub organize: OrganizeDefaults,
    pub filters: FilterRules,
}

/// Defaults for the organize run itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeDefaults {
    /// Grouping mode name: `ext`, `mime` or `date`.
    pub by: Option<String>,
    /// Timestamp for date grouping: `mtime` or `ctime`.
    pub date_field: Option<String>,
    pub copy: bool,
    pub dest: Option<PathBuf>,
    pub max_depth: Option<usize>,
}

impl OrganizeDefaults {
    /// Parses the configured grouping mode, if any.
    pub fn group_by(&self) -> OrganizeResult<Option<GroupBy>> {
        self.by.as_deref().map(str::parse::<GroupBy>).transpose()
    }

    /// Parses the configured date field, if any.
    pub fn date_field(&self) -> Result<Option<DateField>, ConfigError> {
        self.date_field
            .as_deref()
            .map(|s| s.parse::<DateField>().map_err(ConfigError::Invalid))
            .transpose()
    }
}

/// File filtering rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    /// Leave files and directories whose name starts with `.` alone.
    pub skip_hidden: bool,
    /// When non-empty, only files matching at least one of these globs are organized.
    pub include: Vec<String>,
    pub exclude: ExcludeRules,
}

/// Rules for excluding files. Exclusion always beats inclusion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeRules {
    /// Glob patterns (e.g. `*.tmp`, `cache/**`).
    pub patterns: Vec<String>,
    /// Exact file names (e.g. `.DS_Store`).
    pub filenames: Vec<String>,
    /// Extensions without the dot, compared case-insensitively.
    pub extensions: Vec<String>,
    /// Regexes matched against the file name.
    pub regex: Vec<String>,
}

impl FilterRules {
    /// Builds rules from command-line style include/exclude lists.
    pub fn from_globs(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include,
            exclude: ExcludeRules {
                patterns: exclude,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Merges command-line globs into these rules.
    ///
    /// `include` replaces the configured include list when given; `exclude`
    /// patterns are added to the configured ones.
    pub fn merge_cli(&mut self, include: Option<Vec<String>>, exclude: Vec<String>) {
        if let Some(include) = include {
            self.include = include;
        }
        self.exclude.patterns.extend(exclude);
    }

    /// Compiles the rules into matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex pattern is invalid.
    pub fn compile(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(self)
    }
}

impl OrganizerConfig {
    /// Load configuration, falling back to defaults.
    ///
    /// Looks, in order, at:
    /// 1. `config_path`, if provided
    /// 2. `.organizerrc.toml` in the current directory
    /// 3. `~/.config/organizer/config.toml`
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file is missing, or if any
    /// file found cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("organizer")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// A glob that understands path segments.
#[derive(Debug, Clone)]
struct PathGlob {
    pattern: Pattern,
    /// Number of trailing segments to compare, when not anchored.
    segments: usize,
    /// Match against the whole relative path.
    anchored: bool,
}

impl PathGlob {
    fn new(raw: &str) -> Result<Self, ConfigError> {
        let normalized = raw.replace('\\', "/");
        let anchored = normalized.starts_with('/') || normalized.contains("**");
        let body = normalized.trim_start_matches('/');

        let pattern = Pattern::new(body).map_err(|e| ConfigError::InvalidGlobPattern {
            pattern: raw.to_string(),
            reason: e.msg.to_string(),
        })?;
        let segments = body.split('/').filter(|s| !s.is_empty()).count();

        Ok(Self {
            pattern,
            segments,
            anchored,
        })
    }

    fn matches(&self, segments: &[String]) -> bool {
        let candidate = if self.anchored {
            segments.join("/")
        } else {
            if segments.len() < self.segments || self.segments == 0 {
                return false;
            }
            segments[segments.len() - self.segments..].join("/")
        };
        self.pattern.matches_with(&candidate, MATCH_OPTIONS)
    }
}

/// Pre-compiled filter rules.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilters {
    skip_hidden: bool,
    include_patterns: Vec<PathGlob>,
    exclude_patterns: Vec<PathGlob>,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_regexes: Vec<Regex>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let compile_globs = |patterns: &[String]| {
            patterns
                .iter()
                .map(|p| PathGlob::new(p))
                .collect::<Result<Vec<_>, _>>()
        };

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            skip_hidden: rules.skip_hidden,
            include_patterns: compile_globs(rules.include.as_slice())?,
            exclude_patterns: compile_globs(rules.exclude.patterns.as_slice())?,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_regexes,
        })
    }

    /// Checks whether a file, given by its path relative to the root, should
    /// be organized.
    ///
    /// 1. Hidden entries are rejected when `skip_hidden` is set
    /// 2. With include patterns present, at least one must match
    /// 3. Any exclude rule (name, extension, glob, regex) rejects the file
    pub fn should_include(&self, relative_path: &Path) -> bool {
        let segments: Vec<String> = relative_path
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let Some(file_name) = segments.last() else {
            return false;
        };

        if self.skip_hidden && segments.iter().any(|s| s.starts_with('.')) {
            return false;
        }

        if !self.include_patterns.is_empty()
            && !self.include_patterns.iter().any(|p| p.matches(&segments))
        {
            return false;
        }

        if self.exclude_filenames.contains(file_name) {
            return false;
        }

        if let Some(ext) = relative_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self.exclude_patterns.iter().any(|p| p.matches(&segments)) {
            return false;
        }

        !self.exclude_regexes.iter().any(|r| r.is_match(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrganizeError;
    use tempfile::TempDir;

    fn globs(include: &[&str], exclude: &[&str]) -> CompiledFilters {
        FilterRules::from_globs(
            include.iter().map(|s| s.to_string()).collect(),
            exclude.iter().map(|s| s.to_string()).collect(),
        )
        .compile()
        .unwrap()
    }

    #[test]
    fn test_default_includes_everything() {
        let compiled = FilterRules::default().compile().unwrap();

        assert!(compiled.should_include(Path::new("a.txt")));
        assert!(compiled.should_include(Path::new(".hidden")));
        assert!(compiled.should_include(Path::new("deep/nested/file")));
    }

    #[test]
    fn test_skip_hidden() {
        let rules = FilterRules {
            skip_hidden: true,
            ..Default::default()
        };
        let compiled = rules.compile().unwrap();

        assert!(!compiled.should_include(Path::new(".DS_Store")));
        assert!(!compiled.should_include(Path::new(".git/config")));
        assert!(compiled.should_include(Path::new("visible.txt")));
    }

    #[test]
    fn test_include_matches_trailing_segments() {
        let compiled = globs(&["*.jpg"], &[]);

        assert!(compiled.should_include(Path::new("a.jpg")));
        assert!(compiled.should_include(Path::new("trips/2023/a.jpg")));
        assert!(!compiled.should_include(Path::new("a.png")));
    }

    #[test]
    fn test_star_does_not_cross_separator() {
        let compiled = globs(&["trips/*.jpg"], &[]);

        assert!(compiled.should_include(Path::new("trips/a.jpg")));
        assert!(compiled.should_include(Path::new("old/trips/a.jpg")));
        assert!(!compiled.should_include(Path::new("trips/2023/a.jpg")));
        assert!(!compiled.should_include(Path::new("a.jpg")));
    }

    #[test]
    fn test_leading_slash_anchors_to_root() {
        let compiled = globs(&["/*.txt"], &[]);

        assert!(compiled.should_include(Path::new("top.txt")));
        assert!(!compiled.should_include(Path::new("sub/inner.txt")));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let compiled = globs(&["*.txt"], &["secret*"]);

        assert!(compiled.should_include(Path::new("notes.txt")));
        assert!(!compiled.should_include(Path::new("secret.txt")));
        assert!(!compiled.should_include(Path::new("image.png")));
    }

    #[test]
    fn test_glob_pattern_directory_boundary_semantics() {
        let compiled = globs(&[], &["**/logs/**"]);

        assert!(!compiled.should_include(Path::new("logs/file.txt")));
        assert!(!compiled.should_include(Path::new("app/logs/file.txt")));
        assert!(compiled.should_include(Path::new("my_logs/file.txt")));
        assert!(compiled.should_include(Path::new("app/my_logs/file.txt")));
    }

    #[test]
    fn test_glob_pattern_complex_nested_directories() {
        let compiled = globs(&[], &["**/src/**/test_*.rs"]);

        assert!(!compiled.should_include(Path::new("src/test_main.rs")));
        assert!(!compiled.should_include(Path::new("src/utils/test_helpers.rs")));
        assert!(!compiled.should_include(Path::new("project/src/deep/nested/path/test_utils.rs")));
        assert!(compiled.should_include(Path::new("src/main.rs")));
        assert!(compiled.should_include(Path::new("test_main.rs")));
    }

    #[test]
    fn test_glob_character_class_and_single_char() {
        let compiled = globs(&[], &["[0-9]*.tmp", "file?.txt"]);

        assert!(!compiled.should_include(Path::new("1cache.tmp")));
        assert!(compiled.should_include(Path::new("cache.tmp")));
        assert!(!compiled.should_include(Path::new("file1.txt")));
        assert!(compiled.should_include(Path::new("file12.txt")));
    }

    #[test]
    fn test_exclude_filenames_extensions_and_regex() {
        let rules = FilterRules {
            exclude: ExcludeRules {
                filenames: vec!["Thumbs.db".to_string()],
                extensions: vec!["bak".to_string(), ".tmp".to_string()],
                regex: vec![r"^~\$".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let compiled = rules.compile().unwrap();

        assert!(!compiled.should_include(Path::new("photos/Thumbs.db")));
        assert!(!compiled.should_include(Path::new("file.BAK")));
        assert!(!compiled.should_include(Path::new("file.tmp")));
        assert!(!compiled.should_include(Path::new("~$report.docx")));
        assert!(compiled.should_include(Path::new("report.docx")));
    }

    #[test]
    fn test_invalid_patterns_return_errors() {
        let bad_glob = FilterRules::from_globs(vec![], vec!["[invalid".to_string()]).compile();
        assert!(matches!(bad_glob, Err(ConfigError::InvalidGlobPattern { .. })));

        let bad_regex = FilterRules {
            exclude: ExcludeRules {
                regex: vec!["[invalid(".to_string()],
                ..Default::default()
            },
            ..Default::default()
        }
        .compile();
        assert!(matches!(bad_regex, Err(ConfigError::InvalidRegexPattern { .. })));
    }

    #[test]
    fn test_merge_cli_replaces_include_and_extends_exclude() {
        let mut rules = FilterRules::from_globs(vec!["*.png".to_string()], vec!["*.tmp".to_string()]);
        rules.merge_cli(Some(vec!["*.jpg".to_string()]), vec!["*.log".to_string()]);

        assert_eq!(rules.include, vec!["*.jpg"]);
        assert_eq!(rules.exclude.patterns, vec!["*.tmp", "*.log"]);

        rules.merge_cli(None, vec![]);
        assert_eq!(rules.include, vec!["*.jpg"]);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[organize]
by = "date"
date_field = "ctime"
copy = true
max_depth = 2

[filters]
skip_hidden = true
include = ["*.jpg"]

[filters.exclude]
patterns = ["*.tmp"]
"#,
        )
        .expect("Failed to write config");

        let config = OrganizerConfig::load(Some(&path)).unwrap();

        assert_eq!(config.organize.group_by().unwrap(), Some(GroupBy::Date));
        assert_eq!(config.organize.date_field().unwrap(), Some(DateField::Ctime));
        assert!(config.organize.copy);
        assert_eq!(config.organize.max_depth, Some(2));
        assert!(config.filters.skip_hidden);
        assert_eq!(config.filters.include, vec!["*.jpg"]);
        assert_eq!(config.filters.exclude.patterns, vec!["*.tmp"]);
    }

    #[test]
    fn test_unknown_grouping_in_config() {
        let defaults = OrganizeDefaults {
            by: Some("size".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            defaults.group_by(),
            Err(OrganizeError::UnknownGrouping(_))
        ));
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let result = OrganizerConfig::load(Some(Path::new("/non/existent/config.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[organize\nby = ").expect("Failed to write config");

        let result = OrganizerConfig::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
