/// Grouping strategies that decide which subdirectory a file belongs in.
///
/// A file is grouped by its extension, by the primary part of its MIME type,
/// or by the calendar day of one of its timestamps.
///
/// # Examples
///
/// ```
/// use organizer::grouping::{DateField, GroupBy};
/// use std::path::Path;
///
/// let key = GroupBy::Ext.key_for(Path::new("photo.JPG"), DateField::Mtime).unwrap();
/// assert_eq!(key.to_string(), "jpg");
/// ```
use crate::error::{OrganizeError, OrganizeResult};
use chrono::{DateTime, Datelike, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

/// Sentinel key for files without an extension.
pub const NO_EXTENSION: &str = "no-ext";

/// Sentinel key for files whose MIME type cannot be guessed.
pub const UNKNOWN_MIME: &str = "unknown";

/// How files are grouped into destination subdirectories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// Lowercase file extension, e.g. `jpg`.
    #[default]
    Ext,
    /// Primary MIME component, e.g. `image`.
    Mime,
    /// `YYYY/MM/DD` of the chosen timestamp.
    Date,
}

impl GroupBy {
    /// Returns the name used on the command line and in manifests.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupBy::Ext => "ext",
            GroupBy::Mime => "mime",
            GroupBy::Date => "date",
        }
    }

    /// Derives the grouping key for a file.
    ///
    /// `date_field` is only consulted for [`GroupBy::Date`]. Extension and
    /// MIME grouping never fail; date grouping fails if the file's metadata
    /// cannot be read.
    pub fn key_for(&self, path: &Path, date_field: DateField) -> OrganizeResult<GroupKey> {
        match self {
            GroupBy::Ext => Ok(GroupKey::single(extension_key(path))),
            GroupBy::Mime => Ok(GroupKey::single(mime_key(path))),
            GroupBy::Date => {
                let timestamp = date_field.timestamp(path)?;
                Ok(date_key(DateTime::<Local>::from(timestamp)))
            }
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupBy {
    type Err = OrganizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ext" => Ok(GroupBy::Ext),
            "mime" => Ok(GroupBy::Mime),
            "date" => Ok(GroupBy::Date),
            _ => Err(OrganizeError::UnknownGrouping(s.to_string())),
        }
    }
}

/// Which timestamp date grouping reads.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DateField {
    /// Last modification time.
    #[default]
    Mtime,
    /// Creation time. Falls back to the modification time where the
    /// platform or filesystem does not record it.
    Ctime,
}

impl DateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateField::Mtime => "mtime",
            DateField::Ctime => "ctime",
        }
    }

    /// Reads this timestamp from the file's metadata.
    pub fn timestamp(&self, path: &Path) -> OrganizeResult<SystemTime> {
        let io_err = |source: std::io::Error| OrganizeError::Io {
            path: path.to_path_buf(),
            source,
        };
        let metadata = fs::metadata(path).map_err(io_err)?;
        match self {
            DateField::Mtime => metadata.modified().map_err(io_err),
            DateField::Ctime => metadata
                .created()
                .or_else(|_| metadata.modified())
                .map_err(io_err),
        }
    }
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mtime" => Ok(DateField::Mtime),
            "ctime" => Ok(DateField::Ctime),
            other => Err(format!("unknown date field '{}': expected mtime or ctime", other)),
        }
    }
}

/// The destination subdirectory (one or more path segments) for a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    segments: Vec<String>,
}

impl GroupKey {
    fn single(segment: String) -> Self {
        Self {
            segments: vec![segment],
        }
    }

    /// The individual path segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The key as a relative path, using the platform separator.
    pub fn to_path(&self) -> PathBuf {
        self.segments.iter().collect()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Lowercase extension without the dot, or [`NO_EXTENSION`].
///
/// Dotfiles such as `.bashrc` have no extension.
fn extension_key(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| NO_EXTENSION.to_string())
}

/// Primary MIME component, guessed from the file name and then from the
/// file header, or [`UNKNOWN_MIME`].
fn mime_key(path: &Path) -> String {
    if let Some(mime) = mime_guess::from_path(path).first() {
        return mime.type_().as_str().to_lowercase();
    }

    // Nothing to go on in the name; sniff the magic bytes instead.
    match infer::get_from_path(path) {
        Ok(Some(kind)) => kind
            .mime_type()
            .split('/')
            .next()
            .filter(|primary| !primary.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_MIME.to_string()),
        _ => UNKNOWN_MIME.to_string(),
    }
}

fn date_key(datetime: DateTime<Local>) -> GroupKey {
    GroupKey {
        segments: vec![
            format!("{:04}", datetime.year()),
            format!("{:02}", datetime.month()),
            format!("{:02}", datetime.day()),
        ],
    }
}
