/// The manifest: a JSON record of what one apply run did.
///
/// The applier writes it once, after its operations, and the undo engine
/// reads it later to put every file back. The format is plain JSON so any
/// process can read what another wrote:
///
/// ```json
/// {
///   "version": 1,
///   "copy": false,
///   "by": "ext",
///   "date_field": "mtime",
///   "root": "/home/me/inbox",
///   "dest": "/home/me/inbox/organized",
///   "operations": [{ "src": "/home/me/inbox/a.txt", "dest": "/home/me/inbox/organized/txt/a.txt" }],
///   "created_dirs": ["/home/me/inbox/organized", "/home/me/inbox/organized/txt"],
///   "created_at": "2024-03-07T12:00:00+01:00"
/// }
/// ```
use crate::error::{OrganizeError, OrganizeResult};
use crate::grouping::{DateField, GroupBy};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Current manifest schema version.
pub const MANIFEST_VERSION: u32 = 1;

/// One performed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Where the file was before the run.
    pub src: PathBuf,
    /// Where it ended up, after collision resolution.
    pub dest: PathBuf,
}

/// Persisted record of one apply invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    /// Files were copied (and still exist at `src`) rather than moved.
    pub copy: bool,
    pub by: GroupBy,
    pub date_field: DateField,
    pub root: PathBuf,
    pub dest: PathBuf,
    /// Operations in the order they were applied.
    pub operations: Vec<ManifestEntry>,
    /// Directories the run created, outermost first. Undo only ever removes
    /// these, and only once they are empty again.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created_dirs: Vec<PathBuf>,
    /// When the manifest was written (RFC 3339 on disk).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Local>>,
}

impl Manifest {
    /// Loads and validates a manifest.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizeError::ManifestRead`] if the file is missing,
    /// unreadable, not valid manifest JSON, or of an unsupported version.
    pub fn load(path: &Path) -> OrganizeResult<Self> {
        let read_error = |reason: String| OrganizeError::ManifestRead {
            path: path.to_path_buf(),
            reason,
        };

        let json_string = fs::read_to_string(path).map_err(|e| read_error(e.to_string()))?;
        let manifest: Manifest = serde_json::from_str(&json_string)
            .map_err(|e| read_error(format!("JSON parse error: {}", e)))?;

        if manifest.version != MANIFEST_VERSION {
            return Err(read_error(format!(
                "unsupported manifest version {} (expected {})",
                manifest.version, MANIFEST_VERSION
            )));
        }

        Ok(manifest)
    }

    /// Writes the manifest to `path`, creating parent directories.
    ///
    /// The JSON goes to a temporary sibling first and is renamed into place,
    /// so readers never observe a half-written manifest.
    pub fn save(&self, path: &Path) -> OrganizeResult<()> {
        let write_error = |source: std::io::Error| OrganizeError::ManifestWrite {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| write_error(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "manifest.json".to_string());
        let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

        fs::write(&temp_path, json_string).map_err(write_error)?;
        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            write_error(e)
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample() -> Manifest {
        Manifest {
            version: MANIFEST_VERSION,
            copy: false,
            by: GroupBy::Ext,
            date_field: DateField::Mtime,
            root: PathBuf::from("/inbox"),
            dest: PathBuf::from("/inbox/organized"),
            operations: vec![ManifestEntry {
                src: PathBuf::from("/inbox/a.txt"),
                dest: PathBuf::from("/inbox/organized/txt/a.txt"),
            }],
            created_dirs: Vec::new(),
            created_at: None,
        }
    }

    #[test]
    fn test_save_uses_documented_field_names() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join("moves.json");

        sample().save(&path).expect("Failed to save manifest");

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["copy"], false);
        assert_eq!(json["by"], "ext");
        assert_eq!(json["date_field"], "mtime");
        assert_eq!(json["root"], "/inbox");
        assert_eq!(json["operations"][0]["src"], "/inbox/a.txt");
        assert_eq!(json["operations"][0]["dest"], "/inbox/organized/txt/a.txt");
        assert!(json.get("created_at").is_none());
        assert!(json.get("created_dirs").is_none());
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("moves.json");

        sample().save(&path).expect("Failed to save manifest");

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("moves.json")]);
    }

    #[test]
    fn test_load_reads_what_save_wrote() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("moves.json");
        let mut manifest = sample();
        manifest.created_at = Some(Local.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap());
        manifest.created_dirs = vec![
            PathBuf::from("/inbox/organized"),
            PathBuf::from("/inbox/organized/txt"),
        ];

        manifest.save(&path).unwrap();

        assert_eq!(Manifest::load(&path).unwrap(), manifest);
    }

    #[test]
    fn test_load_accepts_foreign_writer_output() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("moves.json");
        fs::write(
            &path,
            r#"{"version": 1, "copy": true, "by": "date", "date_field": "ctime",
                "root": "/r", "dest": "/d", "operations": []}"#,
        )
        .unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert!(manifest.copy);
        assert_eq!(manifest.by, GroupBy::Date);
        assert_eq!(manifest.date_field, DateField::Ctime);
        assert!(manifest.operations.is_empty());
        assert!(manifest.created_dirs.is_empty());
        assert!(manifest.created_at.is_none());
    }

    #[test]
    fn test_load_parses_rfc3339_timestamp() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("moves.json");
        fs::write(
            &path,
            r#"{"version": 1, "copy": false, "by": "ext", "date_field": "mtime",
                "root": "/r", "dest": "/d", "operations": [],
                "created_at": "2024-03-07T12:00:00+00:00"}"#,
        )
        .unwrap();

        let manifest = Manifest::load(&path).unwrap();
        let expected = chrono::Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(manifest.created_at.map(|t| t.to_utc()), Some(expected));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Manifest::load(Path::new("/non/existent/moves.json"));
        assert!(matches!(result, Err(OrganizeError::ManifestRead { .. })));
    }

    #[test]
    fn test_load_corrupt_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("moves.json");
        fs::write(&path, "{ not json").unwrap();

        let result = Manifest::load(&path);
        assert!(matches!(result, Err(OrganizeError::ManifestRead { .. })));
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("moves.json");
        let mut manifest = sample();
        manifest.version = 7;
        manifest.save(&path).unwrap();

        match Manifest::load(&path) {
            Err(OrganizeError::ManifestRead { reason, .. }) => {
                assert!(reason.contains("version 7"));
            }
            other => panic!("expected ManifestRead, got {:?}", other),
        }
    }
}
