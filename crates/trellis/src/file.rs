//! Snapshot file storage.
//!
//! Snapshots are stored as pretty-printed JSON. Writes go to a temporary file
//! in the destination directory which is then renamed over the target, so a
//! crash mid-write never leaves a truncated snapshot behind.
//!
//! ```no_run
//! use trellis::Runtime;
//! use trellis::file::{load_snapshot, save_snapshot};
//!
//! # fn main() -> Result<(), trellis::file::FileError> {
//! let runtime = Runtime::new();
//! save_snapshot("layout.json", &runtime.save_snapshot("2.4"))?;
//! let document = load_snapshot("layout.json")?;
//! assert_eq!(document.application_version, "2.4");
//! # Ok(())
//! # }
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use trellis_core::{RestoreError, SnapshotDocument};

/// Errors from snapshot file operations.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// Reading, writing or renaming failed.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The document could not be encoded.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    /// The file exists but does not hold a snapshot document.
    #[error("failed to decode '{}': {source}", .path.display())]
    Decode {
        /// The file involved.
        path: PathBuf,
        /// The decode failure.
        #[source]
        source: RestoreError,
    },
}

impl FileError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// The file involved, if the error concerns one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. } | Self::Decode { path, .. } => Some(path),
            Self::Encode(_) => None,
        }
    }
}

/// Result type for snapshot file operations.
pub type FileResult<T> = Result<T, FileError>;

/// Atomically write `document` to `path`.
pub fn save_snapshot(path: impl AsRef<Path>, document: &SnapshotDocument) -> FileResult<()> {
    let path = path.as_ref();
    let text = document.to_json_pretty()?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir).map_err(|e| FileError::io(path, e))?;
    temp.write_all(text.as_bytes())
        .map_err(|e| FileError::io(path, e))?;
    temp.as_file().sync_all().map_err(|e| FileError::io(path, e))?;
    temp.persist(path).map_err(|e| FileError::io(path, e.error))?;

    tracing::debug!(
        target: "trellis::file",
        path = %path.display(),
        records = document.objects.len(),
        "snapshot written"
    );
    Ok(())
}

/// Read the snapshot at `path`.
///
/// A missing or blank file yields the empty document, which
/// [`Runtime::restore_snapshot`](trellis_core::Runtime::restore_snapshot)
/// rejects with [`RestoreError::EmptySettings`].
pub fn load_snapshot(path: impl AsRef<Path>) -> FileResult<SnapshotDocument> {
    let path = path.as_ref();
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(target: "trellis::file", path = %path.display(), "no snapshot file");
            return Ok(SnapshotDocument::default());
        }
        Err(e) => return Err(FileError::io(path, e)),
    };
    SnapshotDocument::from_json(&text).map_err(|source| FileError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{ObjectKind, SettingsValue, SnapshotRecord};

    fn sample() -> SnapshotDocument {
        SnapshotDocument {
            application_version: "2.4".into(),
            schema_version: "1.0".into(),
            objects: vec![SnapshotRecord {
                alias: "Out".into(),
                kind: ObjectKind::Dock,
                settings: SettingsValue::object().with("width", 320),
            }],
        }
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");

        save_snapshot(&path, &sample()).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), sample());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"kind\": \"dock\""));
    }

    #[test]
    fn test_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        save_snapshot(&path, &SnapshotDocument::default()).unwrap();
        save_snapshot(&path, &sample()).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), sample());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_and_blank() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nothing.json");
        assert!(load_snapshot(&missing).unwrap().is_empty());

        let blank = dir.path().join("blank.json");
        fs::write(&blank, "\n").unwrap();
        assert!(load_snapshot(&blank).unwrap().is_empty());
    }

    #[test]
    fn test_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[1, 2").unwrap();

        let err = load_snapshot(&path).unwrap_err();
        assert!(matches!(
            err,
            FileError::Decode {
                source: RestoreError::Malformed(_),
                ..
            }
        ));
        assert_eq!(err.path(), Some(path.as_path()));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/layout.json");
        let err = save_snapshot(&path, &sample()).unwrap_err();
        assert!(matches!(err, FileError::Io { .. }));
    }
}
