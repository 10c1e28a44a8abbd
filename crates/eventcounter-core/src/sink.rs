//! Output collaborators for flushed counts.
//!
//! On shutdown the coordinator hands each non-empty kind's counts to a
//! [`ResultSink`]. [`JsonFileSink`] writes one `<kind>.json` artifact per
//! kind; [`MemorySink`] keeps the artifacts in memory for embedding and
//! tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use eventcounter_types::EventKind;
use tracing::info;

use crate::counter::CountSnapshot;

/// Failures a sink can report for a single kind.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The counts could not be serialized.
    #[error("failed to serialize counts: {source}")]
    Serialize {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },

    /// The artifact could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// Destination of the artifact.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The sink refused the artifact.
    #[error("sink rejected artifact: {0}")]
    Rejected(String),
}

/// Receives the final counts of one event kind.
pub trait ResultSink: Send + Sync {
    /// Persist `counts` (user -> count) for `kind`.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if the artifact could not be produced.
    fn write(&self, kind: EventKind, counts: &BTreeMap<String, u64>) -> Result<(), SinkError>;
}

/// Writes `<dir>/<kind>.json`, pretty-printed with two-space indentation.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    /// Create a sink writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the artifact for `kind`.
    pub fn artifact_path(&self, kind: EventKind) -> PathBuf {
        self.dir.join(format!("{kind}.json"))
    }
}

impl ResultSink for JsonFileSink {
    fn write(&self, kind: EventKind, counts: &BTreeMap<String, u64>) -> Result<(), SinkError> {
        let data = serde_json::to_vec_pretty(counts)?;
        let path = self.artifact_path(kind);
        fs::write(&path, data).map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;
        set_world_readable(&path)?;
        info!(
            kind = %kind,
            path = %path.display(),
            users = counts.len(),
            "results written"
        );
        Ok(())
    }
}

#[cfg(unix)]
fn set_world_readable(path: &Path) -> Result<(), SinkError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o644)).map_err(|source| {
        SinkError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(not(unix))]
fn set_world_readable(_path: &Path) -> Result<(), SinkError> {
    Ok(())
}

/// Collects artifacts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: Mutex<CountSnapshot>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every artifact written so far, keyed by kind.
    pub fn artifacts(&self) -> CountSnapshot {
        self.artifacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ResultSink for MemorySink {
    fn write(&self, kind: EventKind, counts: &BTreeMap<String, u64>) -> Result<(), SinkError> {
        self.artifacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, counts.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(u, n)| ((*u).to_owned(), *n)).collect()
    }

    #[test]
    fn json_artifact_is_pretty_printed_with_two_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());

        sink.write(EventKind::Created, &counts(&[("u1", 2), ("u2", 1)]))
            .unwrap();

        let written = fs::read_to_string(dir.path().join("created.json")).unwrap();
        assert_eq!(written, "{\n  \"u1\": 2,\n  \"u2\": 1\n}");
    }

    #[cfg(unix)]
    #[test]
    fn json_artifact_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());
        sink.write(EventKind::Deleted, &counts(&[("u1", 1)])).unwrap();

        let mode = fs::metadata(sink.artifact_path(EventKind::Deleted))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn missing_directory_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path().join("does-not-exist"));

        let result = sink.write(EventKind::Updated, &counts(&[("u1", 1)]));
        assert!(matches!(result, Err(SinkError::Io { .. })));
    }

    #[test]
    fn memory_sink_keeps_latest_artifact_per_kind() {
        let sink = MemorySink::new();
        sink.write(EventKind::Updated, &counts(&[("u1", 1)])).unwrap();
        sink.write(EventKind::Updated, &counts(&[("u1", 5)])).unwrap();

        let artifacts = sink.artifacts();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(
            artifacts.get(&EventKind::Updated).unwrap().get("u1").copied(),
            Some(5)
        );
    }
}
