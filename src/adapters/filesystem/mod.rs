//! Local filesystem adapters
//!
//! - [`json_source`] - reads tables from a directory of JSON files
//! - [`raw_store`] - local copy of imported source tables plus the import log
//! - [`snapshot_store`] - persisted materialized snapshots
//!
//! Every write goes through [`write_json_atomic`]: the document is written to
//! a temporary file in the target directory and renamed over the destination.

pub mod json_source;
pub mod raw_store;
pub mod snapshot_store;

pub use json_source::JsonDirectorySource;
pub use raw_store::{ImportLogEntry, RawStore, RawTableFile};
pub use snapshot_store::FileSnapshotStore;

use crate::domain::{Result, SemanticError};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Serializes `value` to `path` through a temp file and atomic rename
pub(crate) async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let path: PathBuf = path.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| SemanticError::Io(format!("{} has no parent", path.display())))?;
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)
            .map_err(|e| SemanticError::Io(format!("failed to persist {}: {}", path.display(), e)))?;
        Ok(())
    })
    .await
    .map_err(|e| SemanticError::Io(format!("write task failed: {}", e)))?
}

/// Reads and deserializes a JSON document, `Ok(None)` when the file is absent
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
