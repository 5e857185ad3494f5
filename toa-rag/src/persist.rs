//! JSON artifact helpers shared by the persisted stores.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::error::{RagError, Result};

/// File name of the persisted vector index.
pub const VECTOR_STORE_FILE: &str = "vector_store.json";
/// File name of the persisted document store.
pub const DOCSTORE_FILE: &str = "docstore.json";
/// File name of the persisted index store.
pub const INDEX_STORE_FILE: &str = "index_store.json";

/// Read and parse one JSON artifact.
///
/// A missing or unreadable file is [`RagError::IndexUnavailable`]; a file that
/// does not parse is [`RagError::CorruptStore`].
pub(crate) fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to read artifact");
        RagError::IndexUnavailable { path: path.display().to_string(), message: e.to_string() }
    })?;
    debug!(path = %path.display(), bytes = raw.len(), "read artifact");
    serde_json::from_str(&raw).map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to parse artifact");
        RagError::CorruptStore(format!("{}: {e}", path.display()))
    })
}

/// Serialize one JSON artifact, creating the parent directory if needed.
pub(crate) fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let persist_failed = |message: String| RagError::PersistFailed {
        path: path.display().to_string(),
        message,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| persist_failed(e.to_string()))?;
    }
    let json = serde_json::to_string(value).map_err(|e| persist_failed(e.to_string()))?;
    fs::write(path, json).map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to write artifact");
        persist_failed(e.to_string())
    })
}
