//! Directory-backed JSON manifests.
//!
//! Two stores share the same lifecycle: `initialize` creates the backing
//! directory, `load` reads (or starts fresh), mutations happen in memory,
//! and `save` writes the whole file atomically. Using a store before
//! `initialize` fails with [`ManifestError::NotInitialized`].

mod media;
mod page_reference;

pub use media::{MediaInfo, MediaKind, MediaManifest, MediaManifestEntry, MediaManifestStore};
pub use page_reference::{
    PageReferenceEntry, PageReferenceManifest, PageReferenceManifestStore, ReferenceSource,
};

use crate::error::ManifestError;
use serde::Serialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Lifecycle shared by every manifest store.
#[async_trait::async_trait]
pub trait ManifestStore: Send + Sync {
    /// Name used in errors and logs.
    fn store_name(&self) -> &'static str;

    /// Prepares the backing directory. Idempotent.
    async fn initialize(&mut self) -> Result<(), ManifestError>;

    /// Reads the manifest from disk, or starts an empty one if absent.
    async fn load(&mut self) -> Result<(), ManifestError>;

    /// Writes the in-memory manifest back to disk.
    async fn save(&mut self) -> Result<(), ManifestError>;

    /// Path of the backing file once initialized.
    fn manifest_path(&self) -> Option<&Path>;
}

/// The directory a store keeps its files in.
#[derive(Debug, Clone)]
pub struct ManifestDirectory {
    path: PathBuf,
    ready: bool,
}

impl ManifestDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ready: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Creates the directory if needed.
    pub async fn ensure_ready(&mut self) -> Result<(), ManifestError> {
        tokio::fs::create_dir_all(&self.path)
            .await
            .map_err(|e| ManifestError::io(&self.path, e))?;
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| ManifestError::io(&self.path, e))?;
        if !metadata.is_dir() {
            return Err(ManifestError::InvalidState(format!(
                "{} is not a directory",
                self.path.display()
            )));
        }
        self.ready = true;
        Ok(())
    }

    pub fn require_ready(&self, store: &'static str) -> Result<(), ManifestError> {
        if self.ready {
            Ok(())
        } else {
            Err(ManifestError::NotInitialized { store })
        }
    }

    /// Path of `<identifier>.json` inside the directory.
    pub fn file_for(&self, identifier: &str) -> Result<PathBuf, ManifestError> {
        let name = sanitize_identifier(identifier)?;
        Ok(self.path.join(format!("{}.json", name)))
    }

    /// Reads a JSON file; `None` if it does not exist.
    pub async fn read_json(&self, file: &Path) -> Result<Option<Value>, ManifestError> {
        let text = match tokio::fs::read_to_string(file).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ManifestError::io(file, e)),
        };
        serde_json::from_str(&text).map(Some).map_err(|e| {
            ManifestError::InvalidState(format!("{} is not valid JSON: {}", file.display(), e))
        })
    }

    /// Writes through a temporary sibling and renames over the target, so
    /// readers never observe a half-written manifest.
    pub async fn write_json<T: Serialize>(&self, file: &Path, value: &T) -> Result<(), ManifestError> {
        let body = serde_json::to_vec_pretty(value)
            .map_err(|e| ManifestError::InvalidState(format!("unserializable manifest: {}", e)))?;
        let staging = file.with_extension("json.tmp");
        tokio::fs::write(&staging, body)
            .await
            .map_err(|e| ManifestError::io(&staging, e))?;
        tokio::fs::rename(&staging, file)
            .await
            .map_err(|e| ManifestError::io(file, e))
    }
}

/// Validates an identifier for use as a file name.
///
/// Rejects empty names and anything that could escape the manifest
/// directory.
pub fn sanitize_identifier(raw: &str) -> Result<String, ManifestError> {
    let trimmed = raw.trim();
    let unsafe_name = trimmed.is_empty()
        || trimmed == "."
        || trimmed.contains("..")
        || trimmed.contains(['/', '\\', '\0', ':']);
    if unsafe_name {
        return Err(ManifestError::InvalidState(format!(
            "unsafe manifest identifier: {:?}",
            raw
        )));
    }
    Ok(trimmed.to_string())
}

/// Checks that `field` of `object` holds a JSON object.
fn require_object<'a>(value: &'a Value, field: &str) -> Result<&'a serde_json::Map<String, Value>, ManifestError> {
    value
        .get(field)
        .and_then(Value::as_object)
        .ok_or_else(|| ManifestError::InvalidState(format!("manifest field '{}' must be an object", field)))
}

/// Checks that `field` of `object` holds a string.
fn require_string<'a>(value: &'a Value, field: &str) -> Result<&'a str, ManifestError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ManifestError::InvalidState(format!("manifest field '{}' must be a string", field)))
}
