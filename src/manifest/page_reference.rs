//! Workspace-wide map from document id to public URL.

use super::{require_object, require_string, ManifestDirectory, ManifestStore};
use crate::constants::{PAGE_REFERENCE_MANIFEST_FILE, PAGE_REFERENCE_MANIFEST_SUBDIR};
use crate::error::ManifestError;
use crate::types::NotionId;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

const STORE_NAME: &str = "page-references";

/// Who recorded a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceSource {
    /// Read from the document's own URL property while converting it.
    Property,
    /// Written by the workspace indexer.
    Manifest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReferenceEntry {
    pub url: String,
    pub source: ReferenceSource,
    pub last_updated: DateTime<Utc>,
}

/// On-disk shape of `<dir>/page-references/references.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReferenceManifest {
    pub last_updated: DateTime<Utc>,
    pub references: IndexMap<String, PageReferenceEntry>,
}

impl PageReferenceManifest {
    fn empty() -> Self {
        Self {
            last_updated: Utc::now(),
            references: IndexMap::new(),
        }
    }

    fn validate(raw: &Value) -> Result<(), ManifestError> {
        require_string(raw, "lastUpdated")?;
        for (key, entry) in require_object(raw, "references")? {
            require_string(entry, "url")?;
            match require_string(entry, "source")? {
                "property" | "manifest" => {}
                other => {
                    return Err(ManifestError::InvalidState(format!(
                        "reference {} has unknown source '{}'",
                        key, other
                    )))
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct PageReferenceManifestStore {
    dir: ManifestDirectory,
    file: Option<PathBuf>,
    manifest: PageReferenceManifest,
}

impl PageReferenceManifestStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: ManifestDirectory::new(base_dir.as_ref().join(PAGE_REFERENCE_MANIFEST_SUBDIR)),
            file: None,
            manifest: PageReferenceManifest::empty(),
        }
    }

    fn ready(&self) -> Result<(), ManifestError> {
        self.dir.require_ready(STORE_NAME)
    }

    pub fn get_reference(&self, id: &NotionId) -> Result<Option<&PageReferenceEntry>, ManifestError> {
        self.ready()?;
        Ok(self.manifest.references.get(id.as_str()))
    }

    pub fn update_reference(
        &mut self,
        id: &NotionId,
        url: impl Into<String>,
        source: ReferenceSource,
    ) -> Result<(), ManifestError> {
        self.ready()?;
        self.manifest.references.insert(
            id.as_str().to_string(),
            PageReferenceEntry {
                url: url.into(),
                source,
                last_updated: Utc::now(),
            },
        );
        Ok(())
    }

    pub fn remove_reference(&mut self, id: &NotionId) -> Result<PageReferenceEntry, ManifestError> {
        self.ready()?;
        self.manifest
            .references
            .shift_remove(id.as_str())
            .ok_or_else(|| ManifestError::NotFound {
                key: id.to_string(),
            })
    }

    pub fn references(&self) -> Result<&IndexMap<String, PageReferenceEntry>, ManifestError> {
        self.ready()?;
        Ok(&self.manifest.references)
    }
}

#[async_trait::async_trait]
impl ManifestStore for PageReferenceManifestStore {
    fn store_name(&self) -> &'static str {
        STORE_NAME
    }

    async fn initialize(&mut self) -> Result<(), ManifestError> {
        self.dir.ensure_ready().await?;
        self.file = Some(self.dir.path().join(PAGE_REFERENCE_MANIFEST_FILE));
        Ok(())
    }

    async fn load(&mut self) -> Result<(), ManifestError> {
        self.ready()?;
        let file = self.file.as_deref().ok_or(ManifestError::NotInitialized { store: STORE_NAME })?;
        self.manifest = match self.dir.read_json(file).await? {
            None => PageReferenceManifest::empty(),
            Some(raw) => {
                PageReferenceManifest::validate(&raw)?;
                serde_json::from_value(raw).map_err(|e| {
                    ManifestError::InvalidState(format!("{}: {}", file.display(), e))
                })?
            }
        };
        log::debug!(
            "Loaded {} page references from {}",
            self.manifest.references.len(),
            file.display()
        );
        Ok(())
    }

    async fn save(&mut self) -> Result<(), ManifestError> {
        self.ready()?;
        let file = self.file.as_deref().ok_or(ManifestError::NotInitialized { store: STORE_NAME })?;
        self.manifest.last_updated = Utc::now();
        self.dir.write_json(file, &self.manifest).await
    }

    fn manifest_path(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(hex: char) -> NotionId {
        NotionId::parse(&hex.to_string().repeat(32)).unwrap()
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = PageReferenceManifestStore::new(tmp.path());
        store.initialize().await.unwrap();
        store.load().await.unwrap();
        store
            .update_reference(&id('a'), "/guides/setup", ReferenceSource::Manifest)
            .unwrap();
        store.save().await.unwrap();

        let raw: Value = serde_json::from_str(
            &std::fs::read_to_string(tmp.path().join("page-references/references.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(raw["references"][id('a').as_str()]["source"], "manifest");

        let mut reloaded = PageReferenceManifestStore::new(tmp.path());
        reloaded.initialize().await.unwrap();
        reloaded.load().await.unwrap();
        let entry = reloaded.get_reference(&id('a')).unwrap().unwrap();
        assert_eq!(entry.url, "/guides/setup");
        assert!(reloaded.remove_reference(&id('b')).is_err());
    }

    #[tokio::test]
    async fn lookups_require_initialize() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PageReferenceManifestStore::new(tmp.path());
        assert!(matches!(
            store.get_reference(&id('a')),
            Err(ManifestError::NotInitialized { store: "page-references" })
        ));
    }

    #[tokio::test]
    async fn unknown_source_is_invalid_state() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("page-references");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("references.json"),
            r#"{"lastUpdated":"2024-01-01T00:00:00Z","references":{"a":{"url":"/x","source":"guess","lastUpdated":"2024-01-01T00:00:00Z"}}}"#,
        )
        .unwrap();
        let mut store = PageReferenceManifestStore::new(tmp.path());
        store.initialize().await.unwrap();
        assert!(matches!(store.load().await, Err(ManifestError::InvalidState(_))));
    }
}
