//! Per-document record of how each media reference was materialized.

use super::{require_object, require_string, ManifestDirectory, ManifestStore};
use crate::constants::MEDIA_MANIFEST_SUBDIR;
use crate::error::ManifestError;
use crate::types::NotionId;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

const STORE_NAME: &str = "media";

/// How a reference ended up being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// The provider URL is used as-is.
    Direct,
    /// The asset was saved to a local file.
    Downloaded,
    /// The asset was handed to an upload callback.
    Uploaded,
}

impl MediaKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "direct" => Some(Self::Direct),
            "downloaded" => Some(Self::Downloaded),
            "uploaded" => Some(Self::Uploaded),
            _ => None,
        }
    }
}

/// Outcome of materializing one reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub original_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformed_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl MediaInfo {
    pub fn direct(original_url: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Direct,
            original_url: original_url.into(),
            local_path: None,
            uploaded_url: None,
            transformed_path: None,
            mime_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaManifestEntry {
    pub media_info: MediaInfo,
    /// Mutation timestamp of the source when this entry was written.
    pub last_edited: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// On-disk shape of `<dir>/media/<documentId>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaManifest {
    pub page_id: String,
    pub last_updated: DateTime<Utc>,
    pub media_entries: IndexMap<String, MediaManifestEntry>,
}

impl MediaManifest {
    fn empty(page_id: &NotionId) -> Self {
        Self {
            page_id: page_id.to_string(),
            last_updated: Utc::now(),
            media_entries: IndexMap::new(),
        }
    }

    /// Shape check run on raw JSON before deserializing.
    fn validate(raw: &Value) -> Result<(), ManifestError> {
        require_string(raw, "pageId")?;
        require_string(raw, "lastUpdated")?;
        for (key, entry) in require_object(raw, "mediaEntries")? {
            let info = entry
                .get("mediaInfo")
                .ok_or_else(|| ManifestError::InvalidState(format!("entry {} has no mediaInfo", key)))?;
            let kind = require_string(info, "type")?;
            if MediaKind::from_tag(kind).is_none() {
                return Err(ManifestError::InvalidState(format!(
                    "entry {} has unknown media type '{}'",
                    key, kind
                )));
            }
            require_string(info, "originalUrl")?;
            require_string(entry, "createdAt")?;
            require_string(entry, "updatedAt")?;
        }
        Ok(())
    }
}

/// Media manifest for one root document.
#[derive(Debug)]
pub struct MediaManifestStore {
    dir: ManifestDirectory,
    document_id: NotionId,
    file: Option<PathBuf>,
    manifest: MediaManifest,
}

impl MediaManifestStore {
    /// Store for `document_id` under `<base_dir>/media`.
    pub fn new(base_dir: impl AsRef<Path>, document_id: &NotionId) -> Self {
        Self {
            dir: ManifestDirectory::new(base_dir.as_ref().join(MEDIA_MANIFEST_SUBDIR)),
            document_id: document_id.clone(),
            file: None,
            manifest: MediaManifest::empty(document_id),
        }
    }

    pub fn document_id(&self) -> &NotionId {
        &self.document_id
    }

    fn ready(&self) -> Result<(), ManifestError> {
        self.dir.require_ready(STORE_NAME)
    }

    pub fn get_entry(&self, id: &str) -> Result<Option<&MediaManifestEntry>, ManifestError> {
        self.ready()?;
        Ok(self.manifest.media_entries.get(id))
    }

    /// Inserts or replaces an entry. `created_at` survives replacement.
    pub fn update_entry(
        &mut self,
        id: &str,
        media_info: MediaInfo,
        last_edited: Option<DateTime<Utc>>,
    ) -> Result<(), ManifestError> {
        self.ready()?;
        let now = Utc::now();
        let created_at = self
            .manifest
            .media_entries
            .get(id)
            .map(|existing| existing.created_at)
            .unwrap_or(now);
        self.manifest.media_entries.insert(
            id.to_string(),
            MediaManifestEntry {
                media_info,
                last_edited,
                created_at,
                updated_at: now,
            },
        );
        Ok(())
    }

    /// Removes and returns an entry; absent keys are an error.
    pub fn remove_entry(&mut self, id: &str) -> Result<MediaManifestEntry, ManifestError> {
        self.ready()?;
        self.manifest
            .media_entries
            .shift_remove(id)
            .ok_or_else(|| ManifestError::NotFound {
                key: id.to_string(),
            })
    }

    pub fn entry_ids(&self) -> Result<Vec<String>, ManifestError> {
        self.ready()?;
        Ok(self.manifest.media_entries.keys().cloned().collect())
    }

    pub fn manifest(&self) -> Result<&MediaManifest, ManifestError> {
        self.ready()?;
        Ok(&self.manifest)
    }
}

#[async_trait::async_trait]
impl ManifestStore for MediaManifestStore {
    fn store_name(&self) -> &'static str {
        STORE_NAME
    }

    async fn initialize(&mut self) -> Result<(), ManifestError> {
        self.dir.ensure_ready().await?;
        self.file = Some(self.dir.file_for(self.document_id.as_str())?);
        Ok(())
    }

    async fn load(&mut self) -> Result<(), ManifestError> {
        self.ready()?;
        let file = self.file.as_deref().ok_or(ManifestError::NotInitialized { store: STORE_NAME })?;
        self.manifest = match self.dir.read_json(file).await? {
            None => {
                log::debug!("No media manifest at {}, starting fresh", file.display());
                MediaManifest::empty(&self.document_id)
            }
            Some(raw) => {
                MediaManifest::validate(&raw)?;
                serde_json::from_value(raw).map_err(|e| {
                    ManifestError::InvalidState(format!("{}: {}", file.display(), e))
                })?
            }
        };
        Ok(())
    }

    async fn save(&mut self) -> Result<(), ManifestError> {
        self.ready()?;
        let file = self.file.as_deref().ok_or(ManifestError::NotInitialized { store: STORE_NAME })?;
        self.manifest.last_updated = Utc::now();
        self.dir.write_json(file, &self.manifest).await?;
        log::debug!(
            "Saved media manifest with {} entries to {}",
            self.manifest.media_entries.len(),
            file.display()
        );
        Ok(())
    }

    fn manifest_path(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc() -> NotionId {
        NotionId::parse("abcdefabcdefabcdefabcdefabcdefab").unwrap()
    }

    async fn ready_store(base: &Path) -> MediaManifestStore {
        let mut store = MediaManifestStore::new(base, &doc());
        store.initialize().await.unwrap();
        store.load().await.unwrap();
        store
    }

    #[tokio::test]
    async fn operations_before_initialize_fail() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = MediaManifestStore::new(tmp.path(), &doc());
        assert!(matches!(
            store.get_entry("x"),
            Err(ManifestError::NotInitialized { .. })
        ));
        assert!(matches!(
            store.update_entry("x", MediaInfo::direct("u"), None),
            Err(ManifestError::NotInitialized { .. })
        ));
        assert!(matches!(
            store.load().await,
            Err(ManifestError::NotInitialized { .. })
        ));
        assert!(matches!(
            store.save().await,
            Err(ManifestError::NotInitialized { .. })
        ));
    }

    #[tokio::test]
    async fn update_preserves_created_at() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ready_store(tmp.path()).await;
        store.update_entry("n1", MediaInfo::direct("a"), None).unwrap();
        let created = store.get_entry("n1").unwrap().unwrap().created_at;

        store.update_entry("n1", MediaInfo::direct("b"), None).unwrap();
        let entry = store.get_entry("n1").unwrap().unwrap();
        assert_eq!(entry.created_at, created);
        assert!(entry.updated_at >= created);
        assert_eq!(entry.media_info.original_url, "b");
    }

    #[tokio::test]
    async fn removing_absent_entry_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ready_store(tmp.path()).await;
        assert!(matches!(
            store.remove_entry("ghost"),
            Err(ManifestError::NotFound { key }) if key == "ghost"
        ));
    }

    #[tokio::test]
    async fn persists_camel_case_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ready_store(tmp.path()).await;
        store
            .update_entry(
                "n1",
                MediaInfo {
                    kind: MediaKind::Downloaded,
                    original_url: "https://files.test/a.png".to_string(),
                    local_path: Some(PathBuf::from("/out/n1.png")),
                    uploaded_url: None,
                    transformed_path: Some("/media/n1.png".to_string()),
                    mime_type: Some("image/png".to_string()),
                },
                None,
            )
            .unwrap();
        store.save().await.unwrap();

        let path = tmp.path().join("media").join(format!("{}.json", doc()));
        assert_eq!(store.manifest_path(), Some(path.as_path()));
        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["pageId"], doc().as_str());
        let info = &raw["mediaEntries"]["n1"]["mediaInfo"];
        assert_eq!(info["type"], "downloaded");
        assert_eq!(info["localPath"], "/out/n1.png");
        assert_eq!(info["mimeType"], "image/png");

        let reloaded = ready_store(tmp.path()).await;
        assert_eq!(reloaded.entry_ids().unwrap(), vec!["n1".to_string()]);
    }

    #[tokio::test]
    async fn rejects_invalid_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("media");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(format!("{}.json", doc())),
            r#"{"pageId":"x","lastUpdated":"2024-01-01T00:00:00Z","mediaEntries":{"a":{"mediaInfo":{"type":"teleported","originalUrl":"u"}}}}"#,
        )
        .unwrap();

        let mut store = MediaManifestStore::new(tmp.path(), &doc());
        store.initialize().await.unwrap();
        assert!(matches!(
            store.load().await,
            Err(ManifestError::InvalidState(_))
        ));
    }
}
