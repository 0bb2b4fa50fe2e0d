// src/pipeline/stages.rs
//! The concrete links of the conversion chain.

use super::{ChainData, ChainStage, Exporter, Renderer};
use crate::api::TreeFetcher;
use crate::error::AppError;
use crate::manifest::{ManifestStore, MediaManifestStore, PageReferenceManifestStore};
use crate::media::MediaHandler;
use crate::page_reference::PageReferenceHandler;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Crawls the document into a tree.
pub struct FetchStage {
    fetcher: TreeFetcher,
}

impl FetchStage {
    pub fn new(fetcher: TreeFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait::async_trait]
impl ChainStage for FetchStage {
    fn name(&self) -> &'static str {
        "fetch"
    }

    async fn process(&self, mut data: ChainData) -> Result<ChainData, AppError> {
        let document = self.fetcher.fetch(&data.document_id).await?;
        data.metadata.insert(
            "fetchStats".to_string(),
            serde_json::to_value(document.stats)?,
        );
        data.metadata.insert(
            "nodeCount".to_string(),
            json!(document.node_count()),
        );
        data.document = Some(document);
        Ok(data)
    }
}

/// Materializes media references against the document's media manifest.
pub struct MediaStage {
    handler: MediaHandler,
    manifest_dir: PathBuf,
}

impl MediaStage {
    pub fn new(handler: MediaHandler, manifest_dir: impl Into<PathBuf>) -> Self {
        Self {
            handler,
            manifest_dir: manifest_dir.into(),
        }
    }
}

#[async_trait::async_trait]
impl ChainStage for MediaStage {
    fn name(&self) -> &'static str {
        "media"
    }

    async fn process(&self, mut data: ChainData) -> Result<ChainData, AppError> {
        let mut manifest = MediaManifestStore::new(&self.manifest_dir, &data.document_id);
        manifest.initialize().await?;
        manifest.load().await?;

        let report = self.handler.process(data.document_mut()?, &mut manifest).await?;
        data.metadata.insert(
            "media".to_string(),
            json!({
                "strategy": self.handler.strategy().name(),
                "processed": report.processed,
                "manifestUpdates": report.manifest_updates,
                "rewritten": report.rewritten,
                "evicted": report.evicted,
            }),
        );
        data.manifests.media = manifest.manifest_path().map(PathBuf::from);
        Ok(data)
    }
}

/// Records the document's own URL and rewrites links to other documents.
pub struct PageReferenceStage {
    handler: PageReferenceHandler,
    manifest_dir: PathBuf,
}

impl PageReferenceStage {
    pub fn new(handler: PageReferenceHandler, manifest_dir: impl Into<PathBuf>) -> Self {
        Self {
            handler,
            manifest_dir: manifest_dir.into(),
        }
    }
}

#[async_trait::async_trait]
impl ChainStage for PageReferenceStage {
    fn name(&self) -> &'static str {
        "page-references"
    }

    async fn process(&self, mut data: ChainData) -> Result<ChainData, AppError> {
        let mut manifest = PageReferenceManifestStore::new(&self.manifest_dir);
        manifest.initialize().await?;
        manifest.load().await?;

        let report = self.handler.process(data.document_mut()?, &mut manifest)?;
        if report.recorded_url.is_some() {
            manifest.save().await?;
        }
        data.metadata.insert(
            "pageReferences".to_string(),
            json!({
                "recordedUrl": report.recorded_url,
                "resolved": report.resolved_targets,
                "rewritten": report.rewritten_links,
                "unresolved": report.unresolved.iter().map(ToString::to_string).collect::<Vec<_>>(),
            }),
        );
        data.manifests.page_references = manifest.manifest_path().map(PathBuf::from);
        Ok(data)
    }
}

/// Produces the output text. Every chain has exactly one.
pub struct RenderStage {
    renderer: Arc<dyn Renderer>,
}

impl RenderStage {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait::async_trait]
impl ChainStage for RenderStage {
    fn name(&self) -> &'static str {
        "render"
    }

    async fn process(&self, mut data: ChainData) -> Result<ChainData, AppError> {
        let content = self.renderer.render(&data).await?;
        data.content = Some(content);
        Ok(data)
    }
}

/// Hands the rendered output to one or more exporters.
///
/// A single exporter's failure fails the stage. With several, every
/// exporter runs and failures are collected under `exportErrors`.
pub struct ExportStage {
    exporters: Vec<Arc<dyn Exporter>>,
}

impl ExportStage {
    pub fn new(exporters: Vec<Arc<dyn Exporter>>) -> Self {
        Self { exporters }
    }
}

#[async_trait::async_trait]
impl ChainStage for ExportStage {
    fn name(&self) -> &'static str {
        "export"
    }

    async fn process(&self, mut data: ChainData) -> Result<ChainData, AppError> {
        if let [exporter] = self.exporters.as_slice() {
            exporter.export(&data).await?;
            return Ok(data);
        }

        let mut failures = Vec::new();
        for exporter in &self.exporters {
            if let Err(e) = exporter.export(&data).await {
                log::error!("Exporter '{}' failed: {}", exporter.name(), e);
                failures.push(json!({
                    "exporter": exporter.name(),
                    "error": e.to_string(),
                }));
            }
        }
        if !failures.is_empty() {
            data.metadata
                .insert("exportErrors".to_string(), Value::Array(failures));
        }
        Ok(data)
    }
}
