// src/pipeline/mod.rs
//! The conversion chain: fetch, then optional media and page-reference
//! passes, then render, then optional export.
//!
//! Stages share one [`ChainData`] value, passed by ownership from stage to
//! stage. The pipeline is an ordered list run front to back; the first
//! failing stage stops the run.

mod builder;
mod stages;

pub use builder::{MediaStrategyConfig, PipelineBuilder};
pub use stages::{ExportStage, FetchStage, MediaStage, PageReferenceStage, RenderStage};

use crate::api::NotionRepository;
use crate::error::AppError;
use crate::model::FetchedDocument;
use crate::types::NotionId;
use indexmap::IndexMap;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Manifest files a run touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchedManifests {
    pub media: Option<PathBuf>,
    pub page_references: Option<PathBuf>,
}

/// State handed from stage to stage.
#[derive(Debug, Clone)]
pub struct ChainData {
    pub document_id: NotionId,
    /// Set by the fetch stage.
    pub document: Option<FetchedDocument>,
    /// Free-form facts stages publish about the run.
    pub metadata: IndexMap<String, Value>,
    /// Set by the render stage.
    pub content: Option<String>,
    pub manifests: TouchedManifests,
}

impl ChainData {
    pub fn new(document_id: NotionId) -> Self {
        Self {
            document_id,
            document: None,
            metadata: IndexMap::new(),
            content: None,
            manifests: TouchedManifests::default(),
        }
    }

    /// The fetched document, for stages that run after the fetch.
    pub fn document(&self) -> Result<&FetchedDocument, AppError> {
        self.document.as_ref().ok_or_else(|| missing_document(&self.document_id))
    }

    pub fn document_mut(&mut self) -> Result<&mut FetchedDocument, AppError> {
        match self.document.as_mut() {
            Some(document) => Ok(document),
            None => Err(missing_document(&self.document_id)),
        }
    }
}

fn missing_document(id: &NotionId) -> AppError {
    AppError::InternalError {
        message: format!("no fetched document for {} at this stage", id),
        source: None,
    }
}

/// One link of the chain.
#[async_trait::async_trait]
pub trait ChainStage: Send + Sync {
    /// Stable name used in logs and errors.
    fn name(&self) -> &'static str;

    async fn process(&self, data: ChainData) -> Result<ChainData, AppError>;
}

/// Turns fetched data into output text.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, data: &ChainData) -> Result<String, AppError>;
}

/// Delivers rendered output somewhere.
#[async_trait::async_trait]
pub trait Exporter: Send + Sync {
    fn name(&self) -> String;

    async fn export(&self, data: &ChainData) -> Result<(), AppError>;
}

/// An assembled chain, reusable across documents.
pub struct ConversionPipeline {
    stages: Vec<Box<dyn ChainStage>>,
}

impl ConversionPipeline {
    /// Starts a builder around a provider client.
    pub fn builder(client: Arc<dyn NotionRepository>) -> PipelineBuilder {
        PipelineBuilder::new(client)
    }

    pub(crate) fn from_stages(stages: Vec<Box<dyn ChainStage>>) -> Self {
        Self { stages }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Runs every stage in order for `document` (an id or a page URL).
    pub async fn convert(&self, document: &str) -> Result<ChainData, AppError> {
        let document_id = NotionId::parse(document)?;
        let mut data = ChainData::new(document_id.clone());

        for (index, stage) in self.stages.iter().enumerate() {
            log::debug!(
                "Stage {}/{} '{}' for {}",
                index + 1,
                self.stages.len(),
                stage.name(),
                document_id
            );
            data = stage
                .process(data)
                .await
                .map_err(|source| AppError::StageFailed {
                    stage: stage.name(),
                    document_id: document_id.to_string(),
                    source: Box::new(source),
                })?;
        }

        log::info!("Converted {}", document_id);
        Ok(data)
    }
}
