// src/pipeline/builder.rs
//! Assembly of a [`ConversionPipeline`] from optional parts.

use super::stages::{ExportStage, FetchStage, MediaStage, PageReferenceStage, RenderStage};
use super::{ChainStage, ConversionPipeline, Exporter, Renderer};
use crate::api::{FetcherConfig, NotionRepository, TrackingCapabilities, TreeFetcher};
use crate::constants::DEFAULT_MANIFEST_DIR;
use crate::error::AppError;
use crate::media::{
    DirectStrategy, DownloadConfig, DownloadStrategy, MediaHandler, MediaStrategy, UploadConfig,
    UploadStrategy,
};
use crate::page_reference::{PageReferenceConfig, PageReferenceHandler};
use std::path::PathBuf;
use std::sync::Arc;

/// Which media strategy the chain uses.
#[derive(Clone)]
pub enum MediaStrategyConfig {
    Direct,
    Download(DownloadConfig),
    Upload(UploadConfig),
}

impl MediaStrategyConfig {
    fn build(self) -> Result<MediaStrategy, AppError> {
        Ok(match self {
            Self::Direct => MediaStrategy::Direct(DirectStrategy::new()),
            Self::Download(config) => MediaStrategy::Download(DownloadStrategy::new(config)?),
            Self::Upload(config) => MediaStrategy::Upload(UploadStrategy::new(config)?),
        })
    }
}

/// Collects chain options; [`build`](Self::build) validates them.
pub struct PipelineBuilder {
    client: Arc<dyn NotionRepository>,
    fetcher: FetcherConfig,
    manifest_dir: PathBuf,
    media: Option<MediaStrategyConfig>,
    page_references: Option<PageReferenceConfig>,
    renderer: Option<Arc<dyn Renderer>>,
    exporters: Vec<Arc<dyn Exporter>>,
}

impl PipelineBuilder {
    pub fn new(client: Arc<dyn NotionRepository>) -> Self {
        Self {
            client,
            fetcher: FetcherConfig::default(),
            manifest_dir: PathBuf::from(DEFAULT_MANIFEST_DIR),
            media: None,
            page_references: None,
            renderer: None,
            exporters: Vec::new(),
        }
    }

    pub fn configure_fetcher(mut self, config: FetcherConfig) -> Self {
        self.fetcher = config;
        self
    }

    /// Root directory for both manifests.
    pub fn manifest_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.manifest_dir = dir.into();
        self
    }

    pub fn direct_media(mut self) -> Self {
        self.media = Some(MediaStrategyConfig::Direct);
        self
    }

    pub fn download_media(mut self, config: DownloadConfig) -> Self {
        self.media = Some(MediaStrategyConfig::Download(config));
        self
    }

    pub fn upload_media(mut self, config: UploadConfig) -> Self {
        self.media = Some(MediaStrategyConfig::Upload(config));
        self
    }

    pub fn media(mut self, config: MediaStrategyConfig) -> Self {
        self.media = Some(config);
        self
    }

    pub fn with_page_references(mut self, config: PageReferenceConfig) -> Self {
        self.page_references = Some(config);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporters.push(exporter);
        self
    }

    /// Assembles the chain: fetch, media, page references, render, export.
    ///
    /// Fails without a renderer or when the media strategy is
    /// misconfigured. Fetch-time reference tracking is switched on exactly
    /// for the passes that are present.
    pub fn build(self) -> Result<ConversionPipeline, AppError> {
        let renderer = self.renderer.ok_or_else(|| {
            AppError::MissingConfiguration("a renderer is required to build the pipeline".to_string())
        })?;

        let capabilities = TrackingCapabilities {
            media_enabled: self.media.is_some(),
            page_ref_enabled: self.page_references.is_some(),
        };
        let fetcher = TreeFetcher::new(self.client, self.fetcher, capabilities);

        let mut stages: Vec<Box<dyn ChainStage>> = vec![Box::new(FetchStage::new(fetcher))];
        if let Some(media) = self.media {
            let handler = MediaHandler::new(media.build()?);
            stages.push(Box::new(MediaStage::new(handler, &self.manifest_dir)));
        }
        if let Some(config) = self.page_references {
            let handler = PageReferenceHandler::new(config);
            stages.push(Box::new(PageReferenceStage::new(handler, &self.manifest_dir)));
        }
        stages.push(Box::new(RenderStage::new(renderer)));
        if !self.exporters.is_empty() {
            stages.push(Box::new(ExportStage::new(self.exporters)));
        }

        Ok(ConversionPipeline::from_stages(stages))
    }
}
