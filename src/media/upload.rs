//! Upload strategy: assets are handed to a caller-supplied uploader.

use super::{settle, PathTransform, ProcessInput, ProcessOutcome};
use crate::error::{BoxError, MediaError, MediaOperation};
use crate::manifest::{MediaInfo, MediaKind, MediaManifestEntry};
use std::sync::Arc;

/// What the uploader receives for one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub source_url: String,
    /// Manifest key of the reference.
    pub reference_id: String,
    pub candidate_filename: String,
}

/// Stores an asset somewhere and returns the URL it is served from.
#[async_trait::async_trait]
pub trait UploadHandler: Send + Sync {
    async fn upload(&self, request: UploadRequest) -> Result<String, BoxError>;
}

/// Deletes an uploaded asset once it is no longer referenced.
#[async_trait::async_trait]
pub trait CleanupHandler: Send + Sync {
    async fn cleanup(&self, entry: &MediaManifestEntry) -> Result<(), BoxError>;
}

#[derive(Clone)]
pub struct UploadConfig {
    /// Required.
    pub upload_handler: Option<Arc<dyn UploadHandler>>,
    pub cleanup_handler: Option<Arc<dyn CleanupHandler>>,
    /// Maps the uploaded URL to the string written into the document.
    pub transform_path: Option<PathTransform>,
    pub preserve_external_urls: bool,
    pub fail_forward: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_handler: None,
            cleanup_handler: None,
            transform_path: None,
            preserve_external_urls: false,
            fail_forward: true,
        }
    }
}

impl UploadConfig {
    pub fn with_handler(handler: Arc<dyn UploadHandler>) -> Self {
        Self {
            upload_handler: Some(handler),
            ..Self::default()
        }
    }

    pub fn with_cleanup(mut self, handler: Arc<dyn CleanupHandler>) -> Self {
        self.cleanup_handler = Some(handler);
        self
    }

    pub fn with_transform_path(mut self, transform: PathTransform) -> Self {
        self.transform_path = Some(transform);
        self
    }

    pub fn preserving_external_urls(mut self, preserve: bool) -> Self {
        self.preserve_external_urls = preserve;
        self
    }

    pub fn failing_forward(mut self, fail_forward: bool) -> Self {
        self.fail_forward = fail_forward;
        self
    }
}

pub struct UploadStrategy {
    upload_handler: Arc<dyn UploadHandler>,
    cleanup_handler: Option<Arc<dyn CleanupHandler>>,
    transform_path: Option<PathTransform>,
    preserve_external_urls: bool,
    fail_forward: bool,
}

impl UploadStrategy {
    /// Fails when no upload handler is configured.
    pub fn new(config: UploadConfig) -> Result<Self, MediaError> {
        let upload_handler = config.upload_handler.ok_or_else(|| {
            MediaError::Configuration("upload strategy requires an upload handler".to_string())
        })?;
        Ok(Self {
            upload_handler,
            cleanup_handler: config.cleanup_handler,
            transform_path: config.transform_path,
            preserve_external_urls: config.preserve_external_urls,
            fail_forward: config.fail_forward,
        })
    }

    pub(super) async fn process(&self, input: &ProcessInput<'_>) -> Result<ProcessOutcome, MediaError> {
        if self.preserve_external_urls && input.reference.source.is_external() {
            return Ok(ProcessOutcome::passthrough(input));
        }
        let result = self.materialize(input).await;
        settle(result, input, self.fail_forward)
    }

    async fn materialize(&self, input: &ProcessInput<'_>) -> Result<ProcessOutcome, MediaError> {
        if let Some(entry) = input.reusable_entry(MediaKind::Uploaded)? {
            if entry.media_info.uploaded_url.is_some() {
                return Ok(ProcessOutcome {
                    media_info: entry.media_info.clone(),
                    needs_manifest_update: false,
                    touched: true,
                });
            }
        }

        let id = input.composite_id;
        let uploaded = self
            .upload_handler
            .upload(UploadRequest {
                source_url: input.original_url().to_string(),
                reference_id: id.to_string(),
                candidate_filename: input.candidate_filename.to_string(),
            })
            .await
            .map_err(|e| MediaError::processing(id, MediaOperation::Upload, e))?;

        let uploaded = uploaded.trim();
        if uploaded.is_empty() {
            return Err(MediaError::processing(
                id,
                MediaOperation::Upload,
                "upload handler returned an empty URL",
            ));
        }

        Ok(ProcessOutcome {
            media_info: MediaInfo {
                kind: MediaKind::Uploaded,
                original_url: input.original_url().to_string(),
                local_path: None,
                uploaded_url: Some(uploaded.to_string()),
                transformed_path: Some(self.present(uploaded)),
                mime_type: None,
            },
            needs_manifest_update: true,
            touched: true,
        })
    }

    fn present(&self, url: &str) -> String {
        match &self.transform_path {
            Some(transform) => transform(url),
            None => url.to_string(),
        }
    }

    pub(super) fn transform(&self, media_info: &MediaInfo) -> String {
        match (&media_info.kind, &media_info.uploaded_url) {
            (MediaKind::Uploaded, Some(url)) => self.present(url),
            _ => media_info.original_url.clone(),
        }
    }

    pub(super) async fn cleanup(&self, entry: &MediaManifestEntry) {
        if entry.media_info.kind != MediaKind::Uploaded {
            return;
        }
        let Some(handler) = &self.cleanup_handler else {
            return;
        };
        if let Err(e) = handler.cleanup(entry).await {
            log::warn!(
                "{} cleanup of {} failed: {}",
                MediaOperation::Cleanup,
                entry.media_info.uploaded_url.as_deref().unwrap_or_default(),
                e
            );
        }
    }
}
