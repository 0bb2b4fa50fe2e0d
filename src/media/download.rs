//! Download strategy: assets are saved next to the converted output.

use super::{settle, PathTransform, ProcessInput, ProcessOutcome};
use crate::constants::BINARY_FALLBACK_EXTENSION;
use crate::error::{MediaError, MediaOperation};
use crate::manifest::{MediaInfo, MediaKind, MediaManifestEntry};
use reqwest::header::CONTENT_TYPE;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct DownloadConfig {
    /// Directory the files are written to. Required.
    pub output_dir: Option<PathBuf>,
    /// Maps the local path to the string written into the document.
    pub transform_path: Option<PathTransform>,
    /// Leave externally hosted assets alone.
    pub preserve_external_urls: bool,
    /// Fall back to the original URL instead of failing.
    pub fail_forward: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            transform_path: None,
            preserve_external_urls: false,
            fail_forward: true,
        }
    }
}

impl DownloadConfig {
    /// Config writing into `output_dir`, failing forward.
    pub fn to_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: Some(output_dir.into()),
            ..Self::default()
        }
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

impl std::fmt::Debug for DownloadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadConfig")
            .field("output_dir", &self.output_dir)
            .field("transform_path", &self.transform_path.is_some())
            .field("preserve_external_urls", &self.preserve_external_urls)
            .field("fail_forward", &self.fail_forward)
            .finish()
    }
}

pub struct DownloadStrategy {
    output_dir: PathBuf,
    transform_path: Option<PathTransform>,
    preserve_external_urls: bool,
    fail_forward: bool,
    client: reqwest::Client,
}

impl std::fmt::Debug for DownloadStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadStrategy")
            .field("output_dir", &self.output_dir)
            .field("preserve_external_urls", &self.preserve_external_urls)
            .field("fail_forward", &self.fail_forward)
            .finish_non_exhaustive()
    }
}

impl DownloadStrategy {
    /// Fails when no usable output directory is configured.
    pub fn new(config: DownloadConfig) -> Result<Self, MediaError> {
        let output_dir = config
            .output_dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| {
                MediaError::Configuration("download strategy requires an output directory".to_string())
            })?;
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| MediaError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self {
            output_dir,
            transform_path: config.transform_path,
            preserve_external_urls: config.preserve_external_urls,
            fail_forward: config.fail_forward,
            client,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub(super) async fn process(&self, input: &ProcessInput<'_>) -> Result<ProcessOutcome, MediaError> {
        if self.preserve_external_urls && input.reference.source.is_external() {
            return Ok(ProcessOutcome::passthrough(input));
        }
        let result = self.materialize(input).await;
        settle(result, input, self.fail_forward)
    }

    async fn materialize(&self, input: &ProcessInput<'_>) -> Result<ProcessOutcome, MediaError> {
        if let Some(entry) = input.reusable_entry(MediaKind::Downloaded)? {
            if let Some(path) = &entry.media_info.local_path {
                if tokio::fs::try_exists(path).await.unwrap_or(false) {
                    log::debug!("Reusing {} for {}", path.display(), input.composite_id);
                    return Ok(ProcessOutcome {
                        media_info: entry.media_info.clone(),
                        needs_manifest_update: false,
                        touched: true,
                    });
                }
            }
        }

        let id = input.composite_id;
        let response = self
            .client
            .get(input.original_url())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| MediaError::processing(id, MediaOperation::Download, e))?;

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| {
                value
                    .split(';')
                    .next()
                    .unwrap_or(value)
                    .trim()
                    .to_ascii_lowercase()
            })
            .filter(|value| !value.is_empty());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaError::processing(id, MediaOperation::Download, e))?;

        let extension = extension_for_content_type(mime_type.as_deref());
        let path = self
            .output_dir
            .join(format!("{}.{}", input.candidate_filename, extension));

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| MediaError::processing(id, MediaOperation::Write, e))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| MediaError::processing(id, MediaOperation::Write, e))?;
        log::debug!("Downloaded {} ({} bytes) to {}", id, bytes.len(), path.display());

        // A content-type change can move the file; drop the stale copy.
        if let Some(previous) = input
            .existing_entry()?
            .and_then(|entry| entry.media_info.local_path.as_ref())
            .filter(|previous| **previous != path)
        {
            remove_file_quietly(previous).await;
        }

        let transformed_path = Some(self.present(&path));
        Ok(ProcessOutcome {
            media_info: MediaInfo {
                kind: MediaKind::Downloaded,
                original_url: input.original_url().to_string(),
                local_path: Some(path),
                uploaded_url: None,
                transformed_path,
                mime_type,
            },
            needs_manifest_update: true,
            touched: true,
        })
    }

    fn present(&self, path: &Path) -> String {
        let raw = path.to_string_lossy();
        match &self.transform_path {
            Some(transform) => transform(&raw),
            None => raw.into_owned(),
        }
    }

    pub(super) fn transform(&self, media_info: &MediaInfo) -> String {
        match (&media_info.kind, &media_info.local_path) {
            (MediaKind::Downloaded, Some(path)) => self.present(path),
            _ => media_info.original_url.clone(),
        }
    }

    pub(super) async fn cleanup(&self, entry: &MediaManifestEntry) {
        if entry.media_info.kind != MediaKind::Downloaded {
            return;
        }
        if let Some(path) = &entry.media_info.local_path {
            remove_file_quietly(path).await;
        }
    }
}

async fn remove_file_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => log::debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove {}: {}", path.display(), e),
    }
}

/// File extension for a MIME type.
///
/// Known types map to their usual extension, `application/x-<name>` falls
/// back to `<name>`, and anything else becomes `bin`.
pub fn extension_for_content_type(mime_type: Option<&str>) -> String {
    let Some(mime_type) = mime_type else {
        return BINARY_FALLBACK_EXTENSION.to_string();
    };
    let known = match mime_type {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/avif" => "avif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        "image/heic" => "heic",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "video/ogg" => "ogv",
        "audio/mpeg" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        "audio/mp4" => "m4a",
        "audio/flac" => "flac",
        "application/pdf" => "pdf",
        "application/zip" => "zip",
        "application/json" => "json",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/vnd.ms-excel" => "xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
        "application/vnd.ms-powerpoint" => "ppt",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => "pptx",
        "text/plain" => "txt",
        "text/csv" => "csv",
        "text/html" => "html",
        "text/markdown" => "md",
        _ => "",
    };
    if !known.is_empty() {
        return known.to_string();
    }
    mime_type
        .strip_prefix("application/x-")
        .filter(|suffix| !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_string)
        .unwrap_or_else(|| BINARY_FALLBACK_EXTENSION.to_string())
}
