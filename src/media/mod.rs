//! Materialization of media references.
//!
//! A [`MediaStrategy`] decides what each tracked reference becomes: the
//! provider URL as-is, a local file, or an uploaded copy. The
//! [`MediaHandler`] runs the strategy over a fetched document, records the
//! results in the media manifest and evicts entries that no longer occur.

mod direct;
mod download;
mod handler;
mod upload;

pub use direct::DirectStrategy;
pub use download::{extension_for_content_type, DownloadConfig, DownloadStrategy};
pub use handler::{MediaHandler, MediaReport};
pub use upload::{CleanupHandler, UploadConfig, UploadHandler, UploadRequest, UploadStrategy};

use crate::error::MediaError;
use crate::manifest::{MediaInfo, MediaKind, MediaManifestEntry, MediaManifestStore};
use crate::model::TrackedReference;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Maps a stored location (local path or uploaded URL) to the string
/// written into the document.
pub type PathTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Everything a strategy needs to process one reference.
pub struct ProcessInput<'a> {
    pub reference: &'a TrackedReference,
    /// Manifest key of the reference.
    pub composite_id: &'a str,
    /// Entry index for property files.
    pub index: Option<usize>,
    pub manifest: &'a MediaManifestStore,
    pub last_edited: Option<DateTime<Utc>>,
    /// File-name stem safe for any filesystem.
    pub candidate_filename: &'a str,
}

impl ProcessInput<'_> {
    pub fn original_url(&self) -> &str {
        &self.reference.source.url
    }

    /// The current manifest entry for this reference, if any.
    pub fn existing_entry(&self) -> Result<Option<&MediaManifestEntry>, MediaError> {
        self.manifest
            .get_entry(self.composite_id)
            .map_err(|e| MediaError::Configuration(e.to_string()))
    }

    /// An existing entry of `kind` still valid for the source timestamp.
    fn reusable_entry(
        &self,
        kind: MediaKind,
    ) -> Result<Option<&MediaManifestEntry>, MediaError> {
        // Provider URLs are re-signed on every fetch; only external ones
        // must match for an entry to be reused.
        let external = self.reference.source.is_external();
        Ok(self.existing_entry()?.filter(|entry| {
            entry.media_info.kind == kind
                && (!external || entry.media_info.original_url == self.original_url())
                && entry.last_edited == self.last_edited
        }))
    }
}

/// Result of processing one reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    pub media_info: MediaInfo,
    /// Whether the manifest entry must be (re)written.
    pub needs_manifest_update: bool,
    /// Whether the manifest key stays live for this run.
    pub touched: bool,
}

impl ProcessOutcome {
    /// Pass-through used by fail-forward and external-URL preservation.
    fn passthrough(input: &ProcessInput<'_>) -> Self {
        Self {
            media_info: MediaInfo::direct(input.original_url()),
            needs_manifest_update: false,
            touched: true,
        }
    }
}

/// The closed set of materialization strategies.
pub enum MediaStrategy {
    Direct(DirectStrategy),
    Download(DownloadStrategy),
    Upload(UploadStrategy),
}

impl MediaStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Direct(_) => "direct",
            Self::Download(_) => "download",
            Self::Upload(_) => "upload",
        }
    }

    /// Processes one reference. With fail-forward enabled a failure
    /// degrades to the original URL and never surfaces as an error.
    pub async fn process(&self, input: &ProcessInput<'_>) -> Result<ProcessOutcome, MediaError> {
        match self {
            Self::Direct(strategy) => strategy.process(input),
            Self::Download(strategy) => strategy.process(input).await,
            Self::Upload(strategy) => strategy.process(input).await,
        }
    }

    /// The string written back into the document for a processed reference.
    pub fn transform(&self, media_info: &MediaInfo) -> String {
        match self {
            Self::Direct(strategy) => strategy.transform(media_info),
            Self::Download(strategy) => strategy.transform(media_info),
            Self::Upload(strategy) => strategy.transform(media_info),
        }
    }

    /// Releases whatever an evicted entry held. Failures are logged only.
    pub async fn cleanup(&self, entry: &MediaManifestEntry) {
        match self {
            Self::Direct(_) => {}
            Self::Download(strategy) => strategy.cleanup(entry).await,
            Self::Upload(strategy) => strategy.cleanup(entry).await,
        }
    }
}

/// Applies fail-forward to a strategy's raw result.
fn settle(
    result: Result<ProcessOutcome, MediaError>,
    input: &ProcessInput<'_>,
    fail_forward: bool,
) -> Result<ProcessOutcome, MediaError> {
    match result {
        Ok(outcome) => Ok(outcome),
        Err(e) if fail_forward => {
            log::warn!(
                "Media {} falls back to its original URL: {}",
                input.composite_id,
                e
            );
            Ok(ProcessOutcome::passthrough(input))
        }
        Err(e) => Err(e),
    }
}

/// Turns a manifest key into a file-name stem.
pub fn candidate_filename(composite_id: &str) -> String {
    composite_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}
