//! Pass-through strategy: documents keep the provider URL.

use super::{ProcessInput, ProcessOutcome};
use crate::error::MediaError;
use crate::manifest::{MediaInfo, MediaKind};

/// Keeps every reference pointing at its original URL.
///
/// Entries are still recorded so that switching to another strategy later
/// can evict them cleanly.
#[derive(Debug, Clone, Default)]
pub struct DirectStrategy;

impl DirectStrategy {
    pub fn new() -> Self {
        Self
    }

    pub(super) fn process(&self, input: &ProcessInput<'_>) -> Result<ProcessOutcome, MediaError> {
        let media_info = MediaInfo::direct(input.original_url());
        let unchanged = input.reusable_entry(MediaKind::Direct)?.is_some();
        Ok(ProcessOutcome {
            media_info,
            needs_manifest_update: !unchanged,
            touched: true,
        })
    }

    pub(super) fn transform(&self, media_info: &MediaInfo) -> String {
        media_info.original_url.clone()
    }
}
