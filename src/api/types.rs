// src/api/types.rs
//! Type definitions for the Notion API module.

use crate::constants::{DEFAULT_FETCH_BATCH_SIZE, DEFAULT_MAX_REQUESTS_PER_SECOND};
use serde::Deserialize;

// --- Fetch configuration ---

/// Tuning and feature switches for one [`TreeFetcher`](super::TreeFetcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Queued tasks dispatched concurrently per batch.
    pub batch_size: usize,
    /// Aggregate remote-call budget, independent of `batch_size`.
    pub max_requests_per_second: u32,
    /// Retrieve discussion comments for the document and every node.
    pub fetch_comments: bool,
    /// Retrieve the root document's properties.
    pub fetch_page_properties: bool,
    /// Retrieve properties of nested `child_page` documents as well.
    pub fetch_child_page_properties: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_FETCH_BATCH_SIZE,
            max_requests_per_second: DEFAULT_MAX_REQUESTS_PER_SECOND,
            fetch_comments: false,
            fetch_page_properties: true,
            fetch_child_page_properties: false,
        }
    }
}

/// Which reference kinds the fetcher records while crawling.
///
/// Computed once when the pipeline is assembled: media tracking is on
/// exactly when a media stage exists, page-reference tracking exactly when
/// a page-reference stage exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackingCapabilities {
    pub media_enabled: bool,
    pub page_ref_enabled: bool,
}

// --- API Response Types ---

/// Generic paginated response from Notion API.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedResponse<T> {
    #[serde(default)]
    pub object: Option<String>,
    pub results: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    /// A single page that ends the listing.
    pub fn last(results: Vec<T>) -> Self {
        Self {
            object: Some("list".to_string()),
            results,
            next_cursor: None,
            has_more: false,
        }
    }

    /// A page followed by more results under `cursor`.
    pub fn with_more(results: Vec<T>, cursor: impl Into<String>) -> Self {
        Self {
            object: Some("list".to_string()),
            results,
            next_cursor: Some(cursor.into()),
            has_more: true,
        }
    }
}

/// Error response from Notion API.
#[derive(Debug, Clone, Deserialize)]
pub struct NotionApiErrorResponse {
    pub code: String,
    pub message: String,
}

// --- Pagination Types ---

/// Result of a pagination operation.
#[derive(Debug, Clone)]
pub struct PaginationResult<T> {
    pub items: Vec<T>,
    pub pages_fetched: u32,
}
