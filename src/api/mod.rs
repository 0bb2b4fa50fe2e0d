// src/api/mod.rs
//! Notion API interaction: the ability to retrieve content from a workspace.
//!
//! This module provides a data-oriented interface to the Notion API,
//! with clear separation between I/O operations, parsing, and the crawl
//! that turns many calls into one document tree.

pub mod client;
mod fetch_queue;
pub mod object_graph;
mod pagination;
pub mod parser;
mod rate_limiter;
mod tree_fetcher;
mod types;

use crate::error::AppError;
use crate::types::NotionId;
use serde_json::Value;

/// The ability to retrieve content from a Notion workspace.
///
/// The fetcher depends on this trait, never on HTTP details, so tests can
/// substitute an in-memory workspace. Results stay raw JSON; parsing into
/// the domain model happens in [`parser`].
#[async_trait::async_trait]
pub trait NotionRepository: Send + Sync {
    /// One page of the children of a document or node.
    async fn list_children(
        &self,
        parent: &NotionId,
        cursor: Option<String>,
    ) -> Result<PaginatedResponse<Value>, AppError>;

    /// A document with its properties.
    async fn retrieve_page(&self, id: &NotionId) -> Result<Value, AppError>;

    /// One page of discussion comments on a document or node.
    async fn list_comments(
        &self,
        target: &NotionId,
        cursor: Option<String>,
    ) -> Result<PaginatedResponse<Value>, AppError>;
}

// Re-export the public interface
pub use client::NotionHttpClient;
pub use fetch_queue::{FetchTask, TaskKind, TaskQueue};
pub use object_graph::{build_tree, NodeGraph};
pub use pagination::fetch_all_pages;
pub use rate_limiter::RateLimiter;
pub use tree_fetcher::TreeFetcher;
pub use types::{
    FetcherConfig, NotionApiErrorResponse, PaginatedResponse, PaginationResult,
    TrackingCapabilities,
};
