// src/lib.rs
//! notion-ingest library: fetches Notion documents as node trees and
//! resolves their media and cross-document links.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ManifestError`, `MediaError`, `PageReferenceError`
//! - **Configuration**: `PipelineConfig`, `CommandLineInput`
//! - **Domain model**: `FetchedDocument`, `Node`, `Comment`, tracked references
//! - **API client**: `NotionHttpClient`, `NotionRepository`, `TreeFetcher`, `RateLimiter`
//! - **Manifests**: `ManifestStore`, `MediaManifestStore`, `PageReferenceManifestStore`
//! - **Media**: `MediaStrategy`, `MediaHandler` and the three strategies
//! - **Page references**: `PageReferenceHandler`, `PageReferenceManifestBuilder`
//! - **Pipeline**: `ConversionPipeline`, `PipelineBuilder`, stage traits

mod api;
mod config;
mod constants;
mod error;
mod error_recovery;
mod manifest;
mod media;
mod model;
mod output;
mod page_reference;
mod pipeline;
mod types;

// --- Error Handling ---
pub use crate::error::{
    AppError, BoxError, ManifestError, MediaError, MediaOperation, NotionErrorCode,
    PageReferenceError,
};
pub use crate::error_recovery::retry_with_backoff;
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{
    CommandLineInput, ConvertConfig, MediaMode, PipelineConfig, Task,
};
pub use crate::constants::{
    DEFAULT_FETCH_BATCH_SIZE, DEFAULT_MANIFEST_DIR, DEFAULT_MAX_REQUESTS_PER_SECOND,
    MEDIA_NODE_TYPES, SUPPORTED_NODE_TYPES,
};

// --- Domain Types ---
pub use crate::types::{ApiKey, NotionId, PropertyName};

// --- Domain Model ---
pub use crate::model::{
    composite_reference_id, file_object_source, find_node, find_node_mut, set_file_object_url,
    Comment, DocumentProperties, FetchStats, FetchedDocument, LinkLocation, LinkSite, MediaHosting,
    MediaSource, Node, NodeParent, ParentKind, ReferenceOrigin, TrackedLink, TrackedReference,
};

// --- API Client ---
pub use crate::api::{
    build_tree, fetch_all_pages,
    parser::{parse_comment, parse_document_properties, parse_node},
    FetchTask, FetcherConfig, NodeGraph, NotionApiErrorResponse, NotionHttpClient,
    NotionRepository, PaginatedResponse, PaginationResult, RateLimiter, TaskKind, TaskQueue,
    TrackingCapabilities, TreeFetcher,
};

// --- Manifests ---
pub use crate::manifest::{
    ManifestDirectory, ManifestStore, MediaInfo, MediaKind, MediaManifest, MediaManifestEntry,
    MediaManifestStore, PageReferenceEntry, PageReferenceManifest, PageReferenceManifestStore,
    ReferenceSource,
};

// --- Media ---
pub use crate::media::{
    candidate_filename, extension_for_content_type, CleanupHandler, DirectStrategy,
    DownloadConfig, DownloadStrategy, MediaHandler, MediaReport, MediaStrategy, PathTransform,
    ProcessInput, ProcessOutcome, UploadConfig, UploadHandler, UploadRequest, UploadStrategy,
};

// --- Page References ---
pub use crate::page_reference::{
    link_sites, property_url, rewrite_link, IndexReport, PageReferenceConfig, PageReferenceHandler,
    PageReferenceManifestBuilder, ResolutionReport, UrlTransform,
};

// --- Pipeline ---
pub use crate::pipeline::{
    ChainData, ChainStage, ConversionPipeline, ExportStage, Exporter, FetchStage, MediaStage,
    MediaStrategyConfig, PageReferenceStage, PipelineBuilder, RenderStage, Renderer,
    TouchedManifests,
};

// --- Output ---
pub use crate::output::{FileExporter, JsonTreeRenderer, StdoutExporter};
