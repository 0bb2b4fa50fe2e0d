// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role.

// ---------------------------------------------------------------------------
// Notion API boundaries
// ---------------------------------------------------------------------------

/// How many objects the Notion API returns per page of results.
///
/// The Notion API maximum is 100. We use the maximum to minimize
/// round-trips during the crawl.
pub const NOTION_API_PAGE_SIZE: usize = 100;

/// Notion's documented average request budget per integration.
pub const DEFAULT_MAX_REQUESTS_PER_SECOND: u32 = 3;

/// How many queued fetch tasks are dispatched concurrently per batch.
pub const DEFAULT_FETCH_BATCH_SIZE: usize = 3;

/// Attempts per remote call before a transient failure aborts the fetch.
pub const REMOTE_CALL_MAX_ATTEMPTS: u32 = 3;

/// Node types the fetcher keeps. Anything else the provider returns,
/// including `unsupported`, is dropped before storage.
pub const SUPPORTED_NODE_TYPES: &[&str] = &[
    "paragraph",
    "heading_1",
    "heading_2",
    "heading_3",
    "bulleted_list_item",
    "numbered_list_item",
    "to_do",
    "toggle",
    "quote",
    "callout",
    "code",
    "equation",
    "divider",
    "breadcrumb",
    "table_of_contents",
    "image",
    "video",
    "audio",
    "file",
    "pdf",
    "bookmark",
    "embed",
    "link_preview",
    "child_page",
    "child_database",
    "link_to_page",
    "table",
    "table_row",
    "column_list",
    "column",
    "synced_block",
    "template",
];

/// Node types that embed a single media asset.
pub const MEDIA_NODE_TYPES: &[&str] = &["image", "video", "audio", "file", "pdf"];

/// Payload fields that carry rich text which may contain links or mentions.
pub const RICH_TEXT_FIELDS: &[&str] = &["rich_text", "caption"];

// ---------------------------------------------------------------------------
// Persistence layout
// ---------------------------------------------------------------------------

/// Default root directory for persisted manifests.
pub const DEFAULT_MANIFEST_DIR: &str = ".notion-ingest";

/// Subdirectory holding one media manifest per root document.
pub const MEDIA_MANIFEST_SUBDIR: &str = "media";

/// Subdirectory holding the global page-reference manifest.
pub const PAGE_REFERENCE_MANIFEST_SUBDIR: &str = "page-references";

/// File name of the global page-reference manifest.
pub const PAGE_REFERENCE_MANIFEST_FILE: &str = "references.json";

/// Extension used when the asset's content type tells us nothing.
pub const BINARY_FALLBACK_EXTENSION: &str = "bin";
