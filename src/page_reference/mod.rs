//! Cross-document link resolution.
//!
//! Each converted document records its own public URL (read from a URL
//! property) in the global page-reference manifest; links from other
//! documents are then rewritten to that URL. The
//! [`PageReferenceManifestBuilder`] fills the manifest for a whole
//! workspace up front, so links resolve even to documents not yet converted.

mod builder;
mod handler;
mod links;

pub use builder::{IndexReport, PageReferenceManifestBuilder};
pub use handler::{
    PageReferenceConfig, PageReferenceHandler, ResolutionReport, UrlTransform,
};
pub use links::{link_sites, rewrite_link};

use crate::error::PageReferenceError;
use crate::model::DocumentProperties;
use regex::Regex;
use serde_json::Value;

lazy_static::lazy_static! {
    static ref URL_LIKE: Regex = Regex::new(r"^(?:https?://\S+|/\S*)$")
        .expect("Failed to compile URL regex - this is a bug in the code");
}

/// Reads a document's public URL from `property`.
///
/// `url` properties are taken as-is; `rich_text` and `title` properties
/// count only if their text looks like a URL or an absolute path. A missing
/// or empty property yields `None`; other property types are an error.
pub fn property_url(
    properties: &DocumentProperties,
    property: &str,
) -> Result<Option<String>, PageReferenceError> {
    let Some(value) = properties.get(property) else {
        return Ok(None);
    };
    let property_type = value.get("type").and_then(Value::as_str).unwrap_or_default();

    let candidate = match property_type {
        "url" => value
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string),
        "rich_text" | "title" => {
            let text = value
                .get(property_type)
                .and_then(Value::as_array)
                .map(|segments| {
                    segments
                        .iter()
                        .filter_map(|s| s.get("plain_text").and_then(Value::as_str))
                        .collect::<String>()
                })
                .unwrap_or_default();
            let text = text.trim();
            if text.is_empty() {
                None
            } else if URL_LIKE.is_match(text) {
                Some(text.to_string())
            } else {
                return Err(PageReferenceError::InvalidProperty {
                    document_id: properties.id.to_string(),
                    property: property.to_string(),
                    reason: format!("'{}' is not a URL", text),
                });
            }
        }
        other => {
            return Err(PageReferenceError::InvalidProperty {
                document_id: properties.id.to_string(),
                property: property.to_string(),
                reason: format!("unsupported property type '{}'", other),
            })
        }
    };

    Ok(candidate
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty()))
}
