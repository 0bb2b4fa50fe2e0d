//! References captured during the fetch pass.
//!
//! A reference never persists on its own: the media handler derives
//! manifest entries from it, keyed by [`composite_reference_id`].

use crate::types::{NotionId, PropertyName};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Where an asset is hosted, as declared by the provider's file object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaHosting {
    /// Uploaded to the provider; URLs are signed and expire.
    Provider,
    /// Linked from an external site.
    External,
}

/// The asset a reference points at.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSource {
    pub url: String,
    pub hosting: MediaHosting,
    pub name: Option<String>,
}

impl MediaSource {
    pub fn is_external(&self) -> bool {
        self.hosting == MediaHosting::External
    }
}

/// Which object a media reference was extracted from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceOrigin {
    /// A media node (image, video, file, ...) in the tree.
    Node { node_id: NotionId },
    /// Entry `index` of a files property on the root document.
    DocumentProperty {
        document_id: NotionId,
        property: PropertyName,
        index: usize,
    },
    /// Entry `index` of a files property on a nested document.
    ContainerProperty {
        container_id: NotionId,
        property: PropertyName,
        index: usize,
    },
}

impl ReferenceOrigin {
    pub fn owner_id(&self) -> &NotionId {
        match self {
            Self::Node { node_id } => node_id,
            Self::DocumentProperty { document_id, .. } => document_id,
            Self::ContainerProperty { container_id, .. } => container_id,
        }
    }

    pub fn property(&self) -> Option<&PropertyName> {
        match self {
            Self::Node { .. } => None,
            Self::DocumentProperty { property, .. } | Self::ContainerProperty { property, .. } => {
                Some(property)
            }
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Node { .. } => None,
            Self::DocumentProperty { index, .. } | Self::ContainerProperty { index, .. } => {
                Some(*index)
            }
        }
    }

    /// Manifest key for this origin.
    pub fn composite_id(&self) -> String {
        composite_reference_id(
            self.owner_id(),
            self.property().map(PropertyName::as_str),
            self.index(),
        )
    }
}

/// Derives the manifest key for a reference.
///
/// A pure function of its inputs: node media keys are the bare node id,
/// property files are `<owner>_<property>_<index>`.
pub fn composite_reference_id(
    owner: &NotionId,
    property: Option<&str>,
    index: Option<usize>,
) -> String {
    match (property, index) {
        (None, None) => owner.as_str().to_string(),
        (Some(property), index) => {
            format!("{}_{}_{}", owner.as_str(), property, index.unwrap_or(0))
        }
        (None, Some(index)) => format!("{}_{}", owner.as_str(), index),
    }
}

/// A media reference tracked during fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedReference {
    pub origin: ReferenceOrigin,
    /// Mutation timestamp of the owning node or document.
    pub last_edited: Option<DateTime<Utc>>,
    pub source: MediaSource,
}

impl TrackedReference {
    pub fn composite_id(&self) -> String {
        self.origin.composite_id()
    }
}

/// Where in a payload a link lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkLocation {
    /// The payload of a `link_to_page` node.
    LinkToPage,
    /// Segment `index` of the rich-text array under `field`.
    RichText { field: &'static str, index: usize },
}

/// One link to another document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSite {
    pub target: NotionId,
    pub location: LinkLocation,
}

/// A node whose content links to other documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedLink {
    pub node_id: NotionId,
    /// The links found in the node payload, or why they could not be read.
    pub sites: Result<Vec<LinkSite>, String>,
}

impl TrackedLink {
    /// Target documents in payload order; empty for a malformed node.
    pub fn targets(&self) -> Vec<&NotionId> {
        match &self.sites {
            Ok(sites) => sites.iter().map(|site| &site.target).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Reads the URL out of a provider file object
/// (`{"type": "file", "file": {"url": ...}}` or the `external` variant).
pub fn file_object_source(object: &Value) -> Option<MediaSource> {
    let file_type = object.get("type")?.as_str()?;
    let hosting = match file_type {
        "external" => MediaHosting::External,
        "file" | "file_upload" => MediaHosting::Provider,
        _ => return None,
    };
    let url = object.get(file_type)?.get("url")?.as_str()?;
    if url.is_empty() {
        return None;
    }
    Some(MediaSource {
        url: url.to_string(),
        hosting,
        name: object
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Replaces the URL inside a provider file object. Returns false when the
/// object has no URL slot.
pub fn set_file_object_url(object: &mut Value, url: &str) -> bool {
    let Some(file_type) = object
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_string)
    else {
        return false;
    };
    match object.get_mut(&file_type).and_then(Value::as_object_mut) {
        Some(inner) => {
            inner.insert("url".to_string(), Value::String(url.to_string()));
            true
        }
        None => false,
    }
}
