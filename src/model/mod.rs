//! Domain model for one fetch session: the reconstructed node tree, its
//! comments and properties, and the references tracked along the way.

mod references;

pub use references::{
    composite_reference_id, file_object_source, set_file_object_url, MediaHosting, MediaSource,
    LinkLocation, LinkSite, ReferenceOrigin, TrackedLink, TrackedReference,
};

use crate::types::{NotionId, PropertyName};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether a parent pointer names a document or another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentKind {
    Document,
    Node,
}

/// Parent reference as declared by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeParent {
    pub kind: ParentKind,
    pub id: NotionId,
}

/// One element of the fetched document tree.
///
/// `payload` is the provider's type-specific object (the value under the
/// key named by `node_type`), kept as JSON so later stages can rewrite
/// URLs in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NotionId,
    pub node_type: String,
    pub parent: NodeParent,
    pub has_children: bool,
    pub created_time: Option<DateTime<Utc>>,
    pub last_edited_time: Option<DateTime<Utc>>,
    pub payload: Value,
    /// Properties of a nested document (`child_page` nodes), when fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<DocumentProperties>,
    pub children: Vec<Node>,
    pub comments: Vec<Comment>,
}

impl Node {
    /// Collects this node and its descendants in pre-order.
    pub fn preorder(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        collect_preorder(self, &mut out);
        out
    }
}

fn collect_preorder<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
    out.push(node);
    for child in &node.children {
        collect_preorder(child, out);
    }
}

/// Depth-first search for a node by id.
pub fn find_node_mut<'a>(nodes: &'a mut [Node], id: &NotionId) -> Option<&'a mut Node> {
    for node in nodes.iter_mut() {
        if &node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Depth-first search for a node by id.
pub fn find_node<'a>(nodes: &'a [Node], id: &NotionId) -> Option<&'a Node> {
    nodes.iter().find_map(|node| {
        if &node.id == id {
            Some(node)
        } else {
            find_node(&node.children, id)
        }
    })
}

/// A discussion comment attached to the document or to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: NotionId,
    pub discussion_id: Option<NotionId>,
    pub parent: NodeParent,
    pub rich_text: Value,
    pub plain_text: String,
    pub created_time: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
}

/// Page-level metadata retrieved with a single property call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentProperties {
    pub id: NotionId,
    pub url: Option<String>,
    pub last_edited_time: Option<DateTime<Utc>>,
    pub properties: IndexMap<PropertyName, Value>,
}

impl DocumentProperties {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(&PropertyName::new(name))
    }
}

/// Call counters for one fetch session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    pub listing_calls: u32,
    pub comment_calls: u32,
    pub property_calls: u32,
    pub nodes_fetched: u32,
    pub nodes_skipped: u32,
}

/// The assembled result of one fetch: tree, metadata and tracked references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedDocument {
    pub root_id: NotionId,
    pub nodes: Vec<Node>,
    pub root_comments: Vec<Comment>,
    pub properties: Option<DocumentProperties>,
    #[serde(skip)]
    pub media_references: Vec<TrackedReference>,
    #[serde(skip)]
    pub page_references: Vec<TrackedLink>,
    pub stats: FetchStats,
}

impl FetchedDocument {
    pub fn find_node_mut(&mut self, id: &NotionId) -> Option<&mut Node> {
        find_node_mut(&mut self.nodes, id)
    }

    pub fn find_node(&self, id: &NotionId) -> Option<&Node> {
        find_node(&self.nodes, id)
    }

    /// Total number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(|n| n.preorder().len()).sum()
    }

    /// Locates the JSON object a tracked reference was extracted from.
    ///
    /// For node media this is the node payload; for property files it is
    /// the entry at `files[index]` of the named property.
    pub fn reference_target_mut(&mut self, origin: &ReferenceOrigin) -> Option<&mut Value> {
        match origin {
            ReferenceOrigin::Node { node_id } => {
                self.find_node_mut(node_id).map(|node| &mut node.payload)
            }
            ReferenceOrigin::DocumentProperty {
                property, index, ..
            } => property_file_mut(self.properties.as_mut()?, property, *index),
            ReferenceOrigin::ContainerProperty {
                container_id,
                property,
                index,
            } => {
                let node = self.find_node_mut(container_id)?;
                property_file_mut(node.properties.as_mut()?, property, *index)
            }
        }
    }
}

fn property_file_mut<'a>(
    properties: &'a mut DocumentProperties,
    property: &PropertyName,
    index: usize,
) -> Option<&'a mut Value> {
    properties
        .properties
        .get_mut(property)?
        .get_mut("files")?
        .get_mut(index)
}
