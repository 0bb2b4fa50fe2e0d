// tests/common/mod.rs
//! In-memory Notion workspace and JSON fixture builders shared by the
//! integration tests.

#![allow(dead_code)]

use notion_ingest::{AppError, NotionErrorCode, NotionId, NotionRepository, PaginatedResponse};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub const CREATED: &str = "2024-03-01T10:00:00.000Z";
pub const EDITED: &str = "2024-03-02T12:30:00.000Z";

/// A remote call observed by [`MockWorkspace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Children {
        parent: NotionId,
        cursor: Option<String>,
    },
    Page(NotionId),
    Comments(NotionId),
}

/// Serves canned listings, pages and comments keyed by id.
#[derive(Default)]
pub struct MockWorkspace {
    children: HashMap<NotionId, Vec<Vec<Value>>>,
    pages: HashMap<NotionId, Value>,
    comments: HashMap<NotionId, Vec<Value>>,
    failing: HashSet<NotionId>,
    calls: Mutex<Vec<Call>>,
}

impl MockWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(self, parent: &NotionId, results: Vec<Value>) -> Self {
        self.with_paged_children(parent, vec![results])
    }

    /// Children split across several result pages.
    pub fn with_paged_children(mut self, parent: &NotionId, pages: Vec<Vec<Value>>) -> Self {
        self.children.insert(parent.clone(), pages);
        self
    }

    pub fn with_page(mut self, page: Value) -> Self {
        let id = NotionId::parse(page["id"].as_str().unwrap()).unwrap();
        self.pages.insert(id, page);
        self
    }

    pub fn with_comments(mut self, target: &NotionId, comments: Vec<Value>) -> Self {
        self.comments.insert(target.clone(), comments);
        self
    }

    /// Every call touching `id` fails with a non-retryable error.
    pub fn failing_on(mut self, id: &NotionId) -> Self {
        self.failing.insert(id.clone());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn listing_calls(&self) -> usize {
        self.count(|call| matches!(call, Call::Children { .. }))
    }

    pub fn page_calls(&self) -> usize {
        self.count(|call| matches!(call, Call::Page(_)))
    }

    pub fn comment_calls(&self) -> usize {
        self.count(|call| matches!(call, Call::Comments(_)))
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, id: &NotionId) -> Result<(), AppError> {
        if self.failing.contains(id) {
            return Err(not_found(id));
        }
        Ok(())
    }
}

fn not_found(id: &NotionId) -> AppError {
    AppError::NotionService {
        code: NotionErrorCode::ObjectNotFound,
        message: format!("Could not find block with ID: {}", id.to_hyphenated()),
        status: reqwest::StatusCode::NOT_FOUND,
    }
}

fn cursor_index(cursor: Option<&str>) -> usize {
    cursor
        .and_then(|c| c.strip_prefix("cursor-"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[async_trait::async_trait]
impl NotionRepository for MockWorkspace {
    async fn list_children(
        &self,
        parent: &NotionId,
        cursor: Option<String>,
    ) -> Result<PaginatedResponse<Value>, AppError> {
        self.record(Call::Children {
            parent: parent.clone(),
            cursor: cursor.clone(),
        });
        self.check(parent)?;

        let Some(pages) = self.children.get(parent) else {
            return Ok(PaginatedResponse::last(Vec::new()));
        };
        let index = cursor_index(cursor.as_deref());
        let results = pages.get(index).cloned().unwrap_or_default();
        if index + 1 < pages.len() {
            Ok(PaginatedResponse::with_more(
                results,
                format!("cursor-{}", index + 1),
            ))
        } else {
            Ok(PaginatedResponse::last(results))
        }
    }

    async fn retrieve_page(&self, id: &NotionId) -> Result<Value, AppError> {
        self.record(Call::Page(id.clone()));
        self.check(id)?;
        self.pages.get(id).cloned().ok_or_else(|| not_found(id))
    }

    async fn list_comments(
        &self,
        target: &NotionId,
        _cursor: Option<String>,
    ) -> Result<PaginatedResponse<Value>, AppError> {
        self.record(Call::Comments(target.clone()));
        self.check(target)?;
        Ok(PaginatedResponse::last(
            self.comments.get(target).cloned().unwrap_or_default(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

/// A deterministic id: `n` rendered as 32 hex digits.
pub fn id(n: u32) -> NotionId {
    NotionId::parse(&format!("{:032x}", n)).unwrap()
}

pub fn root() -> NotionId {
    NotionId::parse("a1a1a1a1b2b2c3c3d4d4e5e5e5e5e5e5").unwrap()
}

fn parent_json(parent: &NotionId, under_document: bool) -> Value {
    if under_document {
        json!({ "type": "page_id", "page_id": parent.to_hyphenated() })
    } else {
        json!({ "type": "block_id", "block_id": parent.to_hyphenated() })
    }
}

/// A raw block as the children listing returns it.
pub fn block(
    id: &NotionId,
    parent: &NotionId,
    under_document: bool,
    node_type: &str,
    has_children: bool,
    payload: Value,
) -> Value {
    let mut raw = json!({
        "object": "block",
        "id": id.to_hyphenated(),
        "parent": parent_json(parent, under_document),
        "type": node_type,
        "has_children": has_children,
        "created_time": CREATED,
        "last_edited_time": EDITED,
        "archived": false,
    });
    raw.as_object_mut()
        .unwrap()
        .insert(node_type.to_string(), payload);
    raw
}

pub fn text(content: &str) -> Value {
    json!({
        "type": "text",
        "text": { "content": content, "link": null },
        "plain_text": content,
        "href": null,
    })
}

pub fn linked_text(content: &str, href: &str) -> Value {
    json!({
        "type": "text",
        "text": { "content": content, "link": { "url": href } },
        "plain_text": content,
        "href": href,
    })
}

pub fn page_mention(target: &NotionId) -> Value {
    json!({
        "type": "mention",
        "mention": { "type": "page", "page": { "id": target.to_hyphenated() } },
        "plain_text": "Linked page",
        "href": format!("https://www.notion.so/{}", target.as_str()),
    })
}

pub fn paragraph_payload(segments: Vec<Value>) -> Value {
    json!({ "rich_text": segments, "color": "default" })
}

pub fn paragraph(id: &NotionId, parent: &NotionId, under_document: bool, content: &str) -> Value {
    block(
        id,
        parent,
        under_document,
        "paragraph",
        false,
        paragraph_payload(vec![text(content)]),
    )
}

pub fn hosted_file(url: &str) -> Value {
    json!({
        "type": "file",
        "file": { "url": url, "expiry_time": "2024-03-02T13:30:00.000Z" },
        "caption": [],
    })
}

pub fn external_file(url: &str) -> Value {
    json!({
        "type": "external",
        "external": { "url": url },
        "caption": [],
    })
}

pub fn image(id: &NotionId, parent: &NotionId, file: Value) -> Value {
    block(id, parent, true, "image", false, file)
}

/// A page-retrieval response.
pub fn page(id: &NotionId, properties: Value) -> Value {
    json!({
        "object": "page",
        "id": id.to_hyphenated(),
        "url": format!("https://www.notion.so/{}", id.as_str()),
        "created_time": CREATED,
        "last_edited_time": EDITED,
        "properties": properties,
    })
}

pub fn url_property(url: &str) -> Value {
    json!({ "id": "%3AUrl", "type": "url", "url": url })
}

pub fn title_property(title: &str) -> Value {
    json!({ "id": "title", "type": "title", "title": [text(title)] })
}

pub fn files_property(files: Vec<Value>) -> Value {
    json!({ "id": "Fls", "type": "files", "files": files })
}

pub fn comment(id: &NotionId, target: &NotionId, under_document: bool, content: &str) -> Value {
    json!({
        "object": "comment",
        "id": id.to_hyphenated(),
        "discussion_id": id.to_hyphenated(),
        "parent": parent_json(target, under_document),
        "rich_text": [text(content)],
        "created_time": CREATED,
        "created_by": { "object": "user", "id": "user-1" },
    })
}
