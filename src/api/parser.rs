// src/api/parser.rs
//! Conversion of raw provider JSON into the domain model.
//!
//! The HTTP layer hands every response body to [`parse_api_response`]; the
//! fetcher then turns individual results into [`Node`], [`Comment`] and
//! [`DocumentProperties`] values.

use super::client::ApiResponse;
use super::types::NotionApiErrorResponse;
use crate::constants::SUPPORTED_NODE_TYPES;
use crate::error::{AppError, NotionErrorCode};
use crate::model::{Comment, DocumentProperties, Node, NodeParent, ParentKind};
use crate::types::{NotionId, PropertyName};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Parses a response body, turning non-success statuses into typed errors.
pub fn parse_api_response<T>(result: ApiResponse<String>) -> Result<T, AppError>
where
    T: DeserializeOwned,
{
    if result.status.is_success() {
        serde_json::from_str(&result.data).map_err(|e| {
            log::error!("Failed to parse response from {}: {}", result.url, e);
            AppError::MalformedResponse(format!("{} (body: {})", e, preview(&result.data)))
        })
    } else {
        Err(parse_error_response(&result))
    }
}

fn parse_error_response(result: &ApiResponse<String>) -> AppError {
    match serde_json::from_str::<NotionApiErrorResponse>(&result.data) {
        Ok(body) => AppError::NotionService {
            code: NotionErrorCode::from_api_response(&body.code),
            message: body.message,
            status: result.status,
        },
        Err(_) => AppError::NotionService {
            code: NotionErrorCode::from_http_status(result.status.as_u16()),
            message: format!("HTTP {} from {}", result.status, result.url),
            status: result.status,
        },
    }
}

fn preview(body: &str) -> String {
    match body.char_indices().nth(500) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Parses one listing result into a node.
///
/// Returns `Ok(None)` for node types outside the supported set; those are
/// dropped before they reach the tree. `listed_under` is the id whose
/// children were being listed and stands in for a missing parent pointer.
pub fn parse_node(raw: &Value, listed_under: &NotionId) -> Result<Option<Node>, AppError> {
    let id = required_id(raw, "id")?;
    let node_type = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::MalformedResponse(format!("Node {} has no type", id)))?;

    if !SUPPORTED_NODE_TYPES.contains(&node_type) {
        log::debug!("Skipping unsupported node {} of type '{}'", id, node_type);
        return Ok(None);
    }

    let parent = parse_parent(raw.get("parent")).unwrap_or_else(|| NodeParent {
        kind: ParentKind::Node,
        id: listed_under.clone(),
    });

    Ok(Some(Node {
        payload: raw
            .get(node_type)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())),
        node_type: node_type.to_string(),
        parent,
        has_children: raw
            .get("has_children")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        created_time: timestamp(raw, "created_time"),
        last_edited_time: timestamp(raw, "last_edited_time"),
        properties: None,
        children: Vec::new(),
        comments: Vec::new(),
        id,
    }))
}

/// Parses one comment returned for `target`.
pub fn parse_comment(raw: &Value, target: &NotionId) -> Result<Comment, AppError> {
    let rich_text = raw
        .get("rich_text")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));
    let plain_text = rich_text
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("plain_text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default();

    Ok(Comment {
        id: required_id(raw, "id")?,
        discussion_id: raw
            .get("discussion_id")
            .and_then(Value::as_str)
            .and_then(|s| NotionId::parse(s).ok()),
        parent: parse_parent(raw.get("parent")).unwrap_or_else(|| NodeParent {
            kind: ParentKind::Node,
            id: target.clone(),
        }),
        rich_text,
        plain_text,
        created_time: timestamp(raw, "created_time"),
        created_by: raw
            .pointer("/created_by/id")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Parses a page-retrieval response into its property map.
pub fn parse_document_properties(raw: &Value) -> Result<DocumentProperties, AppError> {
    let id = required_id(raw, "id")?;
    let properties = match raw.get("properties") {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(name, value)| (PropertyName::new(name.as_str()), value.clone()))
            .collect::<IndexMap<_, _>>(),
        Some(Value::Null) | None => IndexMap::new(),
        Some(other) => {
            return Err(AppError::MalformedResponse(format!(
                "Properties of {} are not an object: {}",
                id, other
            )))
        }
    };

    Ok(DocumentProperties {
        url: raw.get("url").and_then(Value::as_str).map(str::to_string),
        last_edited_time: timestamp(raw, "last_edited_time"),
        properties,
        id,
    })
}

fn parse_parent(parent: Option<&Value>) -> Option<NodeParent> {
    let parent = parent?;
    let parent_type = parent.get("type")?.as_str()?;
    let kind = match parent_type {
        "page_id" | "database_id" | "data_source_id" => ParentKind::Document,
        "block_id" => ParentKind::Node,
        _ => return None,
    };
    let id = NotionId::parse(parent.get(parent_type)?.as_str()?).ok()?;
    Some(NodeParent { kind, id })
}

fn required_id(raw: &Value, field: &str) -> Result<NotionId, AppError> {
    let value = raw
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::MalformedResponse(format!("Object without '{}': {}", field, raw)))?;
    Ok(NotionId::parse(value)?)
}

fn timestamp(raw: &Value, field: &str) -> Option<DateTime<Utc>> {
    raw.get(field)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;
    use serde_json::json;

    const PAGE: &str = "11111111-1111-1111-1111-111111111111";
    const NODE: &str = "22222222-2222-2222-2222-222222222222";

    fn page_id() -> NotionId {
        NotionId::parse(PAGE).unwrap()
    }

    #[test]
    fn parses_node_with_block_parent() {
        let raw = json!({
            "object": "block",
            "id": NODE,
            "type": "paragraph",
            "parent": {"type": "block_id", "block_id": "33333333333333333333333333333333"},
            "has_children": true,
            "last_edited_time": "2024-03-01T10:00:00.000Z",
            "paragraph": {"rich_text": []}
        });
        let node = parse_node(&raw, &page_id()).unwrap().unwrap();
        assert_eq!(node.id.as_str(), "22222222222222222222222222222222");
        assert_eq!(node.parent.kind, ParentKind::Node);
        assert_eq!(node.parent.id.as_str(), "33333333333333333333333333333333");
        assert!(node.has_children);
        assert_eq!(node.payload, json!({"rich_text": []}));
        assert!(node.last_edited_time.is_some());
    }

    #[test]
    fn unsupported_types_are_dropped() {
        let raw = json!({"id": NODE, "type": "unsupported", "unsupported": {}});
        assert!(parse_node(&raw, &page_id()).unwrap().is_none());
    }

    #[test]
    fn missing_parent_falls_back_to_listing_target() {
        let raw = json!({"id": NODE, "type": "divider", "divider": {}});
        let node = parse_node(&raw, &page_id()).unwrap().unwrap();
        assert_eq!(node.parent.id, page_id());
    }

    #[test]
    fn comment_plain_text_joins_segments() {
        let raw = json!({
            "id": NODE,
            "discussion_id": "44444444444444444444444444444444",
            "parent": {"type": "page_id", "page_id": PAGE},
            "rich_text": [{"plain_text": "Looks "}, {"plain_text": "good"}],
            "created_by": {"id": "user-1"}
        });
        let comment = parse_comment(&raw, &page_id()).unwrap();
        assert_eq!(comment.plain_text, "Looks good");
        assert_eq!(comment.parent.kind, ParentKind::Document);
        assert_eq!(comment.created_by.as_deref(), Some("user-1"));
    }

    #[test]
    fn properties_keep_raw_values() {
        let raw = json!({
            "object": "page",
            "id": PAGE,
            "url": "https://www.notion.so/Page-11111111111111111111111111111111",
            "properties": {"Slug": {"type": "url", "url": "/docs/intro"}}
        });
        let props = parse_document_properties(&raw).unwrap();
        assert_eq!(props.get("Slug").unwrap()["url"], "/docs/intro");
    }

    #[test]
    fn error_bodies_become_typed_errors() {
        let response = ApiResponse {
            data: r#"{"object":"error","status":404,"code":"object_not_found","message":"gone"}"#
                .to_string(),
            status: StatusCode::NOT_FOUND,
            url: "https://api.notion.com/v1/pages/x".to_string(),
        };
        match parse_api_response::<Value>(response) {
            Err(AppError::NotionService { code, message, .. }) => {
                assert!(code.is_not_found());
                assert_eq!(message, "gone");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unparseable_error_falls_back_to_status() {
        let response = ApiResponse {
            data: "<html>bad gateway</html>".to_string(),
            status: StatusCode::BAD_GATEWAY,
            url: "https://api.notion.com/v1/blocks".to_string(),
        };
        let err = parse_api_response::<Value>(response).unwrap_err();
        assert!(err.is_retryable());
    }
}
