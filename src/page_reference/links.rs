//! Locating links to other documents inside node payloads.

use crate::constants::RICH_TEXT_FIELDS;
use crate::model::{LinkLocation, LinkSite};
use crate::types::NotionId;
use serde_json::Value;

/// Finds every document link in a node payload.
///
/// Recognizes `link_to_page` nodes, page mentions and text segments whose
/// link points into the workspace. External links are ignored. A page
/// mention without a usable id is reported as an error.
pub fn link_sites(node_type: &str, payload: &Value) -> Result<Vec<LinkSite>, String> {
    let mut sites = Vec::new();

    if node_type == "link_to_page" {
        if payload.get("type").and_then(Value::as_str) == Some("page_id") {
            let raw = payload
                .get("page_id")
                .and_then(Value::as_str)
                .ok_or("link_to_page without page_id")?;
            let target = NotionId::parse(raw).map_err(|e| e.to_string())?;
            sites.push(LinkSite {
                target,
                location: LinkLocation::LinkToPage,
            });
        }
        return Ok(sites);
    }

    for &field in RICH_TEXT_FIELDS {
        let Some(segments) = payload.get(field).and_then(Value::as_array) else {
            continue;
        };
        for (index, segment) in segments.iter().enumerate() {
            if let Some(target) = segment_target(segment)? {
                sites.push(LinkSite {
                    target,
                    location: LinkLocation::RichText { field, index },
                });
            }
        }
    }

    Ok(sites)
}

fn segment_target(segment: &Value) -> Result<Option<NotionId>, String> {
    match segment.get("type").and_then(Value::as_str) {
        Some("mention") => {
            let mention = segment.get("mention").unwrap_or(&Value::Null);
            if mention.get("type").and_then(Value::as_str) != Some("page") {
                return Ok(None);
            }
            let raw = mention
                .pointer("/page/id")
                .and_then(Value::as_str)
                .ok_or("page mention without id")?;
            NotionId::parse(raw).map(Some).map_err(|e| e.to_string())
        }
        Some("text") => Ok(segment
            .pointer("/text/link/url")
            .and_then(Value::as_str)
            .and_then(NotionId::from_link)),
        _ => Ok(None),
    }
}

/// Writes `url` into the link at `location`. Returns false when the
/// location no longer exists in the payload.
pub fn rewrite_link(payload: &mut Value, location: &LinkLocation, url: &str) -> bool {
    match location {
        LinkLocation::LinkToPage => match payload.as_object_mut() {
            Some(object) => {
                object.insert("href".to_string(), Value::String(url.to_string()));
                true
            }
            None => false,
        },
        LinkLocation::RichText { field, index } => {
            let Some(segment) = payload
                .get_mut(*field)
                .and_then(|segments| segments.get_mut(*index))
            else {
                return false;
            };
            if let Some(link) = segment
                .pointer_mut("/text/link")
                .and_then(Value::as_object_mut)
            {
                link.insert("url".to_string(), Value::String(url.to_string()));
            }
            match segment.as_object_mut() {
                Some(object) => {
                    object.insert("href".to_string(), Value::String(url.to_string()));
                    true
                }
                None => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const TARGET: &str = "5b1f3c2a-9d4e-4f6a-8b7c-0123456789ab";

    #[test]
    fn finds_mentions_and_internal_text_links() {
        let payload = json!({
            "rich_text": [
                {"type": "text", "text": {"content": "see "}, "href": null},
                {"type": "mention", "mention": {"type": "page", "page": {"id": TARGET}}, "href": "https://www.notion.so/5b1f3c2a9d4e4f6a8b7c0123456789ab"},
                {"type": "text", "text": {"content": "docs", "link": {"url": "/5b1f3c2a9d4e4f6a8b7c0123456789ab"}}},
                {"type": "text", "text": {"content": "web", "link": {"url": "https://example.com"}}}
            ]
        });
        let sites = link_sites("paragraph", &payload).unwrap();
        assert_eq!(sites.len(), 2);
        assert!(sites.iter().all(|s| s.target.as_str() == "5b1f3c2a9d4e4f6a8b7c0123456789ab"));
        assert_eq!(
            sites[0].location,
            LinkLocation::RichText { field: "rich_text", index: 1 }
        );
    }

    #[test]
    fn link_to_page_nodes_are_sites() {
        let payload = json!({"type": "page_id", "page_id": TARGET});
        let sites = link_sites("link_to_page", &payload).unwrap();
        assert_eq!(sites[0].location, LinkLocation::LinkToPage);
    }

    #[test]
    fn mention_without_id_is_malformed() {
        let payload = json!({"rich_text": [{"type": "mention", "mention": {"type": "page", "page": {}}}]});
        assert!(link_sites("paragraph", &payload).is_err());
    }

    #[test]
    fn rewrites_text_links_and_hrefs() {
        let mut payload = json!({
            "rich_text": [{"type": "text", "text": {"content": "docs", "link": {"url": "/abc"}}, "href": "/abc"}]
        });
        let location = LinkLocation::RichText { field: "rich_text", index: 0 };
        assert!(rewrite_link(&mut payload, &location, "https://site.test/intro"));
        assert_eq!(payload["rich_text"][0]["text"]["link"]["url"], "https://site.test/intro");
        assert_eq!(payload["rich_text"][0]["href"], "https://site.test/intro");

        let missing = LinkLocation::RichText { field: "caption", index: 3 };
        assert!(!rewrite_link(&mut payload, &missing, "x"));
    }
}
