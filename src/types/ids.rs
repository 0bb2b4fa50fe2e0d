use super::ValidationError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A Notion object identifier in canonical form.
///
/// The provider hands out ids both dashed (`550e8400-e29b-...`) and
/// undashed, and embeds them in URLs. Every id that enters the crate goes
/// through [`NotionId::parse`], so two ids naming the same object always
/// compare equal: tree grouping, task de-duplication, manifest keys and
/// page-reference lookups all rely on this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotionId(String); // Store the non-hyphenated version internally

impl NotionId {
    /// Returns the canonical non-hyphenated ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the hyphenated UUID format for API compatibility.
    pub fn to_hyphenated(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            &self.0[0..8],
            &self.0[8..12],
            &self.0[12..16],
            &self.0[16..20],
            &self.0[20..32]
        )
    }

    /// Creates a NotionId from a validated hex string.
    fn from_hex(hex: &str) -> Result<Self, ValidationError> {
        if hex.len() == 32 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(NotionId(hex.to_lowercase()))
        } else {
            Err(ValidationError::InvalidId(format!(
                "Invalid Notion ID format: {}",
                hex
            )))
        }
    }

    /// Parses various Notion ID formats.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let cleaned = input.trim().trim_end_matches('/');

        // 1. UUID format with dashes
        if let Ok(uuid) = Uuid::parse_str(cleaned) {
            return Ok(NotionId(uuid.as_simple().to_string()));
        }

        // 2. Direct 32-char hex ID
        if cleaned.len() == 32 && cleaned.chars().all(|c| c.is_ascii_hexdigit()) {
            return Self::from_hex(cleaned);
        }

        // 3. Extract from URLs
        if cleaned.contains("notion") {
            return Self::extract_from_url(cleaned);
        }

        Err(ValidationError::InvalidId(format!(
            "Could not parse Notion ID from: {}",
            input
        )))
    }

    /// Parses the target of an in-document link.
    ///
    /// Accepts Notion page URLs and workspace-relative paths such as
    /// `/550e8400e29b41d4a716446655440000#block`. Anything else is an
    /// external link and yields `None`.
    pub fn from_link(href: &str) -> Option<Self> {
        let href = href.trim();
        if let Some(path) = href.strip_prefix('/') {
            let path = path.split(['#', '?']).next().unwrap_or_default();
            let last = path.rsplit('/').next().unwrap_or_default();
            let candidate = last.rsplit('-').next().unwrap_or_default();
            return Self::parse(last)
                .or_else(|_| Self::parse(candidate))
                .ok();
        }
        if href.contains("notion.so") || href.contains("notion.site") {
            return Self::extract_from_url(href).ok();
        }
        None
    }

    /// Extracts ID from Notion URLs.
    fn extract_from_url(url: &str) -> Result<Self, ValidationError> {
        lazy_static::lazy_static! {
            static ref ID_REGEX: Regex = Regex::new(
                r"(?:[/-])([a-fA-F0-9]{32}|[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12})(?:[/?#]|$)"
            ).expect("Failed to compile Notion ID regex - this is a bug in the code");
        }

        if let Some(captures) = ID_REGEX.captures(url) {
            if let Some(id_match) = captures.get(1) {
                let id = id_match.as_str().replace('-', "");
                return Self::from_hex(&id);
            }
        }

        Err(ValidationError::InvalidId(format!(
            "No valid ID found in URL: {}",
            url
        )))
    }
}

impl fmt::Display for NotionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for NotionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for NotionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NotionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NotionId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parsing() {
        let id = NotionId::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(id.as_str(), "550e8400e29b41d4a716446655440000");

        let id = NotionId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(id.as_str(), "550e8400e29b41d4a716446655440000");

        let id =
            NotionId::parse("https://www.notion.so/Test-Page-550e8400e29b41d4a716446655440000")
                .unwrap();
        assert_eq!(id.as_str(), "550e8400e29b41d4a716446655440000");
    }

    #[test]
    fn dashed_and_plain_forms_compare_equal() {
        let dashed = NotionId::parse("550E8400-E29B-41D4-A716-446655440000").unwrap();
        let plain = NotionId::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(dashed, plain);
    }

    #[test]
    fn test_invalid_ids() {
        assert!(NotionId::parse("too-short").is_err());
        assert!(NotionId::parse("not-hex-chars-00000000000000000").is_err());
        assert!(NotionId::parse("").is_err());
    }

    #[test]
    fn test_to_hyphenated() {
        let id = NotionId::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(id.to_hyphenated(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn link_targets() {
        let expected = NotionId::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(
            NotionId::from_link("/550e8400e29b41d4a716446655440000#abc"),
            Some(expected.clone())
        );
        assert_eq!(
            NotionId::from_link("/My-Page-550e8400e29b41d4a716446655440000"),
            Some(expected.clone())
        );
        assert_eq!(
            NotionId::from_link("https://www.notion.so/ws/Doc-550e8400e29b41d4a716446655440000"),
            Some(expected)
        );
        assert_eq!(NotionId::from_link("https://example.com/page"), None);
    }
}
