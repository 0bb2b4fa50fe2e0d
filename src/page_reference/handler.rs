//! Rewrites links between documents to their published URLs.

use super::links::rewrite_link;
use super::property_url;
use crate::error::PageReferenceError;
use crate::manifest::{PageReferenceManifestStore, ReferenceSource};
use crate::model::FetchedDocument;
use crate::types::NotionId;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps a stored URL to the one written into documents.
pub type UrlTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Clone, Default)]
pub struct PageReferenceConfig {
    /// Property holding each document's own URL.
    pub url_property: Option<String>,
    /// Prefix joined with stored paths when no transform is set.
    pub base_url: Option<String>,
    pub transform_url: Option<UrlTransform>,
}

impl PageReferenceConfig {
    pub fn with_url_property(mut self, property: impl Into<String>) -> Self {
        self.url_property = Some(property.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_transform(mut self, transform: UrlTransform) -> Self {
        self.transform_url = Some(transform);
        self
    }
}

impl std::fmt::Debug for PageReferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageReferenceConfig")
            .field("url_property", &self.url_property)
            .field("base_url", &self.base_url)
            .field("transform_url", &self.transform_url.is_some())
            .finish()
    }
}

/// Counts from one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// URL recorded for the document itself, if its property had one.
    pub recorded_url: Option<String>,
    pub resolved_targets: usize,
    pub rewritten_links: usize,
    /// Linked documents with no manifest entry; their links are untouched.
    pub unresolved: Vec<NotionId>,
}

#[derive(Debug, Clone, Default)]
pub struct PageReferenceHandler {
    config: PageReferenceConfig,
}

impl PageReferenceHandler {
    pub fn new(config: PageReferenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PageReferenceConfig {
        &self.config
    }

    /// Records the document's own URL, then rewrites every tracked link
    /// whose target has a manifest entry. Each target is looked up once.
    pub fn process(
        &self,
        document: &mut FetchedDocument,
        manifest: &mut PageReferenceManifestStore,
    ) -> Result<ResolutionReport, PageReferenceError> {
        let mut report = ResolutionReport::default();

        if let (Some(property), Some(properties)) = (&self.config.url_property, &document.properties) {
            if let Some(url) = property_url(properties, property)? {
                manifest.update_reference(&document.root_id, url.as_str(), ReferenceSource::Property)?;
                log::debug!("Recorded {} for {}", url, document.root_id);
                report.recorded_url = Some(url);
            }
        }

        let mut resolved: HashMap<NotionId, Option<String>> = HashMap::new();
        let tracked = std::mem::take(&mut document.page_references);

        for link in &tracked {
            let sites = link.sites.as_ref().map_err(|reason| {
                PageReferenceError::MalformedReference {
                    node_id: link.node_id.to_string(),
                    reason: reason.clone(),
                }
            })?;
            let Some(node) = document.find_node_mut(&link.node_id) else {
                continue;
            };

            for site in sites {
                let url = match resolved.get(&site.target) {
                    Some(url) => url.clone(),
                    None => {
                        let url = manifest
                            .get_reference(&site.target)?
                            .map(|entry| self.public_url(&entry.url));
                        if url.is_some() {
                            report.resolved_targets += 1;
                        } else {
                            log::debug!("No published URL for linked document {}", site.target);
                            report.unresolved.push(site.target.clone());
                        }
                        resolved.insert(site.target.clone(), url.clone());
                        url
                    }
                };
                if let Some(url) = url {
                    if rewrite_link(&mut node.payload, &site.location, &url) {
                        report.rewritten_links += 1;
                    }
                }
            }
        }

        document.page_references = tracked;
        Ok(report)
    }

    /// The URL written into documents for a stored manifest URL.
    pub fn public_url(&self, stored: &str) -> String {
        if let Some(transform) = &self.config.transform_url {
            return transform(stored);
        }
        match &self.config.base_url {
            Some(base) => join_base_url(base, stored),
            None => stored.to_string(),
        }
    }
}

/// Joins a base URL with the path of a stored URL. Absolute stored URLs
/// keep only their path, query and fragment.
fn join_base_url(base: &str, stored: &str) -> String {
    let path = match url::Url::parse(stored) {
        Ok(parsed) => {
            let mut path = parsed.path().to_string();
            if let Some(query) = parsed.query() {
                path.push('?');
                path.push_str(query);
            }
            if let Some(fragment) = parsed.fragment() {
                path.push('#');
                path.push_str(fragment);
            }
            path
        }
        Err(_) => stored.to_string(),
    };
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
