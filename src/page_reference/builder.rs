//! Workspace indexer for the page-reference manifest.

use super::property_url;
use crate::api::{FetcherConfig, NotionRepository, TrackingCapabilities, TreeFetcher};
use crate::error::AppError;
use crate::manifest::{ManifestStore, PageReferenceManifestStore, ReferenceSource};
use crate::model::DocumentProperties;
use crate::types::NotionId;
use std::sync::Arc;

/// Counts from one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub documents_scanned: usize,
    pub recorded: usize,
    /// Documents whose URL property could not be used, with the reason.
    pub skipped: Vec<(NotionId, String)>,
}

/// Crawls a document and all nested documents, recording each one's URL
/// property with source `manifest`.
pub struct PageReferenceManifestBuilder {
    fetcher: TreeFetcher,
    url_property: String,
}

impl PageReferenceManifestBuilder {
    /// `config` is adjusted to retrieve properties for every nested
    /// document; comments are never fetched.
    pub fn new(
        client: Arc<dyn NotionRepository>,
        config: FetcherConfig,
        url_property: impl Into<String>,
    ) -> Self {
        let config = FetcherConfig {
            fetch_comments: false,
            fetch_page_properties: true,
            fetch_child_page_properties: true,
            ..config
        };
        Self {
            fetcher: TreeFetcher::new(client, config, TrackingCapabilities::default()),
            url_property: url_property.into(),
        }
    }

    /// Indexes everything under `root` into `store` and saves it.
    /// The store must already be initialized.
    pub async fn build(
        &self,
        root: &NotionId,
        store: &mut PageReferenceManifestStore,
    ) -> Result<IndexReport, AppError> {
        let document = self.fetcher.fetch(root).await?;

        let mut report = IndexReport::default();
        let nested = document
            .nodes
            .iter()
            .flat_map(|node| node.preorder())
            .filter_map(|node| node.properties.as_ref());
        for properties in document.properties.iter().chain(nested) {
            report.documents_scanned += 1;
            self.record(properties, store, &mut report)?;
        }

        store.save().await?;
        log::info!(
            "Indexed {} documents under {}: {} URLs recorded, {} skipped",
            report.documents_scanned,
            root,
            report.recorded,
            report.skipped.len()
        );
        Ok(report)
    }

    fn record(
        &self,
        properties: &DocumentProperties,
        store: &mut PageReferenceManifestStore,
        report: &mut IndexReport,
    ) -> Result<(), AppError> {
        match property_url(properties, &self.url_property) {
            Ok(Some(url)) => {
                store.update_reference(&properties.id, url, ReferenceSource::Manifest)?;
                report.recorded += 1;
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("Skipping {}: {}", properties.id, e);
                report.skipped.push((properties.id.clone(), e.to_string()));
            }
        }
        Ok(())
    }
}
