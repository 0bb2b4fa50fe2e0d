//! Runs a media strategy over every reference of a fetched document.

use super::{candidate_filename, MediaStrategy, ProcessInput, ProcessOutcome};
use crate::error::{AppError, MediaError};
use crate::manifest::{ManifestStore, MediaManifestStore};
use crate::model::{set_file_object_url, FetchedDocument, TrackedReference};
use futures::future::join_all;
use std::collections::HashSet;

/// Counts from one media pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaReport {
    pub processed: usize,
    pub manifest_updates: usize,
    pub rewritten: usize,
    pub evicted: usize,
}

pub struct MediaHandler {
    strategy: MediaStrategy,
}

impl MediaHandler {
    pub fn new(strategy: MediaStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &MediaStrategy {
        &self.strategy
    }

    /// Processes all tracked references, rewrites their URLs in the
    /// document and persists the manifest once.
    ///
    /// References run concurrently. Entries whose keys were not touched in
    /// this run are cleaned up and evicted. If any reference fails (only
    /// possible without fail-forward), every sibling still finishes, then
    /// the first error is returned and nothing is evicted or saved.
    pub async fn process(
        &self,
        document: &mut FetchedDocument,
        manifest: &mut MediaManifestStore,
    ) -> Result<MediaReport, AppError> {
        let references = std::mem::take(&mut document.media_references);
        log::info!(
            "Processing {} media references with the {} strategy",
            references.len(),
            self.strategy.name()
        );

        let results = {
            let manifest = &*manifest;
            join_all(
                references
                    .iter()
                    .map(|reference| self.process_one(reference, manifest)),
            )
            .await
        };

        let mut outcomes = Vec::with_capacity(results.len());
        let mut first_error: Option<MediaError> = None;
        for result in results {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    log::error!("{}", e);
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            document.media_references = references;
            return Err(e.into());
        }

        let mut report = MediaReport {
            processed: outcomes.len(),
            ..MediaReport::default()
        };
        let mut touched = HashSet::new();

        for (reference, (composite_id, outcome)) in references.iter().zip(outcomes) {
            if outcome.needs_manifest_update {
                manifest.update_entry(
                    &composite_id,
                    outcome.media_info.clone(),
                    reference.last_edited,
                )?;
                report.manifest_updates += 1;
            }
            if outcome.touched {
                touched.insert(composite_id.clone());
            }

            let url = self.strategy.transform(&outcome.media_info);
            let written = document
                .reference_target_mut(&reference.origin)
                .is_some_and(|target| set_file_object_url(target, &url));
            if written {
                report.rewritten += 1;
            } else {
                log::warn!("Could not write media URL back for {}", composite_id);
            }
        }

        for key in manifest.entry_ids()? {
            if touched.contains(&key) {
                continue;
            }
            if let Some(entry) = manifest.get_entry(&key)?.cloned() {
                self.strategy.cleanup(&entry).await;
            }
            manifest.remove_entry(&key)?;
            report.evicted += 1;
            log::debug!("Evicted media entry {}", key);
        }

        manifest.save().await?;
        document.media_references = references;
        log::info!(
            "Media pass done: {} processed, {} manifest updates, {} evicted",
            report.processed,
            report.manifest_updates,
            report.evicted
        );
        Ok(report)
    }

    async fn process_one(
        &self,
        reference: &TrackedReference,
        manifest: &MediaManifestStore,
    ) -> Result<(String, ProcessOutcome), MediaError> {
        let composite_id = reference.composite_id();
        let filename = candidate_filename(&composite_id);
        let outcome = {
            let input = ProcessInput {
                reference,
                composite_id: &composite_id,
                index: reference.origin.index(),
                manifest,
                last_edited: reference.last_edited,
                candidate_filename: &filename,
            };
            self.strategy.process(&input).await?
        };
        Ok((composite_id, outcome))
    }
}
