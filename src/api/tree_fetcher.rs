// src/api/tree_fetcher.rs
//! Queue-driven crawl of one document.
//!
//! The fetcher seeds a [`TaskQueue`] with the root, dispatches up to
//! `batch_size` tasks at a time, and folds every result into a
//! [`FetchSession`]. Discovered children enqueue further work. Once the
//! queue drains, the flat node list is assembled into a tree.

use super::fetch_queue::{FetchTask, TaskKind, TaskQueue};
use super::object_graph::NodeGraph;
use super::pagination::fetch_all_pages;
use super::parser::{parse_comment, parse_document_properties, parse_node};
use super::rate_limiter::RateLimiter;
use super::types::{FetcherConfig, TrackingCapabilities};
use super::NotionRepository;
use crate::constants::{MEDIA_NODE_TYPES, REMOTE_CALL_MAX_ATTEMPTS};
use crate::error::AppError;
use crate::error_recovery::retry_with_backoff;
use crate::model::{
    file_object_source, Comment, DocumentProperties, FetchStats, FetchedDocument, Node,
    ReferenceOrigin, TrackedLink, TrackedReference,
};
use crate::page_reference::link_sites;
use crate::types::NotionId;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const RETRY_INITIAL_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(8);

/// Raw result of one executed task.
enum TaskOutcome {
    Nodes { results: Vec<Value>, pages: u32 },
    Comments { results: Vec<Value>, pages: u32 },
    Properties(Value),
}

/// Crawls a document tree through a [`NotionRepository`].
pub struct TreeFetcher {
    client: Arc<dyn NotionRepository>,
    limiter: Arc<RateLimiter>,
    config: FetcherConfig,
    capabilities: TrackingCapabilities,
}

impl TreeFetcher {
    pub fn new(
        client: Arc<dyn NotionRepository>,
        config: FetcherConfig,
        capabilities: TrackingCapabilities,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.max_requests_per_second));
        Self::with_rate_limiter(client, config, capabilities, limiter)
    }

    /// Shares an existing limiter, e.g. between a fetcher and an indexer
    /// talking to the same integration.
    pub fn with_rate_limiter(
        client: Arc<dyn NotionRepository>,
        config: FetcherConfig,
        capabilities: TrackingCapabilities,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            client,
            limiter,
            config,
            capabilities,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn capabilities(&self) -> TrackingCapabilities {
        self.capabilities
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Fetches the full tree under `root`.
    ///
    /// The first failing task aborts the run; tasks already in flight in
    /// the same batch finish before the error is returned.
    pub async fn fetch(&self, root: &NotionId) -> Result<FetchedDocument, AppError> {
        log::info!("Fetching document {}", root);
        let mut session = FetchSession::new(root.clone(), &self.config, self.capabilities);

        session.queue.enqueue(FetchTask::nodes(root));
        if self.config.fetch_page_properties {
            session.queue.enqueue(FetchTask::properties(root));
        }
        if self.config.fetch_comments {
            session.queue.enqueue(FetchTask::comments(root));
        }

        while !session.queue.is_empty() {
            let batch = session.queue.next_batch(self.config.batch_size);
            log::debug!(
                "Dispatching {} tasks ({} still queued)",
                batch.len(),
                session.queue.pending()
            );

            let outcomes = join_all(batch.iter().map(|task| self.execute(task))).await;
            for (task, outcome) in batch.into_iter().zip(outcomes) {
                let outcome = outcome.map_err(|e| {
                    log::error!("Task {} failed: {}", task, e);
                    e
                })?;
                session.absorb(&task, outcome)?;
                session.queue.mark_processed(task);
            }
        }

        let document = session.finish();
        log::info!(
            "Fetched {} nodes for {} ({} listing, {} comment, {} property calls)",
            document.node_count(),
            root,
            document.stats.listing_calls,
            document.stats.comment_calls,
            document.stats.property_calls
        );
        Ok(document)
    }

    async fn execute(&self, task: &FetchTask) -> Result<TaskOutcome, AppError> {
        let id = &task.id;
        match task.kind {
            TaskKind::FetchNodes => {
                let page = fetch_all_pages(move |cursor: Option<String>| async move {
                    self.remote(move || self.client.list_children(id, cursor.clone()))
                        .await
                })
                .await?;
                Ok(TaskOutcome::Nodes {
                    results: page.items,
                    pages: page.pages_fetched,
                })
            }
            TaskKind::FetchComments => {
                let page = fetch_all_pages(move |cursor: Option<String>| async move {
                    self.remote(move || self.client.list_comments(id, cursor.clone()))
                        .await
                })
                .await?;
                Ok(TaskOutcome::Comments {
                    results: page.items,
                    pages: page.pages_fetched,
                })
            }
            TaskKind::FetchPageProperties => {
                let raw = self.remote(move || self.client.retrieve_page(id)).await?;
                Ok(TaskOutcome::Properties(raw))
            }
        }
    }

    /// Runs one remote call through the rate limiter, retrying transient
    /// failures.
    async fn remote<T, F, Fut>(&self, call: F) -> Result<T, AppError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let call = &call;
        let limiter = &self.limiter;
        retry_with_backoff(
            move || limiter.execute(call),
            REMOTE_CALL_MAX_ATTEMPTS,
            RETRY_INITIAL_DELAY,
            RETRY_MAX_DELAY,
        )
        .await
    }
}

/// Mutable state of one crawl.
struct FetchSession {
    root: NotionId,
    fetch_comments: bool,
    fetch_child_page_properties: bool,
    capabilities: TrackingCapabilities,
    queue: TaskQueue,
    nodes: Vec<Node>,
    root_comments: Vec<Comment>,
    node_comments: HashMap<NotionId, Vec<Comment>>,
    root_properties: Option<DocumentProperties>,
    child_properties: HashMap<NotionId, DocumentProperties>,
    media_references: Vec<TrackedReference>,
    page_references: Vec<TrackedLink>,
    stats: FetchStats,
}

impl FetchSession {
    fn new(root: NotionId, config: &FetcherConfig, capabilities: TrackingCapabilities) -> Self {
        Self {
            root,
            fetch_comments: config.fetch_comments,
            fetch_child_page_properties: config.fetch_child_page_properties,
            capabilities,
            queue: TaskQueue::new(),
            nodes: Vec::new(),
            root_comments: Vec::new(),
            node_comments: HashMap::new(),
            root_properties: None,
            child_properties: HashMap::new(),
            media_references: Vec::new(),
            page_references: Vec::new(),
            stats: FetchStats::default(),
        }
    }

    fn absorb(&mut self, task: &FetchTask, outcome: TaskOutcome) -> Result<(), AppError> {
        match outcome {
            TaskOutcome::Nodes { results, pages } => {
                self.stats.listing_calls += pages;
                for raw in &results {
                    match parse_node(raw, &task.id)? {
                        Some(node) => self.accept_node(node),
                        None => self.stats.nodes_skipped += 1,
                    }
                }
            }
            TaskOutcome::Comments { results, pages } => {
                self.stats.comment_calls += pages;
                let comments = results
                    .iter()
                    .map(|raw| parse_comment(raw, &task.id))
                    .collect::<Result<Vec<_>, _>>()?;
                if task.id == self.root {
                    self.root_comments.extend(comments);
                } else {
                    self.node_comments
                        .entry(task.id.clone())
                        .or_default()
                        .extend(comments);
                }
            }
            TaskOutcome::Properties(raw) => {
                self.stats.property_calls += 1;
                let properties = parse_document_properties(&raw)?;
                self.accept_properties(&task.id, properties);
            }
        }
        Ok(())
    }

    fn accept_node(&mut self, node: Node) {
        self.stats.nodes_fetched += 1;

        if node.has_children {
            self.queue.enqueue(FetchTask::nodes(&node.id));
        }
        if self.fetch_comments {
            self.queue.enqueue(FetchTask::comments(&node.id));
        }
        if node.node_type == "child_page" && self.fetch_child_page_properties {
            self.queue.enqueue(FetchTask::properties(&node.id));
        }

        if self.capabilities.media_enabled && MEDIA_NODE_TYPES.contains(&node.node_type.as_str()) {
            if let Some(source) = file_object_source(&node.payload) {
                self.media_references.push(TrackedReference {
                    origin: ReferenceOrigin::Node {
                        node_id: node.id.clone(),
                    },
                    last_edited: node.last_edited_time,
                    source,
                });
            }
        }

        if self.capabilities.page_ref_enabled {
            let sites = link_sites(&node.node_type, &node.payload);
            // Malformed nodes are kept so resolution reports them.
            if sites.as_ref().map_or(true, |sites| !sites.is_empty()) {
                self.page_references.push(TrackedLink {
                    node_id: node.id.clone(),
                    sites,
                });
            }
        }

        self.nodes.push(node);
    }

    fn accept_properties(&mut self, owner: &NotionId, properties: DocumentProperties) {
        if self.capabilities.media_enabled {
            for (property, value) in &properties.properties {
                let Some(files) = value.get("files").and_then(Value::as_array) else {
                    continue;
                };
                for (index, file) in files.iter().enumerate() {
                    let Some(source) = file_object_source(file) else {
                        continue;
                    };
                    let origin = if owner == &self.root {
                        ReferenceOrigin::DocumentProperty {
                            document_id: owner.clone(),
                            property: property.clone(),
                            index,
                        }
                    } else {
                        ReferenceOrigin::ContainerProperty {
                            container_id: owner.clone(),
                            property: property.clone(),
                            index,
                        }
                    };
                    self.media_references.push(TrackedReference {
                        origin,
                        last_edited: properties.last_edited_time,
                        source,
                    });
                }
            }
        }

        if owner == &self.root {
            self.root_properties = Some(properties);
        } else {
            self.child_properties.insert(owner.clone(), properties);
        }
    }

    fn finish(mut self) -> FetchedDocument {
        let mut graph = NodeGraph::new();
        for mut node in std::mem::take(&mut self.nodes) {
            if let Some(comments) = self.node_comments.remove(&node.id) {
                node.comments = comments;
            }
            node.properties = self.child_properties.remove(&node.id);
            graph.register(node);
        }

        FetchedDocument {
            nodes: graph.assemble(&self.root),
            root_id: self.root,
            root_comments: self.root_comments,
            properties: self.root_properties,
            media_references: self.media_references,
            page_references: self.page_references,
            stats: self.stats,
        }
    }
}
