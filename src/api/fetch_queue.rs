// src/api/fetch_queue.rs
//! Work items for exploring a Notion content tree iteratively.

use crate::types::NotionId;
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// What a queued task retrieves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// List the children of a document or node.
    FetchNodes,
    /// List discussion comments on a document or node.
    FetchComments,
    /// Retrieve a document's properties.
    FetchPageProperties,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchNodes => write!(f, "fetch-nodes"),
            Self::FetchComments => write!(f, "fetch-comments"),
            Self::FetchPageProperties => write!(f, "fetch-page-properties"),
        }
    }
}

/// A unit of fetch work. Identity is the `(kind, id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTask {
    pub kind: TaskKind,
    pub id: NotionId,
}

impl FetchTask {
    pub fn nodes(id: &NotionId) -> Self {
        Self {
            kind: TaskKind::FetchNodes,
            id: id.clone(),
        }
    }

    pub fn comments(id: &NotionId) -> Self {
        Self {
            kind: TaskKind::FetchComments,
            id: id.clone(),
        }
    }

    pub fn properties(id: &NotionId) -> Self {
        Self {
            kind: TaskKind::FetchPageProperties,
            id: id.clone(),
        }
    }
}

impl fmt::Display for FetchTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// FIFO queue that admits each `(kind, id)` at most once per session.
///
/// A task counts as seen from the moment it is enqueued, so a second
/// request for the same work is dropped even while the first is in flight.
#[derive(Debug, Default)]
pub struct TaskQueue {
    pending: VecDeque<FetchTask>,
    seen: HashSet<FetchTask>,
    processed: HashSet<FetchTask>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task unless an identical one was already admitted.
    /// Returns whether the task was queued.
    pub fn enqueue(&mut self, task: FetchTask) -> bool {
        if !self.seen.insert(task.clone()) {
            log::trace!("Skipping duplicate task {}", task);
            return false;
        }
        self.pending.push_back(task);
        true
    }

    /// Takes up to `size` tasks from the front of the queue.
    pub fn next_batch(&mut self, size: usize) -> Vec<FetchTask> {
        let take = size.max(1).min(self.pending.len());
        self.pending.drain(..take).collect()
    }

    pub fn mark_processed(&mut self, task: FetchTask) {
        self.processed.insert(task);
    }

    pub fn is_processed(&self, task: &FetchTask) -> bool {
        self.processed.contains(task)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }
}
