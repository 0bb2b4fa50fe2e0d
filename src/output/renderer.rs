// src/output/renderer.rs
//! JSON rendering of a converted document.

use crate::error::AppError;
use crate::pipeline::{ChainData, Renderer};
use serde_json::json;

/// Renders the fetched tree, its properties and comments as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTreeRenderer {
    pretty: bool,
}

impl JsonTreeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

#[async_trait::async_trait]
impl Renderer for JsonTreeRenderer {
    async fn render(&self, data: &ChainData) -> Result<String, AppError> {
        let document = data.document()?;
        let value = json!({
            "documentId": data.document_id,
            "properties": document.properties,
            "comments": document.root_comments,
            "nodes": document.nodes,
            "metadata": data.metadata,
        });
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(rendered)
    }
}
