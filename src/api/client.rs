// src/api/client.rs
//! Pure HTTP client wrapper for Notion API.
//!
//! This module provides a thin wrapper around reqwest for making
//! HTTP requests to the Notion API. It handles authentication and
//! basic request/response operations; parsing lives in `parser`.

use super::parser::parse_api_response;
use super::types::PaginatedResponse;
use crate::constants::NOTION_API_PAGE_SIZE;
use crate::error::AppError;
use crate::types::{ApiKey, NotionId};
use reqwest::{header, Client, Response};
use serde_json::Value;

const NOTION_VERSION: &str = "2022-06-28";
const API_BASE_URL: &str = "https://api.notion.com/v1";

/// A thin wrapper around reqwest Client for Notion API requests.
#[derive(Clone)]
pub struct NotionHttpClient {
    client: Client,
    base_url: String,
}

impl NotionHttpClient {
    /// Creates a new HTTP client with Notion API authentication.
    pub fn new(api_key: &ApiKey) -> Result<Self, AppError> {
        Self::with_base_url(api_key, API_BASE_URL)
    }

    /// Creates a client against a different API root, e.g. a local mock.
    pub fn with_base_url(api_key: &ApiKey, base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers(api_key)?)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Creates the default headers for Notion API requests.
    fn create_headers(api_key: &ApiKey) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();

        let auth_header = format!("Bearer {}", api_key.as_str());
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&auth_header).map_err(|e| {
                AppError::MissingConfiguration(format!("Invalid API token format: {}", e))
            })?,
        );

        headers.insert(
            "Notion-Version",
            header::HeaderValue::from_static(NOTION_VERSION),
        );

        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    /// GET `endpoint` (relative to the base URL) with query pairs.
    pub async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Response, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("GET {}", url);
        let response = self.client.get(url).query(query).send().await?;
        Ok(response)
    }

    async fn get_json<T>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T, AppError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self.get(endpoint, query).await?;
        let result = extract_response_text(response).await?;
        parse_api_response(result)
    }
}

fn page_query(cursor: Option<String>) -> Vec<(&'static str, String)> {
    let mut query = vec![("page_size", NOTION_API_PAGE_SIZE.to_string())];
    if let Some(cursor) = cursor {
        query.push(("start_cursor", cursor));
    }
    query
}

#[async_trait::async_trait]
impl super::NotionRepository for NotionHttpClient {
    async fn list_children(
        &self,
        parent: &NotionId,
        cursor: Option<String>,
    ) -> Result<PaginatedResponse<Value>, AppError> {
        let endpoint = format!("blocks/{}/children", parent.to_hyphenated());
        self.get_json(&endpoint, &page_query(cursor)).await
    }

    async fn retrieve_page(&self, id: &NotionId) -> Result<Value, AppError> {
        let endpoint = format!("pages/{}", id.to_hyphenated());
        self.get_json(&endpoint, &[]).await
    }

    async fn list_comments(
        &self,
        target: &NotionId,
        cursor: Option<String>,
    ) -> Result<PaginatedResponse<Value>, AppError> {
        let mut query = page_query(cursor);
        query.push(("block_id", target.to_hyphenated()));
        self.get_json("comments", &query).await
    }
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: reqwest::StatusCode,
    pub url: String,
}

/// Reads the body as text, keeping status and URL for error reports.
pub async fn extract_response_text(response: Response) -> Result<ApiResponse<String>, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
    })
}
