// src/api/pagination.rs
//! Cursor pagination over listing endpoints.

use super::types::{PaginatedResponse, PaginationResult};
use crate::error::AppError;
use std::future::Future;

/// Follows `next_cursor` until the provider reports no more results.
///
/// Every page goes through `fetch_page`, so callers wrap it with the rate
/// limiter once and each page is throttled individually.
pub async fn fetch_all_pages<T, F, Fut>(mut fetch_page: F) -> Result<PaginationResult<T>, AppError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<PaginatedResponse<T>, AppError>>,
{
    let mut items = Vec::new();
    let mut cursor = None;
    let mut pages_fetched = 0u32;

    loop {
        let response = fetch_page(cursor.take()).await?;
        pages_fetched += 1;
        items.extend(response.results);

        match response.next_cursor {
            Some(next) if response.has_more => cursor = Some(next),
            _ => break,
        }
    }

    if pages_fetched > 1 {
        log::debug!("Collected {} items over {} pages", items.len(), pages_fetched);
    }

    Ok(PaginationResult {
        items,
        pages_fetched,
    })
}
