//! Per-user search over the shared index.

use std::time::Duration;

use tracing::info;

use crate::contract::{SearchHit, SearchIndex};
use crate::error::{Operation, SyncError};
use crate::upstream;

/// A query string that is safe to send to the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    /// Rejects empty and whitespace-only queries.
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        if raw.trim().is_empty() {
            return Err(SyncError::Validation(
                "search query must not be empty".to_string(),
            ));
        }
        Ok(SearchQuery(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub async fn search<I>(
    index: &I,
    user_id: &str,
    query: &SearchQuery,
    limit: Duration,
) -> Result<Vec<SearchHit>, SyncError>
where
    I: SearchIndex + ?Sized,
{
    let hits = upstream::call(
        Operation::QueryIndex,
        limit,
        index.query(user_id, query.as_str()),
    )
    .await?;
    info!(user_id, hits = hits.len(), "[SEARCH] Query complete");
    Ok(hits)
}
