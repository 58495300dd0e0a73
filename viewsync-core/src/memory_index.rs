//! In-process [`SearchIndex`] keyed by `(file_id, user_id)`.
//!
//! Upserts replace the whole entry under one lock, so concurrent writers for
//! the same key never produce duplicates. Ranking is a plain term-frequency
//! count over the entry name and text.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::contract::{IndexEntry, SearchHit, SearchIndex};
use crate::error::{ServiceError, ServiceResult};

type Key = (String, String);

#[derive(Debug, Default)]
pub struct InMemoryIndex {
    entries: Mutex<HashMap<Key, IndexEntry>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries across all users.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> ServiceError {
        ServiceError::failed("in-memory index lock poisoned")
    }
}

fn score(entry: &IndexEntry, terms: &[String]) -> f64 {
    let haystack = format!("{} {}", entry.name, entry.text).to_lowercase();
    terms
        .iter()
        .map(|term| haystack.matches(term.as_str()).count() as f64)
        .sum()
}

#[async_trait]
impl SearchIndex for InMemoryIndex {
    async fn lookup_entries(
        &self,
        file_id: &str,
        user_id: &str,
    ) -> ServiceResult<Vec<IndexEntry>> {
        let entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        Ok(entries
            .get(&(file_id.to_string(), user_id.to_string()))
            .cloned()
            .into_iter()
            .collect())
    }

    async fn upsert_entry(&self, entry: &IndexEntry) -> ServiceResult<()> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        entries.insert(
            (entry.file_id.clone(), entry.user_id.clone()),
            entry.clone(),
        );
        Ok(())
    }

    async fn query(&self, user_id: &str, query: &str) -> ServiceResult<Vec<SearchHit>> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        let entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        let mut hits: Vec<SearchHit> = entries
            .values()
            .filter(|e| e.user_id == user_id)
            .filter_map(|e| {
                let score = score(e, &terms);
                (score > 0.0).then(|| SearchHit {
                    file_id: e.file_id.clone(),
                    name: e.name.clone(),
                    modified_at: e.modified_at.clone(),
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.file_id.cmp(&b.file_id))
        });
        Ok(hits)
    }
}
