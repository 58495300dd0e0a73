//! [`SearchIndex`] over an Elasticsearch-compatible REST endpoint.
//!
//! Entries are stored under the document id `{file_id}:{user_id}`, so an
//! upsert is a single `PUT` that replaces or inserts atomically.
//!
//! The index is created on first use with `keyword` mappings for the id
//! fields, so `term` filters match ids such as `user-1` verbatim. A search
//! against an index that does not exist yet yields no hits.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use viewsync_core::contract::{IndexEntry, SearchHit, SearchIndex};
use viewsync_core::error::{ServiceError, ServiceResult};

use crate::http;

#[derive(Debug, Deserialize)]
struct Hit<T> {
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: T,
}

#[derive(Debug, Deserialize)]
struct Hits<T> {
    hits: Vec<Hit<T>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    hits: Hits<T>,
}

/// Subset of a stored entry returned for search hits.
#[derive(Debug, Deserialize)]
struct HitSource {
    file_id: String,
    name: String,
    modified_at: String,
}

pub struct ElasticIndex {
    http: reqwest::Client,
    url: String,
    index: String,
    created: OnceCell<()>,
}

impl ElasticIndex {
    pub fn new(url: impl Into<String>, index: impl Into<String>) -> Result<Self, reqwest::Error> {
        let url = url.into().trim_end_matches('/').to_string();
        let index = index.into();
        tracing::info!(url = %url, index = %index, "Initialised ElasticIndex");
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            url,
            index,
            created: OnceCell::new(),
        })
    }

    /// Document id for the `(file_id, user_id)` key.
    pub fn document_id(file_id: &str, user_id: &str) -> String {
        format!("{file_id}:{user_id}")
    }

    /// Body of the index creation request.
    pub fn mappings() -> Value {
        json!({
            "mappings": {
                "properties": {
                    "file_id": { "type": "keyword" },
                    "user_id": { "type": "keyword" },
                    "owner_id": { "type": "keyword" },
                    "name": { "type": "text" },
                    "modified_at": { "type": "keyword" },
                    "text": { "type": "text" }
                }
            }
        })
    }

    /// Creates the index once per client. An index that already exists is fine.
    async fn ensure_index(&self) -> ServiceResult<()> {
        self.created
            .get_or_try_init(|| self.create_index())
            .await
            .map(|_| ())
    }

    async fn create_index(&self) -> ServiceResult<()> {
        let response = self
            .http
            .put(format!("{}/{}", self.url, self.index))
            .json(&Self::mappings())
            .send()
            .await
            .map_err(http::transport)?;
        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().await.map_err(http::transport)?;
            if body.contains("resource_already_exists_exception") {
                tracing::debug!(index = %self.index, "Index already exists");
                return Ok(());
            }
            return Err(ServiceError::failed(format!(
                "index {}: HTTP 400 Bad Request: {}",
                self.index,
                body.chars().take(200).collect::<String>()
            )));
        }
        http::check(response, &format!("index {}", self.index)).await?;
        tracing::info!(index = %self.index, "Created index with keyword id mappings");
        Ok(())
    }

    /// Runs a `_search`. A missing index answers 404, which means no hits.
    async fn search<T: DeserializeOwned>(
        &self,
        body: &Value,
        what: &str,
    ) -> ServiceResult<Vec<Hit<T>>> {
        let response = self
            .http
            .post(format!("{}/{}/_search", self.url, self.index))
            .json(body)
            .send()
            .await
            .map_err(http::transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(index = %self.index, what, "Index missing, no hits");
            return Ok(Vec::new());
        }
        let found: SearchResponse<T> = http::json(response, what).await?;
        Ok(found.hits.hits)
    }
}

#[async_trait]
impl SearchIndex for ElasticIndex {
    async fn lookup_entries(
        &self,
        file_id: &str,
        user_id: &str,
    ) -> ServiceResult<Vec<IndexEntry>> {
        self.ensure_index().await?;
        let body = json!({
            "query": {
                "bool": {
                    "filter": [
                        { "term": { "file_id": file_id } },
                        { "term": { "user_id": user_id } }
                    ]
                }
            }
        });
        let hits: Vec<Hit<IndexEntry>> = self
            .search(&body, &format!("index entries for file {file_id}"))
            .await?;
        tracing::debug!(file_id, user_id, count = hits.len(), "Looked up index entries");
        Ok(hits.into_iter().map(|h| h.source).collect())
    }

    async fn upsert_entry(&self, entry: &IndexEntry) -> ServiceResult<()> {
        self.ensure_index().await?;
        let id = Self::document_id(&entry.file_id, &entry.user_id);
        let response = self
            .http
            .put(format!("{}/{}/_doc/{}", self.url, self.index, id))
            .query(&[("refresh", "wait_for")])
            .json(entry)
            .send()
            .await
            .map_err(http::transport)?;
        http::check(response, &format!("index entry {id}")).await?;
        tracing::info!(document_id = %id, "Upserted index entry");
        Ok(())
    }

    async fn query(&self, user_id: &str, query: &str) -> ServiceResult<Vec<SearchHit>> {
        let body = json!({
            "query": {
                "bool": {
                    "must": { "multi_match": { "query": query, "fields": ["name", "text"] } },
                    "filter": { "term": { "user_id": user_id } }
                }
            },
            "_source": ["file_id", "name", "modified_at"]
        });
        let hits: Vec<Hit<HitSource>> = self.search(&body, "search results").await?;
        Ok(hits
            .into_iter()
            .map(|h| SearchHit {
                file_id: h.source.file_id,
                name: h.source.name,
                modified_at: h.source.modified_at,
                score: h.score.unwrap_or(0.0),
            })
            .collect())
    }
}
