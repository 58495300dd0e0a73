//! [`ConversionService`] over the document viewer API.
//!
//! The upload location is the storage provider's content URL for the file:
//! the content endpoint answers with a redirect, and its `Location` is what
//! the viewer API is asked to pull from. Converted documents are named after
//! the file id so later lookups can find them.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::header::LOCATION;
use serde::Deserialize;
use serde_json::json;
use viewsync_core::contract::{
    ConversionService, ConvertedDocument, Credentials, Session, UploadLocation,
};
use viewsync_core::error::{ServiceError, ServiceResult};

use crate::http;

#[derive(Debug, Deserialize)]
struct ApiDocument {
    id: String,
    name: String,
    created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Deserialize)]
struct DocumentCollection {
    entries: Vec<ApiDocument>,
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    document_collection: DocumentCollection,
}

#[derive(Debug, Deserialize)]
struct CreatedDocument {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SessionUrls {
    view: String,
}

#[derive(Debug, Deserialize)]
struct ApiSession {
    urls: SessionUrls,
}

pub struct ConversionClient {
    http: reqwest::Client,
    api_base: String,
    content_api_base: String,
    api_key: String,
}

impl ConversionClient {
    pub fn new(
        api_base: impl Into<String>,
        content_api_base: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        let content_api_base = content_api_base.into().trim_end_matches('/').to_string();
        let api_key = api_key.into();
        tracing::info!(
            api_base = %api_base,
            content_api_base = %content_api_base,
            api_key_set = !api_key.is_empty(),
            "Initialised ConversionClient"
        );
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            http,
            api_base,
            content_api_base,
            api_key,
        })
    }

    fn token(&self) -> String {
        format!("Token {}", self.api_key)
    }
}

#[async_trait]
impl ConversionService for ConversionClient {
    async fn list_converted_documents(&self) -> ServiceResult<Vec<ConvertedDocument>> {
        let response = self
            .http
            .get(format!("{}/documents", self.api_base))
            .header(reqwest::header::AUTHORIZATION, self.token())
            .send()
            .await
            .map_err(http::transport)?;
        let list: DocumentList = http::json(response, "documents").await?;
        tracing::debug!(
            count = list.document_collection.entries.len(),
            "Listed converted documents"
        );
        Ok(list
            .document_collection
            .entries
            .into_iter()
            .map(|d| ConvertedDocument {
                id: d.id,
                name: d.name,
                created_at: d.created_at,
            })
            .collect())
    }

    async fn acquire_upload_location(
        &self,
        credentials: &Credentials,
        file_id: &str,
    ) -> ServiceResult<UploadLocation> {
        let response = self
            .http
            .get(format!("{}/files/{}/content", self.content_api_base, file_id))
            .bearer_auth(credentials.access_token())
            .send()
            .await
            .map_err(http::transport)?;
        let response = http::check(response, &format!("content of file {file_id}")).await?;
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                ServiceError::failed(format!(
                    "content of file {file_id}: HTTP {} without Location header",
                    response.status()
                ))
            })?;
        tracing::debug!(file_id, "Acquired upload location");
        Ok(UploadLocation(location.to_string()))
    }

    async fn upload_and_convert(
        &self,
        location: &UploadLocation,
        file_id: &str,
    ) -> ServiceResult<String> {
        let response = self
            .http
            .post(format!("{}/documents", self.api_base))
            .header(reqwest::header::AUTHORIZATION, self.token())
            .json(&json!({ "url": location.0, "name": file_id }))
            .send()
            .await
            .map_err(http::transport)?;
        let created: CreatedDocument =
            http::json(response, &format!("conversion of file {file_id}")).await?;
        tracing::info!(file_id, document_id = %created.id, "Submitted document for conversion");
        Ok(created.id)
    }

    async fn create_view_session(&self, document_id: &str) -> ServiceResult<Session> {
        let response = self
            .http
            .post(format!("{}/sessions", self.api_base))
            .header(reqwest::header::AUTHORIZATION, self.token())
            .json(&json!({ "document_id": document_id }))
            .send()
            .await
            .map_err(http::transport)?;
        let session: ApiSession =
            http::json(response, &format!("session for document {document_id}")).await?;
        Ok(Session {
            viewer_url: session.urls.view,
        })
    }

    async fn extract_text(&self, document_id: &str) -> ServiceResult<String> {
        let response = self
            .http
            .get(format!("{}/documents/{}/content.txt", self.api_base, document_id))
            .header(reqwest::header::AUTHORIZATION, self.token())
            .send()
            .await
            .map_err(http::transport)?;
        let response = http::check(response, &format!("text of document {document_id}")).await?;
        response.text().await.map_err(http::transport)
    }
}
