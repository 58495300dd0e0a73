//! [`StorageService`] over the storage provider's REST API.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use viewsync_core::contract::{
    Credentials, EntryKind, File, FolderEntry, FolderListing, StorageService,
};
use viewsync_core::error::ServiceResult;

use crate::http;

#[derive(Debug, Deserialize)]
struct UserRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FolderRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiFile {
    id: String,
    name: String,
    modified_at: DateTime<FixedOffset>,
    created_by: UserRef,
    #[serde(default)]
    parent: Option<FolderRef>,
}

impl From<ApiFile> for File {
    fn from(api: ApiFile) -> Self {
        File {
            id: api.id,
            name: api.name,
            modified_at: api.modified_at,
            owner_id: api.created_by.id,
            parent_id: api.parent.map(|p| p.id),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiEntry {
    #[serde(rename = "type")]
    kind: String,
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ItemCollection {
    entries: Vec<ApiEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiFolder {
    id: String,
    name: String,
    item_collection: ItemCollection,
}

pub struct StorageClient {
    http: reqwest::Client,
    api_base: String,
}

impl StorageClient {
    pub fn new(api_base: impl Into<String>) -> Result<Self, reqwest::Error> {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        tracing::info!(api_base = %api_base, "Initialised StorageClient");
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            api_base,
        })
    }
}

#[async_trait]
impl StorageService for StorageClient {
    async fn fetch_file(&self, credentials: &Credentials, file_id: &str) -> ServiceResult<File> {
        tracing::debug!(file_id, "Fetching file metadata");
        let response = self
            .http
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(credentials.access_token())
            .send()
            .await
            .map_err(http::transport)?;
        let api: ApiFile = http::json(response, &format!("file {file_id}")).await?;
        Ok(api.into())
    }

    async fn list_folder(
        &self,
        credentials: &Credentials,
        folder_id: &str,
    ) -> ServiceResult<FolderListing> {
        tracing::debug!(folder_id, "Listing folder");
        let response = self
            .http
            .get(format!("{}/folders/{}", self.api_base, folder_id))
            .bearer_auth(credentials.access_token())
            .send()
            .await
            .map_err(http::transport)?;
        let api: ApiFolder = http::json(response, &format!("folder {folder_id}")).await?;

        let entries = api
            .item_collection
            .entries
            .into_iter()
            .filter_map(|entry| {
                let kind = match entry.kind.as_str() {
                    "file" => EntryKind::File,
                    "folder" => EntryKind::Folder,
                    other => {
                        tracing::debug!(kind = other, id = %entry.id, "Skipping unsupported folder entry");
                        return None;
                    }
                };
                Some(FolderEntry {
                    kind,
                    id: entry.id,
                    name: entry.name,
                })
            })
            .collect();
        Ok(FolderListing {
            id: api.id,
            name: api.name,
            entries,
        })
    }
}
