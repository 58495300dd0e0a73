//! # contract: collaborator interfaces and the data they exchange
//!
//! The pipeline talks to three external services and never to their
//! transports:
//! - [`StorageService`]: the remote file store (file metadata, folder listings)
//! - [`ConversionService`]: the document conversion/viewer service
//! - [`SearchIndex`]: the per-user full-text index
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`, so consumers get `MockStorageService`,
//!   `MockConversionService` and `MockSearchIndex` under `cfg(test)` or the
//!   default `test-export-mocks` feature.
//!
//! ## Implementing a collaborator
//! - Report absence as [`ServiceError::NotFound`], everything else as
//!   [`ServiceError::Failed`]. The core attaches the failing operation itself.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::{ServiceResult, SyncError};

/// Bearer credentials of the requesting user for the storage service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_token: String,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token_len", &self.access_token.len())
            .finish()
    }
}

/// A validated, non-empty file or folder identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId(String);

impl FileId {
    /// Rejects identifiers that are empty or contain only whitespace.
    pub fn parse(raw: &str) -> Result<Self, SyncError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SyncError::Validation(
                "id must be a non-empty identifier".to_string(),
            ));
        }
        if trimmed.len() != raw.len() {
            return Err(SyncError::Validation(format!(
                "id {raw:?} must not carry surrounding whitespace"
            )));
        }
        Ok(FileId(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of a stored file, fetched fresh for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub name: String,
    pub modified_at: DateTime<FixedOffset>,
    /// User that created (owns) the file.
    pub owner_id: String,
    pub parent_id: Option<String>,
}

/// A viewer-ready rendition produced by the conversion service.
///
/// `name` carries the source file's id; see [`crate::freshness::represents`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedDocument {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<FixedOffset>,
}

/// One search-index record, scoped to `(file_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub file_id: String,
    pub user_id: String,
    pub owner_id: String,
    pub name: String,
    /// Timestamp as stored by the index; compared after normalisation.
    pub modified_at: String,
    pub text: String,
}

/// Single-use viewing capability. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub viewer_url: String,
}

/// Where the conversion service should pull the file from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLocation(pub String);

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub file_id: String,
    pub name: String,
    pub modified_at: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Folder => "folder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub kind: EntryKind,
    pub id: String,
    pub name: String,
}

impl FolderEntry {
    /// Navigation path for this entry, e.g. `/files/42` or `/folders/7`.
    pub fn href(&self) -> String {
        format!("/{}s/{}", self.kind.as_str(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderListing {
    pub id: String,
    pub name: String,
    pub entries: Vec<FolderEntry>,
}

/// Remote file storage.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Fetch the current metadata of a file.
    async fn fetch_file(&self, credentials: &Credentials, file_id: &str) -> ServiceResult<File>;

    /// List the direct children of a folder. The root folder is `"0"`.
    async fn list_folder(
        &self,
        credentials: &Credentials,
        folder_id: &str,
    ) -> ServiceResult<FolderListing>;
}

/// Document conversion and viewing.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ConversionService: Send + Sync {
    /// Every converted document visible to this process, in service order.
    async fn list_converted_documents(&self) -> ServiceResult<Vec<ConvertedDocument>>;

    /// Obtain the location the conversion service should read the file from.
    async fn acquire_upload_location(
        &self,
        credentials: &Credentials,
        file_id: &str,
    ) -> ServiceResult<UploadLocation>;

    /// Submit the file at `location` for conversion, naming the result after
    /// `file_id`. Returns the new document id.
    async fn upload_and_convert(
        &self,
        location: &UploadLocation,
        file_id: &str,
    ) -> ServiceResult<String>;

    async fn create_view_session(&self, document_id: &str) -> ServiceResult<Session>;

    async fn extract_text(&self, document_id: &str) -> ServiceResult<String>;
}

/// Per-user full-text index.
///
/// `upsert_entry` must replace-or-insert on `(file_id, user_id)` atomically.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn lookup_entries(&self, file_id: &str, user_id: &str)
        -> ServiceResult<Vec<IndexEntry>>;

    async fn upsert_entry(&self, entry: &IndexEntry) -> ServiceResult<()>;

    /// Ranked best first.
    async fn query(&self, user_id: &str, query: &str) -> ServiceResult<Vec<SearchHit>>;
}
