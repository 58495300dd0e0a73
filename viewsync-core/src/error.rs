//! Error taxonomy for the synchronisation pipeline.
//!
//! Collaborators report [`ServiceError`]; the core turns each failure into a
//! [`SyncError`] tagged with the [`Operation`] that produced it, keeping the
//! collaborator's own error as the `source`.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Boxed error type returned by collaborator implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for collaborator calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure reported by a storage, conversion or index collaborator.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The requested file, folder or document does not exist upstream.
    #[error("not found: {0}")]
    NotFound(String),
    /// Any other failure: transport, non-success status, malformed payload.
    #[error("{0}")]
    Failed(#[from] BoxError),
}

impl ServiceError {
    pub fn failed(message: impl Into<String>) -> Self {
        ServiceError::Failed(message.into().into())
    }
}

/// The collaborator that owns an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Storage,
    Conversion,
    Index,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Service::Storage => "storage",
            Service::Conversion => "conversion",
            Service::Index => "index",
        })
    }
}

/// Every logical collaborator call the pipeline makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FetchFile,
    ListFolder,
    ListConvertedDocuments,
    AcquireUploadLocation,
    UploadAndConvert,
    CreateViewSession,
    ExtractText,
    LookupIndexEntries,
    UpsertIndexEntry,
    QueryIndex,
}

impl Operation {
    pub fn service(self) -> Service {
        match self {
            Operation::FetchFile | Operation::ListFolder => Service::Storage,
            Operation::ListConvertedDocuments
            | Operation::AcquireUploadLocation
            | Operation::UploadAndConvert
            | Operation::CreateViewSession
            | Operation::ExtractText => Service::Conversion,
            Operation::LookupIndexEntries | Operation::UpsertIndexEntry | Operation::QueryIndex => {
                Service::Index
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::FetchFile => "fetch_file",
            Operation::ListFolder => "list_folder",
            Operation::ListConvertedDocuments => "list_converted_documents",
            Operation::AcquireUploadLocation => "acquire_upload_location",
            Operation::UploadAndConvert => "upload_and_convert",
            Operation::CreateViewSession => "create_view_session",
            Operation::ExtractText => "extract_text",
            Operation::LookupIndexEntries => "lookup_index_entries",
            Operation::UpsertIndexEntry => "upsert_index_entry",
            Operation::QueryIndex => "query_index",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service(), self.as_str())
    }
}

/// Terminal error of one synchronisation request.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Input rejected before any collaborator was called.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{operation} failed: {source}")]
    Upstream {
        operation: Operation,
        #[source]
        source: BoxError,
    },

    #[error("{operation} timed out after {}ms", .timeout.as_millis())]
    UpstreamTimeout {
        operation: Operation,
        timeout: Duration,
    },

    #[error("{operation}: {what} not found")]
    NotFound { operation: Operation, what: String },
}

impl SyncError {
    /// The collaborator call that failed, if any.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            SyncError::Validation(_) => None,
            SyncError::Upstream { operation, .. }
            | SyncError::UpstreamTimeout { operation, .. }
            | SyncError::NotFound { operation, .. } => Some(*operation),
        }
    }

    /// Timeouts are reported the same way as any other upstream failure.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            SyncError::Upstream { .. } | SyncError::UpstreamTimeout { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Validation(_))
    }
}
