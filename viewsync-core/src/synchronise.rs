//! High-level pipeline: decides, per file, whether to convert and whether to reindex.
//!
//! This module provides the two entry points callers use:
//!   - [`Synchroniser::synchronise_for_viewing`]: make sure a fresh converted
//!     document exists and hand back a viewer URL
//!   - [`Synchroniser::synchronise_for_indexing`]: make sure a fresh converted
//!     document exists and that the requesting user's index entry matches the file
//!
//! Both follow the same path:
//!   1. Validate the file id (nothing is called for a malformed id)
//!   2. Look up the file snapshot and the converted documents concurrently
//!   3. Reuse the first fresh document, or run the conversion orchestrator
//!   4. Viewing: open a session. Indexing: run the index sync manager
//!
//! # Responsibilities
//! - Fail fast: the first collaborator error ends the request and is returned
//!   unchanged apart from the operation tag
//! - At most one conversion per request; retries belong to the caller
//! - Every collaborator call is bounded by [`SyncConfig::call_timeout`]
//! - No state is kept between requests: the file is fetched fresh every time
//!
//! # Also here
//! Thin read-only operations used by the CLI: [`Synchroniser::browse`],
//! [`Synchroniser::file`], [`Synchroniser::converted_documents`] and
//! [`Synchroniser::search`].

use serde::Serialize;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::contract::{
    ConversionService, ConvertedDocument, Credentials, File, FileId, FolderListing, SearchHit,
    SearchIndex, StorageService,
};
use crate::convert::ConversionOrchestrator;
use crate::error::{Operation, SyncError};
use crate::index_sync::{IndexOutcome, IndexSyncManager};
use crate::lookup::{lookup, Lookup};
use crate::search::{search, SearchQuery};
use crate::upstream;

/// Acknowledgement of a successful indexing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub file_id: String,
    pub document_id: String,
    /// Whether a new converted document had to be produced.
    pub converted: bool,
    pub outcome: IndexOutcome,
}

/// Which converted document a request ended up using.
#[derive(Debug)]
enum Rendition {
    Existing(String),
    Converted(String),
}

impl Rendition {
    fn document_id(&self) -> &str {
        match self {
            Rendition::Existing(id) | Rendition::Converted(id) => id,
        }
    }
}

pub struct Synchroniser<'a, S: ?Sized, C: ?Sized, I: ?Sized> {
    storage: &'a S,
    conversion: &'a C,
    index: &'a I,
    config: &'a SyncConfig,
}

impl<'a, S, C, I> Synchroniser<'a, S, C, I>
where
    S: StorageService + ?Sized,
    C: ConversionService + ?Sized,
    I: SearchIndex + ?Sized,
{
    pub fn new(storage: &'a S, conversion: &'a C, index: &'a I, config: &'a SyncConfig) -> Self {
        Self {
            storage,
            conversion,
            index,
            config,
        }
    }

    fn orchestrator(&self) -> ConversionOrchestrator<'a, C> {
        ConversionOrchestrator::new(self.conversion, self.config.call_timeout())
    }

    async fn lookup(&self, credentials: &Credentials, file_id: &FileId) -> Result<Lookup, SyncError> {
        lookup(
            self.storage,
            self.conversion,
            credentials,
            file_id.as_str(),
            self.config.call_timeout(),
        )
        .await
    }

    /// Returns a viewer URL for the file, converting it first if no converted
    /// document postdates its last modification.
    pub async fn synchronise_for_viewing(
        &self,
        user_id: &str,
        credentials: &Credentials,
        file_id: &str,
    ) -> Result<String, SyncError> {
        let file_id = FileId::parse(file_id)?;
        let span = info_span!("synchronise_for_viewing", request_id = %Uuid::new_v4(), user_id, file_id = %file_id);
        async {
            let found = self.lookup(credentials, &file_id).await?;
            let orchestrator = self.orchestrator();
            let session = match found.fresh_document() {
                Some(document) => {
                    info!(document_id = %document.id, "[SYNC] Reusing fresh converted document");
                    orchestrator.open_session(&document.id).await?
                }
                None => {
                    info!("[SYNC] No fresh converted document, converting");
                    orchestrator.view(credentials, file_id.as_str()).await?
                }
            };
            info!(viewer_url = %session.viewer_url, "[SYNC] Viewing session ready");
            Ok::<_, SyncError>(session.viewer_url)
        }
        .instrument(span)
        .await
        .inspect_err(|e| error!(error = %e, "[SYNC][ERROR] Synchronise for viewing failed"))
    }

    /// Ensures a fresh converted document exists and that the user's index
    /// entry for the file matches its current modification time.
    pub async fn synchronise_for_indexing(
        &self,
        user_id: &str,
        credentials: &Credentials,
        file_id: &str,
    ) -> Result<IndexReport, SyncError> {
        let file_id = FileId::parse(file_id)?;
        let span = info_span!("synchronise_for_indexing", request_id = %Uuid::new_v4(), user_id, file_id = %file_id);
        async {
            let found = self.lookup(credentials, &file_id).await?;
            let rendition = match found.fresh_document() {
                Some(document) => {
                    info!(document_id = %document.id, "[SYNC] Reusing fresh converted document");
                    Rendition::Existing(document.id.clone())
                }
                None => {
                    info!("[SYNC] No fresh converted document, converting");
                    let document_id = self
                        .orchestrator()
                        .convert(credentials, file_id.as_str())
                        .await?;
                    Rendition::Converted(document_id)
                }
            };

            let outcome = IndexSyncManager::new(self.index, self.conversion, self.config.call_timeout())
                .sync(user_id, &found.file, rendition.document_id())
                .await?;

            let report = IndexReport {
                file_id: found.file.id.clone(),
                document_id: rendition.document_id().to_string(),
                converted: matches!(rendition, Rendition::Converted(_)),
                outcome,
            };
            match serde_json::to_string(&report) {
                Ok(json) => debug!(report = %json, "[SYNC] Index report"),
                Err(e) => debug!(error = ?e, "[SYNC] Failed to serialise index report"),
            }
            info!(outcome = ?report.outcome, converted = report.converted, "[SYNC] Synchronise for indexing complete");
            Ok::<_, SyncError>(report)
        }
        .instrument(span)
        .await
        .inspect_err(|e| error!(error = %e, "[SYNC][ERROR] Synchronise for indexing failed"))
    }

    /// Ranked hits from the user's own indexed content.
    pub async fn search(&self, user_id: &str, query: &str) -> Result<Vec<SearchHit>, SyncError> {
        let query = SearchQuery::parse(query)?;
        search(self.index, user_id, &query, self.config.call_timeout())
            .instrument(info_span!("search", request_id = %Uuid::new_v4(), user_id))
            .await
    }

    pub async fn browse(
        &self,
        credentials: &Credentials,
        folder_id: &str,
    ) -> Result<FolderListing, SyncError> {
        let folder_id = FileId::parse(folder_id)?;
        let listing = upstream::call(
            Operation::ListFolder,
            self.config.call_timeout(),
            self.storage.list_folder(credentials, folder_id.as_str()),
        )
        .await?;
        info!(folder_id = %folder_id, entries = listing.entries.len(), "[BROWSE] Folder listed");
        Ok(listing)
    }

    pub async fn file(&self, credentials: &Credentials, file_id: &str) -> Result<File, SyncError> {
        let file_id = FileId::parse(file_id)?;
        upstream::call(
            Operation::FetchFile,
            self.config.call_timeout(),
            self.storage.fetch_file(credentials, file_id.as_str()),
        )
        .await
    }

    pub async fn converted_documents(&self) -> Result<Vec<ConvertedDocument>, SyncError> {
        upstream::call(
            Operation::ListConvertedDocuments,
            self.config.call_timeout(),
            self.conversion.list_converted_documents(),
        )
        .await
    }
}
