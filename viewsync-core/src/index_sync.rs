//! Index sync manager: brings one user's index entry for a file up to date.
//!
//! The index is checked first. Only when no entry exists, or some entry
//! records a different modification instant than the file, is text extracted
//! from the converted document and the entry upserted. At most one extraction
//! and one upsert happen per call.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::contract::{ConversionService, File, IndexEntry, SearchIndex};
use crate::error::{Operation, SyncError};
use crate::freshness;
use crate::upstream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    /// Every existing entry already matched the file; nothing was written.
    AlreadySynchronised,
    /// Text was extracted and the entry upserted.
    Reindexed,
}

pub struct IndexSyncManager<'a, I: ?Sized, C: ?Sized> {
    index: &'a I,
    conversion: &'a C,
    limit: Duration,
}

impl<'a, I, C> IndexSyncManager<'a, I, C>
where
    I: SearchIndex + ?Sized,
    C: ConversionService + ?Sized,
{
    pub fn new(index: &'a I, conversion: &'a C, limit: Duration) -> Self {
        Self {
            index,
            conversion,
            limit,
        }
    }

    pub async fn sync(
        &self,
        user_id: &str,
        file: &File,
        document_id: &str,
    ) -> Result<IndexOutcome, SyncError> {
        let entries = upstream::call(
            Operation::LookupIndexEntries,
            self.limit,
            self.index.lookup_entries(&file.id, user_id),
        )
        .await?;

        if freshness::is_index_current(file, &entries) {
            info!(
                file_id = %file.id,
                user_id,
                entries = entries.len(),
                "[INDEX] Index already current, skipping"
            );
            return Ok(IndexOutcome::AlreadySynchronised);
        }
        info!(
            file_id = %file.id,
            user_id,
            entries = entries.len(),
            "[INDEX] Index stale or missing, reindexing"
        );

        let text = upstream::call(
            Operation::ExtractText,
            self.limit,
            self.conversion.extract_text(document_id),
        )
        .await?;
        debug!(file_id = %file.id, document_id, chars = text.len(), "[INDEX] Extracted text");

        let entry = IndexEntry {
            file_id: file.id.clone(),
            user_id: user_id.to_string(),
            owner_id: file.owner_id.clone(),
            name: file.name.clone(),
            modified_at: file.modified_at.to_rfc3339(),
            text,
        };
        upstream::call(
            Operation::UpsertIndexEntry,
            self.limit,
            self.index.upsert_entry(&entry),
        )
        .await?;

        info!(file_id = %file.id, user_id, "[INDEX] Index entry upserted");
        Ok(IndexOutcome::Reindexed)
    }
}
