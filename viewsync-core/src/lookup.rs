//! Document lookup: fetch the file snapshot and the converted documents side by side.

use std::time::Duration;

use futures::future::try_join;
use tracing::{debug, info};

use crate::contract::{ConversionService, ConvertedDocument, Credentials, File, StorageService};
use crate::error::{Operation, SyncError};
use crate::freshness;
use crate::upstream;

/// Joined result of the two lookups.
#[derive(Debug, Clone)]
pub struct Lookup {
    pub file: File,
    pub documents: Vec<ConvertedDocument>,
}

impl Lookup {
    /// The first fresh rendition of `file`, in service response order.
    pub fn fresh_document(&self) -> Option<&ConvertedDocument> {
        freshness::select_fresh_document(&self.file, &self.documents)
    }
}

/// Fetches the file and the full document collection concurrently. The first
/// failure aborts the lookup and drops the other call.
pub async fn lookup<S, C>(
    storage: &S,
    conversion: &C,
    credentials: &Credentials,
    file_id: &str,
    limit: Duration,
) -> Result<Lookup, SyncError>
where
    S: StorageService + ?Sized,
    C: ConversionService + ?Sized,
{
    info!(file_id, "[LOOKUP] Fetching file and converted documents");
    let (file, documents) = try_join(
        upstream::call(
            Operation::FetchFile,
            limit,
            storage.fetch_file(credentials, file_id),
        ),
        upstream::call(
            Operation::ListConvertedDocuments,
            limit,
            conversion.list_converted_documents(),
        ),
    )
    .await?;

    debug!(
        file_id = %file.id,
        modified_at = %file.modified_at,
        documents = documents.len(),
        "[LOOKUP] Lookup complete"
    );
    Ok(Lookup { file, documents })
}
