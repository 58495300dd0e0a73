//! Freshness predicates.
//!
//! Two different questions are asked of a file, and they are kept apart:
//! - is a converted document *newer* than the file's last edit ([`postdates`])
//! - does an index entry record *exactly* the file's last edit ([`records_same_instant`])

use chrono::{DateTime, FixedOffset};

use crate::contract::{ConvertedDocument, File, IndexEntry};

/// True iff `candidate` strictly postdates `reference`.
pub fn postdates(reference: &DateTime<FixedOffset>, candidate: &DateTime<FixedOffset>) -> bool {
    candidate > reference
}

/// True iff `stored` parses as an RFC 3339 timestamp denoting the same instant
/// as `reference`. Offsets are normalised; unparseable values never match.
pub fn records_same_instant(reference: &DateTime<FixedOffset>, stored: &str) -> bool {
    match DateTime::parse_from_rfc3339(stored) {
        Ok(stored) => stored == *reference,
        Err(_) => false,
    }
}

/// Join key between the storage and conversion services: documents are
/// named after the id of the file they were converted from.
pub fn represents(document: &ConvertedDocument, file: &File) -> bool {
    document.name == file.id
}

/// A document is a valid rendition of `file` if it represents it and was
/// created after the file's last modification.
pub fn is_document_fresh(file: &File, document: &ConvertedDocument) -> bool {
    represents(document, file) && postdates(&file.modified_at, &document.created_at)
}

/// Selects the first fresh document in service response order.
pub fn select_fresh_document<'a>(
    file: &File,
    documents: &'a [ConvertedDocument],
) -> Option<&'a ConvertedDocument> {
    documents.iter().find(|doc| is_document_fresh(file, doc))
}

/// The index is current for `file` iff at least one entry exists for it and
/// every such entry records the file's current modification instant.
pub fn is_index_current(file: &File, entries: &[IndexEntry]) -> bool {
    let mut matching = entries.iter().filter(|e| e.file_id == file.id).peekable();
    if matching.peek().is_none() {
        return false;
    }
    matching.all(|e| records_same_instant(&file.modified_at, &e.modified_at))
}
