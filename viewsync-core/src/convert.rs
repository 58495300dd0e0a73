//! Conversion orchestrator.
//!
//! A conversion runs through the stages
//! `AcquiringLocation -> Uploading -> SessionReady`, each one gated on the
//! previous call succeeding. [`ConversionOrchestrator::view`] runs all three;
//! [`ConversionOrchestrator::convert`] stops after the upload, which is all
//! indexing needs. Nothing is retried here: the first failing stage ends the run.

use std::fmt;
use std::time::Duration;

use tracing::info;

use crate::contract::{ConversionService, Credentials, Session};
use crate::error::{Operation, SyncError};
use crate::upstream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStage {
    AcquiringLocation,
    Uploading,
    SessionReady,
}

impl ConversionStage {
    pub fn operation(self) -> Operation {
        match self {
            ConversionStage::AcquiringLocation => Operation::AcquireUploadLocation,
            ConversionStage::Uploading => Operation::UploadAndConvert,
            ConversionStage::SessionReady => Operation::CreateViewSession,
        }
    }
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConversionStage::AcquiringLocation => "acquiring_location",
            ConversionStage::Uploading => "uploading",
            ConversionStage::SessionReady => "session_ready",
        })
    }
}

pub struct ConversionOrchestrator<'a, C: ?Sized> {
    conversion: &'a C,
    limit: Duration,
}

impl<'a, C> ConversionOrchestrator<'a, C>
where
    C: ConversionService + ?Sized,
{
    pub fn new(conversion: &'a C, limit: Duration) -> Self {
        Self { conversion, limit }
    }

    /// Runs the first two stages and returns the new document id. Used when
    /// the document only has to exist, e.g. before indexing.
    pub async fn convert(
        &self,
        credentials: &Credentials,
        file_id: &str,
    ) -> Result<String, SyncError> {
        let stage = ConversionStage::AcquiringLocation;
        info!(file_id, %stage, "[CONVERT] Requesting upload location");
        let location = upstream::call(
            stage.operation(),
            self.limit,
            self.conversion.acquire_upload_location(credentials, file_id),
        )
        .await?;

        let stage = ConversionStage::Uploading;
        info!(file_id, %stage, "[CONVERT] Submitting file for conversion");
        let document_id = upstream::call(
            stage.operation(),
            self.limit,
            self.conversion.upload_and_convert(&location, file_id),
        )
        .await?;
        info!(file_id, document_id = %document_id, "[CONVERT] Converted document created");
        Ok(document_id)
    }

    /// Runs all three stages and returns the viewing session.
    pub async fn view(
        &self,
        credentials: &Credentials,
        file_id: &str,
    ) -> Result<Session, SyncError> {
        let document_id = self.convert(credentials, file_id).await?;
        self.open_session(&document_id).await
    }

    /// Exchanges a converted document id for a viewing session.
    pub async fn open_session(&self, document_id: &str) -> Result<Session, SyncError> {
        let stage = ConversionStage::SessionReady;
        info!(document_id, %stage, "[CONVERT] Opening viewing session");
        upstream::call(
            stage.operation(),
            self.limit,
            self.conversion.create_view_session(document_id),
        )
        .await
    }
}
