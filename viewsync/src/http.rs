//! Shared response handling for the HTTP collaborators.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use viewsync_core::error::{ServiceError, ServiceResult};

/// Maps a non-success status to a [`ServiceError`]; 404 becomes `NotFound`
/// naming `what`.
pub async fn check(response: Response, what: &str) -> ServiceResult<Response> {
    let status = response.status();
    if status.is_success() || status.is_redirection() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ServiceError::NotFound(what.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::failed(format!(
        "{what}: HTTP {status}: {}",
        body.chars().take(200).collect::<String>()
    )))
}

pub async fn json<T: DeserializeOwned>(response: Response, what: &str) -> ServiceResult<T> {
    let response = check(response, what).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ServiceError::Failed(Box::new(e)))
}

pub fn transport(e: reqwest::Error) -> ServiceError {
    ServiceError::Failed(Box::new(e))
}
