//! Helpers shared by the persona and portlayer HTTP clients.

use std::time::Duration;

use reqwest::{Client, Response};
use vicklet_shared::errors::{VickletError, VickletResult};

/// Build a client with a per-request timeout.
pub(crate) fn client_with_timeout(timeout: Duration) -> VickletResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| VickletError::Internal(format!("failed to build http client: {}", e)))
}

/// Fold a reqwest failure into the error taxonomy.
///
/// Timeouts and connection failures are transport errors; anything else
/// (body decode, redirect loops) is internal.
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> VickletError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        VickletError::Transport(err.to_string())
    } else {
        VickletError::Internal(err.to_string())
    }
}

/// Read the error message out of a failed response body.
///
/// Both services answer with `{"message": "..."}`; fall back to the raw text.
pub(crate) async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        })
}
