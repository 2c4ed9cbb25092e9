//! Startup gate: wait for a backend server to answer its ping.

use std::future::Future;

use vicklet_shared::errors::{VickletError, VickletResult};

use crate::retry::{RetryConfig, retry_with_backoff};

/// Poll `ping` until it succeeds or the retry budget runs out.
///
/// Every ping failure counts as "not ready yet". Exhausting the budget
/// yields `ServerNotReady` naming `server`.
pub async fn wait_for_server<F, Fut>(
    config: &RetryConfig,
    server: &str,
    mut ping: F,
) -> VickletResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = VickletResult<()>>,
{
    retry_with_backoff(
        config,
        server,
        || {
            tracing::info!(server, "Checking server is running");
            let attempt = ping();
            async move {
                attempt.await.map_err(|e| {
                    tracing::debug!(server, error = %e, "Server not ready");
                    VickletError::ServerNotReady(server.to_string())
                })
            }
        },
        VickletError::is_server_not_ready,
    )
    .await
    .inspect_err(|_| tracing::error!(server, "Timed out waiting for server"))
}
