//! Pod stop: unbind network, request STOPPED, commit. Retried on conflict.

use std::sync::Arc;

use vicklet_shared::errors::{VickletError, VickletResult};

use super::chain::HandleChain;
use crate::proxy::IsolationProxy;
use crate::retry::{RetryConfig, retry_with_backoff};
use crate::runtime::constants::states;

#[derive(Clone)]
pub struct PodStopper {
    proxy: Arc<dyn IsolationProxy>,
    retry: RetryConfig,
}

impl PodStopper {
    pub fn new(proxy: Arc<dyn IsolationProxy>) -> Self {
        Self::with_retry(proxy, RetryConfig::for_conflict())
    }

    pub fn with_retry(proxy: Arc<dyn IsolationProxy>, retry: RetryConfig) -> Self {
        Self { proxy, retry }
    }

    /// Stop pod `id`. A conflicting concurrent change restarts the whole
    /// sequence from a fresh handle.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self, id: &str, name: &str) -> VickletResult<()> {
        retry_with_backoff(
            &self.retry,
            "stop pod",
            || self.stop_once(id, name),
            VickletError::is_conflict,
        )
        .await?;
        tracing::info!("Pod stopped");
        Ok(())
    }

    async fn stop_once(&self, id: &str, name: &str) -> VickletResult<()> {
        let mut chain = HandleChain::acquire(self.proxy.as_ref(), id, name).await?;
        chain.unbind_scope(name).await?;
        chain.set_state(name, states::SET_STOPPED).await?;
        chain.commit(id).await
    }
}
