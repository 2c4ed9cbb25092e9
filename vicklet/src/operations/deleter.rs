//! Pod deletion, forced or graceful.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;
use vicklet_shared::errors::{VickletError, VickletResult};

use super::chain::HandleChain;
use super::state::BackendState;
use super::stopper::PodStopper;
use crate::cache::{PodCache, PodKey, VicPod};
use crate::proxy::IsolationProxy;
use crate::retry::{RetryConfig, retry_with_backoff};

#[derive(Clone)]
pub struct PodDeleter {
    proxy: Arc<dyn IsolationProxy>,
    cache: PodCache,
    stopper: PodStopper,
    retry: RetryConfig,
}

impl PodDeleter {
    pub fn new(proxy: Arc<dyn IsolationProxy>, cache: PodCache) -> Self {
        Self::with_retry(proxy, cache, RetryConfig::for_conflict())
    }

    pub fn with_retry(proxy: Arc<dyn IsolationProxy>, cache: PodCache, retry: RetryConfig) -> Self {
        let stopper = PodStopper::with_retry(proxy.clone(), retry.clone());
        Self {
            proxy,
            cache,
            stopper,
            retry,
        }
    }

    /// Force-delete a cached pod and drop its cache entry.
    ///
    /// A pod that is not cached fails with `NotFound` before any backend
    /// call is made.
    #[tracing::instrument(skip_all, fields(pod = %PodKey::for_pod(pod)))]
    pub async fn delete_pod(&self, pod: &Pod) -> VickletResult<()> {
        let key = PodKey::for_pod(pod);
        let vp = self.cache.get(&key)?;

        if let Err(e) = self.delete(&vp, true).await {
            tracing::error!(id = %vp.id, error = %e, "Failed to delete pod");
            return Err(e);
        }

        tracing::info!(id = %vp.id, "Removing pod from cache");
        self.cache.delete(&key)?;
        Ok(())
    }

    /// Delete the backend VM of `vp`.
    ///
    /// With `force` the pod is stopped first. Without it the current state
    /// decides: an errored pod is stopped (failures ignored), a starting pod
    /// is refused and a running pod gets a single removal attempt instead of
    /// the conflict retry loop.
    pub async fn delete(&self, vp: &VicPod, force: bool) -> VickletResult<()> {
        let (id, name) = (vp.id.as_str(), vp.name());
        let mut running = false;

        if force {
            self.stopper.stop(id, name).await?;
        } else {
            let state = BackendState::parse(&self.proxy.state(id, name).await?);
            if state.is_error() {
                if let Err(e) = self.stopper.stop(id, name).await {
                    tracing::warn!(id, error = %e, "Stop of errored pod failed, removing anyway");
                }
            } else if state.is_starting() {
                return Err(VickletError::InvalidArgument(format!(
                    "pod {} is starting; use force to remove it",
                    name
                )));
            } else if state.is_running() {
                running = true;
            }

            let mut chain = HandleChain::acquire(self.proxy.as_ref(), id, name).await?;
            let endpoints = chain.unbind_scope(name).await?;
            tracing::debug!(id, endpoints = ?endpoints, "Scope unbound");
        }

        tracing::info!(id, running, "Removing pod VM");
        if running {
            return self.proxy.remove(id, true).await;
        }

        retry_with_backoff(
            &self.retry,
            "remove pod",
            || self.proxy.remove(id, true),
            VickletError::is_conflict,
        )
        .await
    }
}
