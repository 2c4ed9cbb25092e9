//! Pod start: bind network, request RUNNING, commit.

use std::sync::Arc;

use vicklet_shared::errors::VickletResult;

use super::chain::HandleChain;
use crate::proxy::IsolationProxy;
use crate::runtime::constants::states;

#[derive(Clone)]
pub struct PodStarter {
    proxy: Arc<dyn IsolationProxy>,
}

impl PodStarter {
    pub fn new(proxy: Arc<dyn IsolationProxy>) -> Self {
        Self { proxy }
    }

    /// Start pod `id`.
    ///
    /// If anything fails after the network bind, the bind is undone
    /// (best effort) before the error is returned.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, id: &str, name: &str) -> VickletResult<()> {
        let mut chain = HandleChain::acquire(self.proxy.as_ref(), id, name).await?;
        let endpoints = chain.bind_scope(name).await?;
        tracing::debug!(endpoints = endpoints.len(), "Pod network bound");

        let outcome: VickletResult<()> = async {
            chain.set_state(name, states::SET_RUNNING).await?;
            chain.commit(id).await
        }
        .await;

        match outcome {
            Ok(()) => {
                tracing::info!("Pod started");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, handle = %chain.handle(), "Pod start failed, unbinding network");
                chain.rollback().await;
                Err(e)
            }
        }
    }
}
