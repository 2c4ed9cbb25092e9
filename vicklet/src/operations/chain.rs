//! Linear handle chains with compensation on failure.
//!
//! Every portlayer mutation consumes the current handle and yields the next
//! one. [`HandleChain`] owns the current handle, threads it through each
//! step and remembers which steps need undoing if a later step fails.

use vicklet_shared::errors::VickletResult;

use crate::proxy::{Endpoint, Handle, IsolationContainerConfig, IsolationProxy, NetworkConfig};
use crate::runtime::constants::timeouts;

/// Undo action registered by a successful step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Compensation {
    UnbindScope { name: String },
}

pub(crate) struct HandleChain<'a> {
    proxy: &'a dyn IsolationProxy,
    handle: Handle,
    compensations: Vec<Compensation>,
}

impl<'a> HandleChain<'a> {
    pub(crate) fn new(proxy: &'a dyn IsolationProxy, handle: Handle) -> Self {
        Self {
            proxy,
            handle,
            compensations: Vec::new(),
        }
    }

    /// Start a chain from the current handle of an existing pod.
    pub(crate) async fn acquire(
        proxy: &'a dyn IsolationProxy,
        id: &str,
        name: &str,
    ) -> VickletResult<Self> {
        let handle = proxy.handle(id, name).await?;
        Ok(Self::new(proxy, handle))
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    fn advance(&mut self, next: Handle) {
        tracing::trace!(from = %self.handle, to = %next, "handle advanced");
        self.handle = next;
    }

    pub(crate) async fn add_image(
        &mut self,
        delta_id: &str,
        layer_id: &str,
        image_id: &str,
        image_name: &str,
    ) -> VickletResult<()> {
        let next = self
            .proxy
            .add_image_to_handle(
                self.handle.clone(),
                delta_id,
                layer_id,
                image_id,
                image_name,
            )
            .await?;
        self.advance(next);
        Ok(())
    }

    pub(crate) async fn add_task(
        &mut self,
        task_id: &str,
        layer_id: &str,
        config: &IsolationContainerConfig,
    ) -> VickletResult<()> {
        let next = self
            .proxy
            .create_handle_task(self.handle.clone(), task_id, layer_id, config)
            .await?;
        self.advance(next);
        Ok(())
    }

    /// Join the network scope named by `config`. On failure the partial
    /// join is removed before the error is returned.
    pub(crate) async fn add_to_scope(
        &mut self,
        config: &IsolationContainerConfig,
    ) -> VickletResult<()> {
        match self
            .proxy
            .add_handle_to_scope(self.handle.clone(), config)
            .await
        {
            Ok(next) => {
                self.advance(next);
                Ok(())
            }
            Err(e) => {
                let scope = NetworkConfig::from_isolation_config(config).network_name;
                if let Err(undo) = self
                    .proxy
                    .remove_handle_from_scope(&self.handle, &scope)
                    .await
                {
                    tracing::warn!(
                        scope = %scope,
                        error = %undo,
                        "Failed to remove handle from scope after a failed add"
                    );
                }
                Err(e)
            }
        }
    }

    pub(crate) async fn add_interaction(&mut self) -> VickletResult<()> {
        let next = self
            .proxy
            .add_interaction_to_handle(self.handle.clone())
            .await?;
        self.advance(next);
        Ok(())
    }

    pub(crate) async fn add_logging(&mut self) -> VickletResult<()> {
        let next = self.proxy.add_logging_to_handle(self.handle.clone()).await?;
        self.advance(next);
        Ok(())
    }

    /// Bind the pod network. Registers an unbind for [`HandleChain::rollback`].
    pub(crate) async fn bind_scope(&mut self, name: &str) -> VickletResult<Vec<Endpoint>> {
        let (next, endpoints) = self.proxy.bind_scope(self.handle.clone(), name).await?;
        self.advance(next);
        self.compensations.push(Compensation::UnbindScope {
            name: name.to_string(),
        });
        Ok(endpoints)
    }

    pub(crate) async fn unbind_scope(&mut self, name: &str) -> VickletResult<Vec<Endpoint>> {
        let (next, endpoints) = self.proxy.unbind_scope(self.handle.clone(), name).await?;
        self.advance(next);
        Ok(endpoints)
    }

    pub(crate) async fn set_state(&mut self, name: &str, state: &str) -> VickletResult<()> {
        let next = self
            .proxy
            .set_state(self.handle.clone(), name, state)
            .await?;
        self.advance(next);
        Ok(())
    }

    /// Realize the chain without waiting. Clears pending compensations.
    pub(crate) async fn commit(&mut self, pod_id: &str) -> VickletResult<()> {
        self.proxy
            .commit_handle(self.handle.clone(), pod_id, timeouts::COMMIT_NO_WAIT)
            .await?;
        self.compensations.clear();
        Ok(())
    }

    /// Run registered compensations, newest first. Failures are logged.
    pub(crate) async fn rollback(mut self) {
        while let Some(step) = self.compensations.pop() {
            match step {
                Compensation::UnbindScope { name } => {
                    match self.proxy.unbind_scope(self.handle.clone(), &name).await {
                        Ok((next, _)) => self.advance(next),
                        Err(e) => {
                            tracing::warn!(name = %name, error = %e, "Failed to unbind scope during rollback")
                        }
                    }
                }
            }
        }
    }
}
