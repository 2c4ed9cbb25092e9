use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vicklet_shared::errors::VickletResult;

use super::config::IsolationContainerConfig;

/// Opaque token for an in-progress VM configuration.
///
/// Handles have linear lineage: each mutation takes one by value and hands
/// back the next, and the previous one must not be reused.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Network endpoint assigned when a VM binds to a scope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default)]
    pub scope: String,
    /// Interface address in CIDR form, e.g. `10.0.0.5/16`.
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub gateway: String,
    #[serde(default)]
    pub ports: Vec<String>,
}

/// The portlayer operations pod lifecycle is assembled from.
///
/// Implementations are stateless and safe to share between concurrent
/// operations.
#[async_trait]
pub trait IsolationProxy: Send + Sync {
    /// Begin a new pod VM transaction. Returns `(pod_id, handle)`.
    async fn create_handle(&self) -> VickletResult<(String, Handle)>;

    /// Join an image filesystem layer to the pod VM.
    ///
    /// `delta_id` names the container's writable delta (the container name);
    /// `layer_id` is the image's top layer it is stacked on.
    async fn add_image_to_handle(
        &self,
        handle: Handle,
        delta_id: &str,
        layer_id: &str,
        image_id: &str,
        image_name: &str,
    ) -> VickletResult<Handle>;

    /// Register a process to run in the filesystem namespace `layer_id`.
    async fn create_handle_task(
        &self,
        handle: Handle,
        task_id: &str,
        layer_id: &str,
        config: &IsolationContainerConfig,
    ) -> VickletResult<Handle>;

    /// Attach the VM to the network scope the config names.
    async fn add_handle_to_scope(
        &self,
        handle: Handle,
        config: &IsolationContainerConfig,
    ) -> VickletResult<Handle>;

    /// Undo a scope add. Used to roll back a failed [`IsolationProxy::add_handle_to_scope`].
    async fn remove_handle_from_scope(&self, handle: &Handle, scope: &str) -> VickletResult<()>;

    /// Enable stdio retrieval.
    async fn add_interaction_to_handle(&self, handle: Handle) -> VickletResult<Handle>;

    /// Enable log retrieval.
    async fn add_logging_to_handle(&self, handle: Handle) -> VickletResult<Handle>;

    /// Realize the configuration. `wait_time <= 0` means do not wait.
    async fn commit_handle(&self, handle: Handle, pod_id: &str, wait_time: i32)
    -> VickletResult<()>;

    /// Bind network at start time.
    async fn bind_scope(&self, handle: Handle, name: &str)
    -> VickletResult<(Handle, Vec<Endpoint>)>;

    /// Reverse of [`IsolationProxy::bind_scope`].
    async fn unbind_scope(
        &self,
        handle: Handle,
        name: &str,
    ) -> VickletResult<(Handle, Vec<Endpoint>)>;

    /// Record the desired state (`RUNNING` or `STOPPED`) applied at commit.
    async fn set_state(&self, handle: Handle, name: &str, state: &str) -> VickletResult<Handle>;

    /// Reacquire a handle for an existing pod.
    async fn handle(&self, id: &str, name: &str) -> VickletResult<Handle>;

    /// Backend-reported lifecycle state.
    async fn state(&self, id: &str, name: &str) -> VickletResult<String>;

    /// Interface addresses (CIDR form) assigned to the pod.
    async fn ep_addresses(&self, id: &str, name: &str) -> VickletResult<Vec<String>>;

    /// Destroy the pod VM.
    async fn remove(&self, id: &str, force: bool) -> VickletResult<()>;
}
