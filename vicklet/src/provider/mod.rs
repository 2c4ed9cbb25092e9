//! Provider facade: the operations a virtual-kubelet controller drives.

mod node;
mod readiness;
mod vic;

pub use node::{capacity_from_vch_info, node_addresses, node_conditions};
pub use readiness::wait_for_server;
pub use vic::VicProvider;

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{NodeAddress, NodeCondition, NodeDaemonEndpoints, Pod, PodStatus};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use vicklet_shared::errors::VickletResult;

use crate::operations::StatusError;

/// A virtual-kubelet backend.
///
/// Methods are invoked concurrently by the controller.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Deploy and start a pod.
    async fn create_pod(&self, pod: &Pod) -> VickletResult<()>;

    async fn update_pod(&self, pod: &Pod) -> VickletResult<()>;

    async fn delete_pod(&self, pod: &Pod) -> VickletResult<()>;

    /// Pod as accepted at creation.
    async fn get_pod(&self, namespace: &str, name: &str) -> VickletResult<Pod>;

    async fn get_pods(&self) -> VickletResult<Vec<Pod>>;

    /// Always yields a status; on error it is carried inside [`StatusError`].
    async fn get_pod_status(&self, namespace: &str, name: &str) -> Result<PodStatus, StatusError>;

    async fn get_container_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        container_name: &str,
        tail: i32,
    ) -> VickletResult<String>;

    async fn exec_in_container(
        &self,
        name: &str,
        container: &str,
        cmd: &[String],
        tty: bool,
    ) -> VickletResult<()>;

    /// Node resource capacity. Empty when the backend cannot be queried.
    async fn capacity(&self) -> BTreeMap<String, Quantity>;

    fn node_conditions(&self) -> Vec<NodeCondition>;

    fn node_addresses(&self) -> Vec<NodeAddress>;

    fn node_daemon_endpoints(&self) -> NodeDaemonEndpoints;

    fn operating_system(&self) -> String;

    fn get_pod_full_name(&self, namespace: &str, name: &str) -> String {
        format!("{}-{}", namespace, name)
    }
}
