//! Portlayer request and response bodies.

use serde::{Deserialize, Serialize};

use super::config::NetworkConfig;
use super::isolation::Endpoint;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageStoreRef {
    pub name: String,
}

/// Placeholder VM definition submitted with CreateHandle.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContainerCreateConfig {
    pub num_cpus: i64,
    #[serde(rename = "memoryMB")]
    pub memory_mb: i64,
    pub layer: String,
    pub image: String,
    pub repo_name: String,
    pub name: String,
    pub image_store: ImageStoreRef,
    pub network_disabled: bool,
    pub hostname: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContainerCreatedInfo {
    pub id: String,
    pub handle: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageJoinConfig {
    pub handle: String,
    #[serde(rename = "deltaID")]
    pub delta_id: String,
    #[serde(rename = "imageID")]
    pub image_id: String,
    pub repo_name: String,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct HandleConfig {
    pub handle: String,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct TaskBindConfig {
    pub handle: String,
    pub id: String,
}

/// Generic `{ "handle": ... }` response.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct HandleResponse {
    pub handle: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScopesAddContainerConfig {
    pub handle: String,
    pub network_config: NetworkConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct BindContainerResponse {
    pub handle: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct StateChangeConfig {
    pub state: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContainerConfigInfo {
    #[serde(default)]
    pub state: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContainerInfo {
    #[serde(default)]
    pub container_config: ContainerConfigInfo,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// Host resources of the virtual container host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VchInfo {
    /// Aggregate CPU, MHz.
    #[serde(rename = "cpuMhz")]
    pub cpu_mhz: i64,
    /// Aggregate memory, MiB.
    pub memory: i64,
    #[serde(default)]
    pub host_os: String,
    #[serde(default)]
    pub host_os_version: String,
    #[serde(default)]
    pub host_product_name: String,
}
