//! Provider backed by a VIC container host.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    DaemonEndpoint, NodeAddress, NodeCondition, NodeDaemonEndpoints, Pod, PodStatus,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use vicklet_shared::errors::VickletResult;

use super::node::{capacity_from_vch_info, node_addresses, node_conditions};
use super::readiness::wait_for_server;
use super::Provider;
use crate::cache::{PodCache, PodKey};
use crate::images::{ImageStore, PersonaClient, PersonaImageStore};
use crate::operations::{PodCreator, PodDeleter, PodStatusReporter, StatusError};
use crate::proxy::{IsolationProxy, PortLayerClient, SystemProxy};
use crate::retry::RetryConfig;
use crate::runtime::VickletConfig;
use crate::runtime::constants::node::KUBELET_PORT;
use crate::util::{local_ipv4_addresses, resolve_host_uuid};

pub struct VicProvider {
    node_name: String,
    os: String,
    host_address: Ipv4Addr,
    node_ips: Vec<Ipv4Addr>,
    cache: PodCache,
    images: Arc<dyn ImageStore>,
    system: Arc<dyn SystemProxy>,
    creator: PodCreator,
    deleter: PodDeleter,
    status: PodStatusReporter,
}

impl VicProvider {
    /// Connect to the persona and portlayer servers named by `config`.
    ///
    /// Blocks until both servers answer (or the readiness budget runs out).
    pub async fn connect(
        config: &VickletConfig,
        node_name: impl Into<String>,
        os: impl Into<String>,
    ) -> VickletResult<Self> {
        let node_name = node_name.into();
        tracing::info!(node = %node_name, config = ?config, "Creating VIC provider");

        let host_uuid = resolve_host_uuid(config.host_uuid.as_deref())?;
        let portlayer = Arc::new(PortLayerClient::new(config.portlayer_addr(), host_uuid)?);
        let persona = PersonaClient::new(config.persona_addr())?;

        let readiness = RetryConfig::for_readiness();
        wait_for_server(&readiness, "portlayer", || SystemProxy::ping(portlayer.as_ref())).await?;
        wait_for_server(&readiness, "persona", || persona.ping()).await?;

        let images: Arc<dyn ImageStore> = Arc::new(PersonaImageStore::new(persona));
        let isolation: Arc<dyn IsolationProxy> = portlayer.clone();
        let system: Arc<dyn SystemProxy> = portlayer;

        tracing::info!(node = %node_name, "Provider ready");
        Ok(Self::from_parts(node_name, os, images, isolation, system))
    }

    /// Assemble a provider from already-connected backends.
    pub fn from_parts(
        node_name: impl Into<String>,
        os: impl Into<String>,
        images: Arc<dyn ImageStore>,
        isolation: Arc<dyn IsolationProxy>,
        system: Arc<dyn SystemProxy>,
    ) -> Self {
        let cache = PodCache::new();
        if let Err(e) = cache.rehydrate() {
            tracing::warn!(error = %e, "Pod cache rehydration failed");
        }

        let node_ips = local_ipv4_addresses().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not enumerate node addresses");
            Vec::new()
        });
        let host_address = node_ips.first().copied().unwrap_or(Ipv4Addr::UNSPECIFIED);

        Self {
            node_name: node_name.into(),
            os: os.into(),
            host_address,
            node_ips,
            creator: PodCreator::new(images.clone(), isolation.clone(), cache.clone()),
            deleter: PodDeleter::new(isolation.clone(), cache.clone()),
            status: PodStatusReporter::new(isolation, cache.clone()),
            cache,
            images,
            system,
        }
    }

    /// Override the address reported as each pod's host IP.
    pub fn with_host_address(mut self, address: Ipv4Addr) -> Self {
        self.host_address = address;
        self
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn cache(&self) -> &PodCache {
        &self.cache
    }

    pub fn image_store(&self) -> &Arc<dyn ImageStore> {
        &self.images
    }
}

#[async_trait]
impl Provider for VicProvider {
    #[tracing::instrument(skip_all, fields(pod = %PodKey::for_pod(pod)))]
    async fn create_pod(&self, pod: &Pod) -> VickletResult<()> {
        tracing::debug!(spec = ?pod.spec, "Creating pod");
        self.creator.create_pod(pod, true).await?;
        tracing::info!("Pod created");
        Ok(())
    }

    async fn update_pod(&self, pod: &Pod) -> VickletResult<()> {
        tracing::debug!(pod = %PodKey::for_pod(pod), "Pod update ignored");
        Ok(())
    }

    async fn delete_pod(&self, pod: &Pod) -> VickletResult<()> {
        self.deleter.delete_pod(pod).await
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> VickletResult<Pod> {
        let vp = self.cache.get(&PodKey::new(namespace, name))?;
        Ok(vp.pod)
    }

    async fn get_pods(&self) -> VickletResult<Vec<Pod>> {
        Ok(self.cache.get_all()?.into_iter().map(|vp| vp.pod).collect())
    }

    async fn get_pod_status(&self, namespace: &str, name: &str) -> Result<PodStatus, StatusError> {
        self.status
            .get_pod_status(namespace, name, &self.host_address.to_string())
            .await
    }

    async fn get_container_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        container_name: &str,
        tail: i32,
    ) -> VickletResult<String> {
        tracing::debug!(namespace, pod_name, container_name, tail, "Container logs requested");
        Ok(String::new())
    }

    async fn exec_in_container(
        &self,
        name: &str,
        container: &str,
        cmd: &[String],
        tty: bool,
    ) -> VickletResult<()> {
        tracing::info!(name, container, cmd = ?cmd, tty, "Exec requested, not supported");
        Ok(())
    }

    async fn capacity(&self) -> BTreeMap<String, Quantity> {
        match self.system.vch_info().await {
            Ok(info) => capacity_from_vch_info(&info),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read container host info");
                BTreeMap::new()
            }
        }
    }

    fn node_conditions(&self) -> Vec<NodeCondition> {
        node_conditions()
    }

    fn node_addresses(&self) -> Vec<NodeAddress> {
        node_addresses(&self.node_ips)
    }

    fn node_daemon_endpoints(&self) -> NodeDaemonEndpoints {
        NodeDaemonEndpoints {
            kubelet_endpoint: Some(DaemonEndpoint { port: KUBELET_PORT }),
        }
    }

    fn operating_system(&self) -> String {
        self.os.clone()
    }
}
