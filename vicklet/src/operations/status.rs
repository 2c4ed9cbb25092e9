//! Pod status reporting.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use k8s_openapi::api::core::v1::{
    ContainerState, ContainerStateRunning, ContainerStatus, Pod, PodCondition, PodStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use thiserror::Error;
use vicklet_shared::errors::VickletError;

use super::state::{BackendState, PhaseMapping, UNKNOWN_MAPPING, phase_for};
use crate::cache::{PodCache, PodKey};
use crate::proxy::IsolationProxy;
use crate::runtime::constants::network;

/// A status lookup that could not resolve the pod.
///
/// Carries the unknown-phase status the controller should still record.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct StatusError {
    pub status: Box<PodStatus>,
    #[source]
    pub source: VickletError,
}

#[derive(Clone)]
pub struct PodStatusReporter {
    proxy: Arc<dyn IsolationProxy>,
    cache: PodCache,
}

impl PodStatusReporter {
    pub fn new(proxy: Arc<dyn IsolationProxy>, cache: PodCache) -> Self {
        Self { proxy, cache }
    }

    /// Status of a cached pod.
    ///
    /// Backend lookups that fail degrade the answer (unknown phase, unspecified
    /// addresses) instead of failing it; only a pod missing from the cache is
    /// an error.
    #[tracing::instrument(skip(self))]
    pub async fn get_pod_status(
        &self,
        namespace: &str,
        name: &str,
        host_address: &str,
    ) -> Result<PodStatus, StatusError> {
        let vp = self
            .cache
            .get(&PodKey::new(namespace, name))
            .map_err(|e| StatusError {
                status: Box::new(unknown_status()),
                source: e.into(),
            })?;

        let mapping = match self.proxy.state(&vp.id, name).await {
            Ok(state) => phase_for(BackendState::parse(&state)),
            Err(e) => {
                tracing::warn!(id = %vp.id, error = %e, "Failed to read pod state");
                UNKNOWN_MAPPING
            }
        };

        let addresses = match self.proxy.ep_addresses(&vp.id, name).await {
            Ok(addresses) => addresses,
            Err(e) => {
                tracing::warn!(id = %vp.id, error = %e, "Failed to read pod addresses");
                Vec::new()
            }
        };

        let (host_ip, pod_ip) = match first_ip(&addresses) {
            Some(ip) => (host_address.to_string(), ip),
            None => (
                network::UNSPECIFIED_IP.to_string(),
                network::UNSPECIFIED_IP.to_string(),
            ),
        };

        Ok(PodStatus {
            phase: Some(mapping.phase.to_string()),
            conditions: Some(conditions(&mapping)),
            host_ip: Some(host_ip),
            pod_ip: Some(pod_ip),
            start_time: vp.start_time.map(Time),
            container_statuses: Some(container_statuses(&vp.pod, vp.start_time)),
            ..Default::default()
        })
    }
}

/// Status reported for a pod the engine cannot resolve.
pub fn unknown_status() -> PodStatus {
    PodStatus {
        phase: Some(UNKNOWN_MAPPING.phase.to_string()),
        conditions: Some(conditions(&UNKNOWN_MAPPING)),
        host_ip: Some(network::UNSPECIFIED_IP.to_string()),
        pod_ip: Some(network::UNSPECIFIED_IP.to_string()),
        ..Default::default()
    }
}

/// Address of the first entry that parses as a CIDR.
fn first_ip(addresses: &[String]) -> Option<String> {
    addresses
        .iter()
        .find_map(|a| IpNetwork::from_str(a).ok())
        .map(|net| net.ip().to_string())
}

fn conditions(mapping: &PhaseMapping) -> Vec<PodCondition> {
    [
        ("Initialized", mapping.initialized),
        ("Ready", mapping.ready),
        ("PodScheduled", mapping.scheduled),
    ]
    .into_iter()
    .map(|(type_, value)| PodCondition {
        type_: type_.to_string(),
        status: value.as_str().to_string(),
        ..Default::default()
    })
    .collect()
}

fn container_statuses(pod: &Pod, started: Option<DateTime<Utc>>) -> Vec<ContainerStatus> {
    pod.spec
        .iter()
        .flat_map(|spec| spec.containers.iter())
        .map(|container| ContainerStatus {
            name: container.name.clone(),
            image: container.image.clone().unwrap_or_default(),
            ready: true,
            restart_count: 0,
            state: Some(ContainerState {
                running: Some(ContainerStateRunning {
                    started_at: started.map(Time),
                }),
                ..Default::default()
            }),
            ..Default::default()
        })
        .collect()
}
