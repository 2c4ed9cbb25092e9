//! Node-level reporting: capacity, conditions and addresses.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use chrono::Utc;
use k8s_openapi::api::core::v1::{NodeAddress, NodeCondition};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

use crate::proxy::VchInfo;
use crate::runtime::constants::node::MIN_POD_MEMORY_BYTES;
use crate::util::quantity::{format_binary, format_count};

const MIB: i64 = 1024 * 1024;

/// Node capacity for a container host.
///
/// One core is counted per GHz of aggregate CPU. The pod count assumes
/// every pod VM needs at least 2 GiB.
pub fn capacity_from_vch_info(info: &VchInfo) -> BTreeMap<String, Quantity> {
    let memory_bytes = info.memory.saturating_mul(MIB);
    BTreeMap::from([
        ("cpu".to_string(), format_count(info.cpu_mhz / 1000)),
        ("memory".to_string(), format_binary(memory_bytes)),
        (
            "pods".to_string(),
            format_count(memory_bytes / MIN_POD_MEMORY_BYTES),
        ),
    ])
}

pub fn node_conditions() -> Vec<NodeCondition> {
    let now = Time(Utc::now());
    [
        ("Ready", "True", "KubeletReady", "kubelet is ready."),
        (
            "OutOfDisk",
            "False",
            "KubeletHasSufficientDisk",
            "kubelet has sufficient disk space available",
        ),
        (
            "MemoryPressure",
            "False",
            "KubeletHasSufficientMemory",
            "kubelet has sufficient memory available",
        ),
        (
            "DiskPressure",
            "False",
            "KubeletHasNoDiskPressure",
            "kubelet has no disk pressure",
        ),
        (
            "NetworkUnavailable",
            "False",
            "RouteCreated",
            "RouteController created a route",
        ),
    ]
    .into_iter()
    .map(|(type_, status, reason, message)| NodeCondition {
        type_: type_.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_heartbeat_time: Some(now.clone()),
        last_transition_time: Some(now.clone()),
    })
    .collect()
}

pub fn node_addresses(addresses: &[Ipv4Addr]) -> Vec<NodeAddress> {
    addresses
        .iter()
        .map(|ip| NodeAddress {
            type_: "InternalIP".to_string(),
            address: ip.to_string(),
        })
        .collect()
}
