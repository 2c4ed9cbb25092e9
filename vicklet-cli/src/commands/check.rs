use std::collections::BTreeMap;

use clap::Args;
use k8s_openapi::api::core::v1::{NodeAddress, NodeCondition, NodeDaemonEndpoints};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::Serialize;
use vicklet::Provider;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Print JSON instead of YAML
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeReport {
    node_name: String,
    operating_system: String,
    capacity: BTreeMap<String, Quantity>,
    conditions: Vec<NodeCondition>,
    addresses: Vec<NodeAddress>,
    daemon_endpoints: NodeDaemonEndpoints,
}

pub async fn execute(args: CheckArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let provider = global.create_provider().await?;
    tracing::debug!(node = provider.node_name(), "Backend servers ready");

    let report = NodeReport {
        node_name: provider.node_name().to_string(),
        operating_system: provider.operating_system(),
        capacity: provider.capacity().await,
        conditions: provider.node_conditions(),
        addresses: provider.node_addresses(),
        daemon_endpoints: provider.node_daemon_endpoints(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", serde_yaml::to_string(&report)?);
    }
    Ok(())
}
