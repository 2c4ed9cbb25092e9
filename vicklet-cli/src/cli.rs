use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vicklet::runtime::constants::node::DEFAULT_OS;
use vicklet::{VicProvider, VickletConfig};

use crate::commands::{check::CheckArgs, run::RunArgs};

/// Run Kubernetes pods as VMs on a vSphere Integrated Containers host
#[derive(Parser, Debug)]
#[command(name = "vicklet", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wait for the backend servers and print node capacity and conditions
    Check(CheckArgs),
    /// Create and start a pod from a manifest
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GlobalFlags {
    /// Provider config file (YAML: persona-server, portlayer-server, host-uuid)
    #[arg(long, global = true, env = "VICKLET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Node name reported to Kubernetes
    #[arg(long, global = true, default_value = "vic-kubelet")]
    pub node_name: String,

    /// Operating system reported for the node
    #[arg(long, global = true, default_value = DEFAULT_OS)]
    pub os: String,
}

impl GlobalFlags {
    pub fn load_config(&self) -> anyhow::Result<VickletConfig> {
        Ok(VickletConfig::load(self.config.as_deref())?)
    }

    /// Load config and connect, waiting for both backend servers.
    pub async fn create_provider(&self) -> anyhow::Result<VicProvider> {
        let config = self.load_config()?;
        Ok(VicProvider::connect(&config, self.node_name.clone(), self.os.clone()).await?)
    }
}
