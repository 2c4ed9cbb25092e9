//! Isolation proxy: the portlayer's handle-based VM construction API.
//!
//! A handle is an uncommitted VM configuration. Every mutation consumes the
//! handle it is given and returns its successor; [`IsolationProxy::commit_handle`]
//! realizes the configuration.

mod config;
mod isolation;
mod models;
mod portlayer;
mod system;

pub use config::{IsolationContainerConfig, NetworkConfig, PortBinding, TaskJoinConfig};
pub use isolation::{Endpoint, Handle, IsolationProxy};
pub use models::VchInfo;
pub use portlayer::PortLayerClient;
pub use system::SystemProxy;
