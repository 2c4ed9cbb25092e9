use async_trait::async_trait;
use vicklet_shared::errors::VickletResult;

use super::models::VchInfo;

/// Host-level queries against the portlayer.
#[async_trait]
pub trait SystemProxy: Send + Sync {
    /// Succeeds once the portlayer answers its ping endpoint.
    async fn ping(&self) -> VickletResult<()>;

    /// Aggregate CPU and memory of the container host.
    async fn vch_info(&self) -> VickletResult<VchInfo>;
}
