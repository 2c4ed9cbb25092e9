//! Pod lifecycle operations against the portlayer.
//!
//! Each operation is a small struct over the shared proxies and cache so the
//! provider can compose them and tests can drive them against fakes.

mod chain;
mod container;
mod creator;
mod deleter;
pub mod resources;
pub mod state;
mod starter;
mod status;
mod stopper;

pub use container::isolation_config;
pub use creator::PodCreator;
pub use deleter::PodDeleter;
pub use starter::PodStarter;
pub use state::{BackendState, ConditionValue, PhaseMapping, phase_for};
pub use status::{PodStatusReporter, StatusError};
pub use stopper::PodStopper;

use k8s_openapi::api::core::v1::{Pod, PodSpec};
use vicklet_shared::errors::{VickletError, VickletResult};

/// Name and spec of a pod that is fit to hand to the backend.
pub(crate) fn validate_pod(pod: &Pod) -> VickletResult<(&str, &PodSpec)> {
    let name = pod
        .metadata
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| VickletError::InvalidArgument("pod has no name".into()))?;

    let spec = pod
        .spec
        .as_ref()
        .ok_or_else(|| VickletError::InvalidArgument(format!("pod {} has no spec", name)))?;

    Ok((name, spec))
}
