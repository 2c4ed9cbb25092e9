//! vicklet: a virtual-kubelet provider that runs each Kubernetes pod as a
//! VM on a vSphere Integrated Containers host.
//!
//! The engine talks to two backend services: the persona (a Docker-compatible
//! API used for images) and the portlayer (handle-based VM construction).

pub mod cache;
mod http;
pub mod images;
pub mod operations;
pub mod provider;
pub mod proxy;
pub mod retry;
pub mod runtime;
pub mod util;

pub use cache::{CacheError, PodCache, PodKey, VicPod};
pub use images::{ImageConfig, ImageStore, PersonaClient, PersonaImageStore};
pub use operations::{
    PodCreator, PodDeleter, PodStarter, PodStatusReporter, PodStopper, StatusError,
};
pub use provider::{Provider, VicProvider};
pub use proxy::{Handle, IsolationContainerConfig, IsolationProxy, PortLayerClient, SystemProxy};
pub use runtime::{LogConfig, VickletConfig};
pub use vicklet_shared::errors::{VickletError, VickletResult};
