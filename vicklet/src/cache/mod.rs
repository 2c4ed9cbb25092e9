//! In-memory registry bridging Kubernetes pod identity and backend pod ids.

mod error;
mod pod_cache;

pub use error::CacheError;
pub use pod_cache::{PodCache, PodKey, VicPod};
