//! Wire constants shared by every vicklet layer.
//!
//! These strings must match what the portlayer and persona services expect.

/// Backend lifecycle states as reported by the portlayer.
pub mod states {
    pub const STARTING: &str = "Starting";
    pub const RUNNING: &str = "Running";
    pub const STOPPING: &str = "Stopping";
    pub const STOPPED: &str = "Stopped";
    pub const REMOVING: &str = "Removing";
    pub const REMOVED: &str = "Removed";
    pub const ERROR: &str = "Error";

    /// Desired state submitted with SetState when starting a pod.
    pub const SET_RUNNING: &str = "RUNNING";

    /// Desired state submitted with SetState when stopping a pod.
    pub const SET_STOPPED: &str = "STOPPED";
}

/// Persona (Docker-compatible) API constants.
pub mod persona {
    /// API version tag prefixed to every persona path.
    pub const API_VERSION: &str = "v1.35";

    /// Header carrying base64-encoded registry credentials.
    pub const REGISTRY_AUTH_HEADER: &str = "X-Registry-Auth";
}

/// Network constants
pub mod network {
    /// Scope every pod VM joins.
    pub const DEFAULT_SCOPE: &str = "default";

    /// Protocol assumed when a container port declares none.
    pub const DEFAULT_PROTOCOL: &str = "tcp";

    /// Address reported when the pod has no parseable endpoint.
    pub const UNSPECIFIED_IP: &str = "0.0.0.0";
}

/// Task naming
pub mod task {
    /// Task id for every container after the first: `Container-<index>-task`.
    pub fn secondary_task_id(index: usize) -> String {
        format!("Container-{}-task", index)
    }
}
