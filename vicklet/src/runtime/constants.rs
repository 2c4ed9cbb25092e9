//! Constants for the vicklet runtime
//!
//! Centralized location for hardcoded values, paths, and tuning defaults.

// Re-export shared wire constants
pub use vicklet_shared::constants::{network, persona, states, task};

/// Environment variables consulted at startup.
pub mod envs {
    pub const PERSONA_ADDR: &str = "PERSONA_ADDR";
    pub const PORTLAYER_ADDR: &str = "PORTLAYER_ADDR";
    pub const HOST_UUID: &str = "HOST_UUID";

    /// Truthy (`1`, `t`, `true`) switches the log file to the working directory.
    pub const LOCAL_VIRTUAL_KUBELET: &str = "LOCAL_VIRTUAL_KUBELET";
}

/// Log file placement
pub mod logging {
    /// Log directory when running inside the appliance.
    pub const LOG_DIR: &str = "/var/log/vic";

    /// Log directory in local mode (relative to the working directory).
    pub const LOCAL_LOG_DIR: &str = ".";

    pub const LOG_FILE: &str = "virtual-kubelet.log";

    /// Filter used when RUST_LOG is not set.
    pub const DEFAULT_FILTER: &str = "debug";
}

/// Per-container VM resource defaults
pub mod vm_defaults {
    /// vCPUs assigned when a container declares neither request nor limit.
    pub const DEFAULT_CPUS: i64 = 2;

    /// Memory (MiB) used when a container declares neither request nor limit.
    pub const DEFAULT_MEMORY_MIB: i64 = 2048;

    /// Floor for per-VM memory.
    pub const MIN_MEMORY_MIB: i64 = 512;

    /// Memory is handed to the backend in multiples of this.
    pub const MEMORY_ALIGN_MIB: i64 = 128;
}

/// Placeholder configuration submitted with CreateHandle.
///
/// The handle is created against a busybox image that the backend always
/// carries; the real images are joined later with AddImageToHandle.
pub mod handle_defaults {
    pub const NUM_CPUS: i64 = 2;
    pub const MEMORY_MB: i64 = 512;
    pub const IMAGE_ID: &str = "f6e427c148a766d2d6c117d67359a0aa7d133b5bc05830a7ff6e8b64ff6b1d1d";
    pub const LAYER_ID: &str = "02d3847f0b0fb7acd4419040cc53febf91cb112db2451d9b27a245dee5b227c0";
    pub const REPO_NAME: &str = "busybox";
    pub const HOSTNAME: &str = "vicklet";
}

/// Environment defaults injected into container processes
pub mod container_env {
    pub const DEFAULT_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";
    pub const DEFAULT_TERM: &str = "xterm";
}

/// Node-level reporting
pub mod node {
    /// One pod VM is budgeted at least this much memory when estimating pod capacity.
    pub const MIN_POD_MEMORY_BYTES: i64 = 2 * 1024 * 1024 * 1024;

    /// Port advertised for the kubelet daemon endpoint.
    pub const KUBELET_PORT: i32 = 80;

    pub const DEFAULT_OS: &str = "Linux";
}

/// Timeouts for backend HTTP calls
pub mod timeouts {
    use std::time::Duration;

    /// Image pulls block until the backend reports completion.
    pub const PULL: Duration = Duration::from_secs(60);

    /// Every other persona or portlayer request.
    pub const REQUEST: Duration = Duration::from_secs(30);

    /// `CommitHandle` wait value meaning "do not wait".
    pub const COMMIT_NO_WAIT: i32 = -1;
}

/// Host identity sources
pub mod sysfs {
    pub const PRODUCT_SERIAL: &str = "/sys/class/dmi/id/product_serial";
    pub const PRODUCT_UUID: &str = "/sys/class/dmi/id/product_uuid";
}
