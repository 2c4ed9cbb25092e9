//! CPU and memory sizing for container VMs.

use k8s_openapi::api::core::v1::Container;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use vicklet_shared::errors::VickletResult;

use crate::runtime::constants::vm_defaults::{
    DEFAULT_CPUS, DEFAULT_MEMORY_MIB, MEMORY_ALIGN_MIB, MIN_MEMORY_MIB,
};
use crate::util::quantity;

const MIB: i64 = 1024 * 1024;

/// Request, else limit, else zero.
fn request_or_limit(container: &Container, resource: &str) -> VickletResult<i64> {
    let Some(requirements) = container.resources.as_ref() else {
        return Ok(0);
    };

    let lookup = |list: Option<&std::collections::BTreeMap<String, Quantity>>| {
        list.and_then(|m| m.get(resource))
            .map(quantity::value)
            .transpose()
            .map(|v| v.unwrap_or(0))
    };

    let requested = lookup(requirements.requests.as_ref())?;
    if requested != 0 {
        return Ok(requested);
    }
    lookup(requirements.limits.as_ref())
}

/// Whole vCPUs for the container: request, else limit, else 2.
pub fn cpu_count(container: &Container) -> VickletResult<i64> {
    let cpus = request_or_limit(container, "cpu")?;
    Ok(if cpus == 0 { DEFAULT_CPUS } else { cpus.max(1) })
}

/// VM memory in MiB for the container. Undeclared memory gets the default.
pub fn memory_mib(container: &Container) -> VickletResult<i64> {
    let bytes = request_or_limit(container, "memory")?;
    if bytes == 0 {
        return Ok(DEFAULT_MEMORY_MIB);
    }
    Ok(align_memory_mib(container.name.as_str(), bytes_to_mib(bytes)))
}

/// Bytes to MiB, rounding partial MiB up.
pub fn bytes_to_mib(bytes: i64) -> i64 {
    if bytes <= 0 {
        return 0;
    }
    bytes / MIB + i64::from(bytes % MIB != 0)
}

/// Apply the default, the floor and hot-add alignment to a MiB value.
pub fn align_memory_mib(container: &str, mib: i64) -> i64 {
    let mut mib = if mib <= 0 {
        DEFAULT_MEMORY_MIB
    } else {
        mib.max(MIN_MEMORY_MIB)
    };

    let remainder = mib % MEMORY_ALIGN_MIB;
    if remainder != 0 {
        tracing::warn!(
            container,
            memory_mib = mib,
            "Container VM memory must be {} MiB aligned for hot-add, rounding up",
            MEMORY_ALIGN_MIB
        );
        mib += MEMORY_ALIGN_MIB - remainder;
    }
    mib
}
