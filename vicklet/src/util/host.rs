//! Host identity and local address discovery.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use if_addrs::get_if_addrs;
use uuid::Uuid;
use vicklet_shared::errors::{VickletError, VickletResult};

use crate::runtime::constants::sysfs;

/// Resolve the hypervisor host UUID.
///
/// A configured value wins. Otherwise the DMI product serial is decoded
/// (`VMware-42 1d ... -c5 ...`), falling back to the DMI product UUID.
pub fn resolve_host_uuid(configured: Option<&str>) -> VickletResult<String> {
    if let Some(uuid) = configured.filter(|u| !u.is_empty()) {
        return Ok(uuid.to_string());
    }

    if let Some(uuid) = read_dmi(Path::new(sysfs::PRODUCT_SERIAL)).and_then(|s| uuid_from_serial(&s)) {
        return Ok(uuid);
    }

    read_dmi(Path::new(sysfs::PRODUCT_UUID))
        .and_then(|s| Uuid::try_parse(s.trim()).ok())
        .map(|u| u.to_string())
        .ok_or_else(|| {
            VickletError::Internal("unable to determine host UUID from DMI data".to_string())
        })
}

fn read_dmi(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Some(contents),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "DMI file unreadable");
            None
        }
    }
}

/// Decode a VMware BIOS serial into UUID form.
pub(crate) fn uuid_from_serial(serial: &str) -> Option<String> {
    let hex: String = serial
        .trim()
        .strip_prefix("VMware-")?
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    Uuid::try_parse(&hex).ok().map(|u| u.to_string())
}

/// Non-loopback IPv4 addresses of this host, sorted.
pub fn local_ipv4_addresses() -> VickletResult<Vec<Ipv4Addr>> {
    let interfaces = get_if_addrs()
        .map_err(|e| VickletError::Internal(format!("failed to list interfaces: {}", e)))?;

    let addrs: BTreeSet<Ipv4Addr> = interfaces
        .into_iter()
        .filter_map(|iface| match iface.ip() {
            IpAddr::V4(ip) if !ip.is_loopback() => Some(ip),
            _ => None,
        })
        .collect();
    Ok(addrs.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_decodes_to_uuid() {
        let serial = "VMware-42 1d 5b 3e 9a 7f 11 c2-8e 4d 2a 6b 90 01 ff 3c\n";
        assert_eq!(
            uuid_from_serial(serial).as_deref(),
            Some("421d5b3e-9a7f-11c2-8e4d-2a6b9001ff3c")
        );
    }

    #[test]
    fn test_non_vmware_serial_rejected() {
        assert_eq!(uuid_from_serial("Dell-1234"), None);
        assert_eq!(uuid_from_serial("VMware-zz"), None);
    }

    #[test]
    fn test_configured_uuid_wins() {
        assert_eq!(resolve_host_uuid(Some("abc")).unwrap(), "abc");
    }

    #[test]
    fn test_local_addresses_exclude_loopback() {
        let addrs = local_ipv4_addresses().unwrap();
        assert!(addrs.iter().all(|a| !a.is_loopback()));
    }
}
