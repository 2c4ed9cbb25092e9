use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use vicklet::proxy::{SystemProxy, VchInfo};
use vicklet_shared::errors::{VickletError, VickletResult};

/// System proxy with a fixed host description.
pub struct FakeSystemProxy {
    info: Mutex<VickletResult<VchInfo>>,
    pings: AtomicU32,
    ping_failures: AtomicU32,
}

impl FakeSystemProxy {
    pub fn new(cpu_mhz: i64, memory_mib: i64) -> Self {
        Self {
            info: Mutex::new(Ok(VchInfo {
                cpu_mhz,
                memory: memory_mib,
                host_os: "ESXi".into(),
                host_os_version: "6.7.0".into(),
                host_product_name: "VMware ESXi".into(),
            })),
            pings: AtomicU32::new(0),
            ping_failures: AtomicU32::new(0),
        }
    }

    pub fn failing(error: VickletError) -> Self {
        let proxy = Self::new(0, 0);
        *proxy.info.lock() = Err(error);
        proxy
    }

    /// Fail the next `n` pings with `ServerNotReady`.
    pub fn fail_pings(&self, n: u32) {
        self.ping_failures.store(n, Ordering::SeqCst);
    }

    pub fn pings(&self) -> u32 {
        self.pings.load(Ordering::SeqCst)
    }
}

impl Default for FakeSystemProxy {
    fn default() -> Self {
        Self::new(20_000, 64 * 1024)
    }
}

#[async_trait]
impl SystemProxy for FakeSystemProxy {
    async fn ping(&self) -> VickletResult<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        let remaining = self.ping_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.ping_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(VickletError::ServerNotReady("portlayer".into()));
        }
        Ok(())
    }

    async fn vch_info(&self) -> VickletResult<VchInfo> {
        self.info.lock().clone()
    }
}
