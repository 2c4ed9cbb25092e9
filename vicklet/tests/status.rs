//! Integration tests for pod status reporting.

use std::sync::Arc;

use chrono::Utc;
use k8s_openapi::api::core::v1::PodStatus;
use vicklet::cache::{PodCache, PodKey, VicPod};
use vicklet::operations::PodStatusReporter;
use vicklet::VickletError;
use vicklet_test_utils::fixtures::{self, NAMESPACE, POD_NAME};
use vicklet_test_utils::{FakeIsolationProxy, Op};

const HOST_ADDRESS: &str = "1.2.3.4";

struct TestContext {
    proxy: Arc<FakeIsolationProxy>,
    cache: PodCache,
    reporter: PodStatusReporter,
}

impl TestContext {
    fn new() -> Self {
        let proxy = Arc::new(FakeIsolationProxy::default());
        let cache = PodCache::new();
        let reporter = PodStatusReporter::new(proxy.clone(), cache.clone());
        Self {
            proxy,
            cache,
            reporter,
        }
    }

    fn seed(&self) {
        let key = PodKey::new(NAMESPACE, POD_NAME);
        let vp = VicPod::new(self.proxy.pod_id(), &fixtures::two_container_pod());
        self.cache.add(key.clone(), vp).unwrap();
        self.cache.set_start_time(&key, Utc::now()).unwrap();
    }

    async fn status(&self) -> PodStatus {
        self.reporter
            .get_pod_status(NAMESPACE, POD_NAME, HOST_ADDRESS)
            .await
            .unwrap()
    }
}

fn condition(status: &PodStatus, type_: &str) -> String {
    status
        .conditions
        .iter()
        .flatten()
        .find(|c| c.type_ == type_)
        .map(|c| c.status.clone())
        .unwrap_or_default()
}

/// (Initialized, Ready, PodScheduled)
fn conditions(status: &PodStatus) -> (String, String, String) {
    (
        condition(status, "Initialized"),
        condition(status, "Ready"),
        condition(status, "PodScheduled"),
    )
}

fn triple(i: &str, r: &str, s: &str) -> (String, String, String) {
    (i.to_string(), r.to_string(), s.to_string())
}

// ============================================================================
// PHASE MAPPING
// ============================================================================

#[tokio::test]
async fn running_pod_with_endpoint_reports_addresses() {
    let ctx = TestContext::new();
    ctx.seed();
    ctx.proxy.set_backend_state("Running");
    ctx.proxy.set_ep_addresses(vec!["5.6.7.8/24".into()]);

    let status = ctx.status().await;

    assert_eq!(status.phase.as_deref(), Some("Running"));
    assert_eq!(conditions(&status), triple("True", "True", "True"));
    assert_eq!(status.host_ip.as_deref(), Some("1.2.3.4"));
    assert_eq!(status.pod_ip.as_deref(), Some("5.6.7.8"));
}

#[tokio::test]
async fn starting_pod_is_pending() {
    let ctx = TestContext::new();
    ctx.seed();
    ctx.proxy.set_backend_state("Starting");

    let status = ctx.status().await;

    assert_eq!(status.phase.as_deref(), Some("Pending"));
    assert_eq!(conditions(&status), triple("False", "False", "True"));
}

#[tokio::test]
async fn stopping_pod_is_running_but_not_ready() {
    let ctx = TestContext::new();
    ctx.seed();
    ctx.proxy.set_backend_state("Stopping");

    let status = ctx.status().await;

    assert_eq!(status.phase.as_deref(), Some("Running"));
    assert_eq!(conditions(&status), triple("True", "False", "True"));
}

#[tokio::test]
async fn stopped_and_removed_pods_succeeded() {
    for state in ["Stopped", "Removing", "Removed"] {
        let ctx = TestContext::new();
        ctx.seed();
        ctx.proxy.set_backend_state(state);

        let status = ctx.status().await;

        assert_eq!(status.phase.as_deref(), Some("Succeeded"), "{}", state);
        assert_eq!(conditions(&status), triple("True", "False", "True"));
    }
}

#[tokio::test]
async fn state_lookup_failure_reports_unknown() {
    let ctx = TestContext::new();
    ctx.seed();
    ctx.proxy
        .fail(Op::State, VickletError::Internal("invalid pod".into()));
    ctx.proxy
        .fail(Op::EpAddresses, VickletError::Internal("invalid pod".into()));

    let status = ctx.status().await;

    assert_eq!(status.phase.as_deref(), Some("Unknown"));
    assert_eq!(conditions(&status), triple("Unknown", "Unknown", "Unknown"));
    assert_eq!(status.host_ip.as_deref(), Some("0.0.0.0"));
    assert_eq!(status.pod_ip.as_deref(), Some("0.0.0.0"));
}

// ============================================================================
// ADDRESSES AND CONTAINERS
// ============================================================================

#[tokio::test]
async fn unparseable_addresses_fall_back_to_unspecified() {
    let ctx = TestContext::new();
    ctx.seed();
    ctx.proxy.set_ep_addresses(vec!["garbage".into()]);

    let status = ctx.status().await;

    assert_eq!(status.host_ip.as_deref(), Some("0.0.0.0"));
    assert_eq!(status.pod_ip.as_deref(), Some("0.0.0.0"));
}

#[tokio::test]
async fn first_parseable_address_wins() {
    let ctx = TestContext::new();
    ctx.seed();
    ctx.proxy
        .set_ep_addresses(vec!["".into(), "172.16.0.9/16".into(), "10.0.0.1/8".into()]);

    let status = ctx.status().await;

    assert_eq!(status.pod_ip.as_deref(), Some("172.16.0.9"));
}

#[tokio::test]
async fn container_statuses_share_pod_start_time() {
    let ctx = TestContext::new();
    ctx.seed();

    let status = ctx.status().await;
    let containers = status.container_statuses.clone().unwrap();

    assert_eq!(containers.len(), 2);
    assert_eq!(containers[0].name, "busybox");
    assert_eq!(containers[1].image, "alpine");
    for c in &containers {
        assert!(c.ready);
        assert_eq!(c.restart_count, 0);
        let running = c.state.as_ref().unwrap().running.as_ref().unwrap();
        assert_eq!(running.started_at, status.start_time);
    }
}

#[tokio::test]
async fn repeated_status_calls_are_equal() {
    let ctx = TestContext::new();
    ctx.seed();

    assert_eq!(ctx.status().await, ctx.status().await);
}

// ============================================================================
// MISSING PODS
// ============================================================================

#[tokio::test]
async fn uncached_pod_returns_unknown_status_with_error() {
    let ctx = TestContext::new();

    let err = ctx
        .reporter
        .get_pod_status(NAMESPACE, "missing", HOST_ADDRESS)
        .await
        .unwrap_err();

    assert!(err.source.is_not_found());
    assert_eq!(err.status.phase.as_deref(), Some("Unknown"));
    assert!(ctx.proxy.ops().is_empty());
}

#[tokio::test]
async fn namespaces_do_not_collide() {
    let ctx = TestContext::new();
    ctx.seed();

    let err = ctx
        .reporter
        .get_pod_status("other", POD_NAME, HOST_ADDRESS)
        .await
        .unwrap_err();

    assert!(err.source.is_not_found());
}
