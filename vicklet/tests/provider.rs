//! Integration tests for the provider facade.

use std::net::Ipv4Addr;
use std::sync::Arc;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use vicklet::{Provider, VicProvider, VickletError};
use vicklet_test_utils::fixtures::{self, NAMESPACE, POD_NAME};
use vicklet_test_utils::{FakeImageStore, FakeIsolationProxy, FakeSystemProxy, Op};

// ============================================================================
// TEST FIXTURES
// ============================================================================

struct TestContext {
    proxy: Arc<FakeIsolationProxy>,
    provider: VicProvider,
}

impl TestContext {
    fn new() -> Self {
        Self::with_system(FakeSystemProxy::default())
    }

    fn with_system(system: FakeSystemProxy) -> Self {
        let proxy = Arc::new(FakeIsolationProxy::default());
        let images = Arc::new(
            FakeImageStore::new()
                .with_image("busybox", fixtures::image("busybox"))
                .with_image("alpine", fixtures::image("alpine")),
        );
        let provider = VicProvider::from_parts("vic-node", "Linux", images, proxy.clone(), Arc::new(system))
            .with_host_address(Ipv4Addr::new(1, 2, 3, 4));
        Self { proxy, provider }
    }
}

// ============================================================================
// POD OPERATIONS
// ============================================================================

#[tokio::test]
async fn create_then_get_pod() {
    let ctx = TestContext::new();
    let pod = fixtures::two_container_pod();

    ctx.provider.create_pod(&pod).await.unwrap();

    assert_eq!(ctx.provider.get_pod(NAMESPACE, POD_NAME).await.unwrap(), pod);
    assert_eq!(ctx.provider.get_pods().await.unwrap().len(), 1);
    assert_eq!(ctx.proxy.details(Op::SetState), vec!["RUNNING"]);
}

#[tokio::test]
async fn created_pod_reports_running_status() {
    let ctx = TestContext::new();
    ctx.proxy.set_ep_addresses(vec!["5.6.7.8/24".into()]);
    ctx.provider
        .create_pod(&fixtures::two_container_pod())
        .await
        .unwrap();

    let status = ctx.provider.get_pod_status(NAMESPACE, POD_NAME).await.unwrap();

    assert_eq!(status.phase.as_deref(), Some("Running"));
    assert_eq!(status.host_ip.as_deref(), Some("1.2.3.4"));
    assert_eq!(status.pod_ip.as_deref(), Some("5.6.7.8"));
    assert!(status.start_time.is_some());
}

#[tokio::test]
async fn delete_pod_clears_cache() {
    let ctx = TestContext::new();
    let pod = fixtures::two_container_pod();
    ctx.provider.create_pod(&pod).await.unwrap();

    ctx.provider.delete_pod(&pod).await.unwrap();

    assert!(ctx.provider.get_pods().await.unwrap().is_empty());
    assert!(
        ctx.provider
            .get_pod(NAMESPACE, POD_NAME)
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert_eq!(ctx.proxy.count(Op::Remove), 1);
}

#[tokio::test]
async fn get_unknown_pod_is_not_found() {
    let ctx = TestContext::new();
    let err = ctx.provider.get_pod(NAMESPACE, "nope").await.unwrap_err();
    assert!(matches!(err, VickletError::NotFound(_)));
}

#[tokio::test]
async fn status_of_unknown_pod_still_carries_status() {
    let ctx = TestContext::new();
    let err = ctx.provider.get_pod_status(NAMESPACE, "nope").await.unwrap_err();
    assert_eq!(err.status.phase.as_deref(), Some("Unknown"));
}

#[tokio::test]
async fn update_pod_is_a_no_op() {
    let ctx = TestContext::new();
    ctx.provider
        .update_pod(&fixtures::two_container_pod())
        .await
        .unwrap();
    assert!(ctx.proxy.ops().is_empty());
}

#[tokio::test]
async fn logs_and_exec_are_stubs() {
    let ctx = TestContext::new();
    assert_eq!(
        ctx.provider
            .get_container_logs(NAMESPACE, POD_NAME, "busybox", 10)
            .await
            .unwrap(),
        ""
    );
    ctx.provider
        .exec_in_container(POD_NAME, "busybox", &["ls".to_string()], false)
        .await
        .unwrap();
}

// ============================================================================
// NODE REPORTING
// ============================================================================

#[tokio::test]
async fn capacity_from_host_info() {
    let ctx = TestContext::with_system(FakeSystemProxy::new(20_000, 64 * 1024));

    let capacity = ctx.provider.capacity().await;

    assert_eq!(capacity.get("cpu"), Some(&Quantity("20".into())));
    assert_eq!(capacity.get("memory"), Some(&Quantity("64Gi".into())));
    assert_eq!(capacity.get("pods"), Some(&Quantity("32".into())));
}

#[tokio::test]
async fn capacity_is_empty_when_host_unreachable() {
    let ctx = TestContext::with_system(FakeSystemProxy::failing(VickletError::Transport(
        "connection refused".into(),
    )));
    assert!(ctx.provider.capacity().await.is_empty());
}

#[test]
fn node_reporting() {
    let ctx = TestContext::new();

    let conditions = ctx.provider.node_conditions();
    assert_eq!(conditions.len(), 5);
    assert_eq!(conditions[0].reason.as_deref(), Some("KubeletReady"));

    let endpoints = ctx.provider.node_daemon_endpoints();
    assert_eq!(endpoints.kubelet_endpoint.unwrap().port, 80);

    assert_eq!(ctx.provider.operating_system(), "Linux");
    assert_eq!(ctx.provider.get_pod_full_name("ns", "web"), "ns-web");
    assert!(
        ctx.provider
            .node_addresses()
            .iter()
            .all(|a| a.type_ == "InternalIP")
    );
}
