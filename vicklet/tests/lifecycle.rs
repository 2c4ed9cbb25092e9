//! Integration tests for pod create, start, stop and delete against a
//! recording isolation proxy.

use std::sync::Arc;
use std::time::Duration;

use vicklet::cache::{PodCache, PodKey, VicPod};
use vicklet::operations::{PodCreator, PodDeleter, PodStarter, PodStopper};
use vicklet::retry::RetryConfig;
use vicklet::{ImageStore, IsolationProxy, VickletError};
use vicklet_test_utils::fixtures::{self, NAMESPACE, POD_NAME};
use vicklet_test_utils::{FakeImageStore, FakeIsolationProxy, Op};

// ============================================================================
// TEST FIXTURES
// ============================================================================

struct TestContext {
    proxy: Arc<FakeIsolationProxy>,
    images: Arc<FakeImageStore>,
    cache: PodCache,
}

impl TestContext {
    fn new() -> Self {
        Self::with_images(
            FakeImageStore::new()
                .with_image("busybox", fixtures::image("busybox"))
                .with_image("alpine", fixtures::image("alpine")),
        )
    }

    fn with_images(images: FakeImageStore) -> Self {
        Self {
            proxy: Arc::new(FakeIsolationProxy::default()),
            images: Arc::new(images),
            cache: PodCache::new(),
        }
    }

    fn isolation(&self) -> Arc<dyn IsolationProxy> {
        self.proxy.clone()
    }

    fn creator(&self) -> PodCreator {
        let images: Arc<dyn ImageStore> = self.images.clone();
        PodCreator::new(images, self.isolation(), self.cache.clone())
    }

    fn deleter(&self) -> PodDeleter {
        PodDeleter::new(self.isolation(), self.cache.clone())
    }

    fn key(&self) -> PodKey {
        PodKey::new(NAMESPACE, POD_NAME)
    }

    /// Put a pod in the cache as if it had been created earlier.
    fn seed(&self) -> VicPod {
        let vp = VicPod::new(self.proxy.pod_id(), &fixtures::two_container_pod());
        self.cache.add(self.key(), vp.clone()).unwrap();
        vp
    }
}

async fn within<F: std::future::Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("operation hung")
}

// ============================================================================
// CREATE
// ============================================================================

#[tokio::test]
async fn create_two_container_pod_runs_full_handle_chain() {
    let ctx = TestContext::with_images(
        FakeImageStore::new()
            .with_image("busybox", fixtures::image("busybox"))
            .with_image("alpine", fixtures::image("alpine"))
            .with_barrier(2),
    );

    within(ctx.creator().create_pod(&fixtures::two_container_pod(), true))
        .await
        .unwrap();

    assert_eq!(
        ctx.proxy.ops(),
        vec![
            Op::CreateHandle,
            Op::AddImageToHandle,
            Op::CreateHandleTask,
            Op::AddHandleToScope,
            Op::AddImageToHandle,
            Op::CreateHandleTask,
            Op::AddHandleToScope,
            Op::AddInteractionToHandle,
            Op::AddLoggingToHandle,
            Op::CommitHandle,
            Op::Handle,
            Op::BindScope,
            Op::SetState,
            Op::CommitHandle,
        ]
    );
    assert_eq!(ctx.proxy.details(Op::AddImageToHandle), vec!["busybox", "alpine"]);
    assert_eq!(
        ctx.proxy.details(Op::CreateHandleTask),
        vec![ctx.proxy.pod_id().to_string(), "Container-1-task".to_string()]
    );
    assert_eq!(ctx.proxy.details(Op::SetState), vec!["RUNNING"]);

    assert_eq!(ctx.cache.len().unwrap(), 1);
    let cached = ctx.cache.get(&ctx.key()).unwrap();
    assert_eq!(cached.id, ctx.proxy.pod_id());
    assert!(cached.start_time.is_some());
}

#[tokio::test]
async fn create_threads_each_handle_into_the_next_call() {
    let ctx = TestContext::new();
    ctx.creator()
        .create_pod(&fixtures::two_container_pod(), false)
        .await
        .unwrap();

    let handles: Vec<String> = ctx
        .proxy
        .calls()
        .into_iter()
        .filter_map(|c| c.handle)
        .collect();
    let expected: Vec<String> = (1..=handles.len()).map(|i| format!("handle-{}", i)).collect();
    assert_eq!(handles, expected);
}

#[tokio::test]
async fn create_without_start_leaves_pod_unstarted() {
    let ctx = TestContext::new();
    ctx.creator()
        .create_pod(&fixtures::two_container_pod(), false)
        .await
        .unwrap();

    assert_eq!(ctx.proxy.count(Op::BindScope), 0);
    assert_eq!(ctx.proxy.count(Op::CommitHandle), 1);
    assert_eq!(ctx.cache.get(&ctx.key()).unwrap().start_time, None);
}

#[tokio::test]
async fn create_normalizes_container_resources() {
    let ctx = TestContext::new();
    ctx.creator()
        .create_pod(&fixtures::two_container_pod(), false)
        .await
        .unwrap();

    let configs = ctx.proxy.task_configs();
    assert_eq!(configs.len(), 2);
    for (_, cfg) in &configs {
        assert!(cfg.memory_mib >= 512);
        assert_eq!(cfg.memory_mib % 128, 0);
        assert_eq!(cfg.cpu_count, 2);
    }
    assert_eq!(configs[0].1.cmd, vec!["/bin/sleep", "2m"]);
    assert_eq!(configs[1].1.cmd, vec!["/bin/sh"]);
}

#[tokio::test]
async fn create_fails_when_an_image_cannot_be_pulled() {
    let ctx = TestContext::with_images(
        FakeImageStore::new()
            .with_image("busybox", fixtures::image("busybox"))
            .with_error("alpine", VickletError::ImageFetch("registry unreachable".into()))
            .with_barrier(2),
    );

    let err = within(ctx.creator().create_pod(&fixtures::two_container_pod(), true))
        .await
        .unwrap_err();

    assert_eq!(err, VickletError::ImageFetch("registry unreachable".into()));
    assert_eq!(ctx.images.lookups().len(), 2);
    assert!(ctx.proxy.ops().is_empty());
    assert!(ctx.cache.is_empty().unwrap());
}

#[tokio::test]
async fn create_rolls_back_failed_scope_add() {
    let ctx = TestContext::new();
    ctx.proxy.fail_for(
        Op::AddHandleToScope,
        "alpine",
        VickletError::Internal("scope full".into()),
    );

    let err = ctx
        .creator()
        .create_pod(&fixtures::two_container_pod(), true)
        .await
        .unwrap_err();

    assert_eq!(err, VickletError::Internal("scope full".into()));
    assert_eq!(ctx.proxy.details(Op::RemoveHandleFromScope), vec!["default"]);
    assert_eq!(ctx.proxy.count(Op::CommitHandle), 0);
    assert!(ctx.cache.is_empty().unwrap());
}

#[tokio::test]
async fn create_rejects_pod_without_spec() {
    let ctx = TestContext::new();
    let mut pod = fixtures::two_container_pod();
    pod.spec = None;

    let err = ctx.creator().create_pod(&pod, true).await.unwrap_err();
    assert!(matches!(err, VickletError::InvalidArgument(_)));
    assert!(ctx.proxy.ops().is_empty());
}

#[tokio::test]
async fn create_with_no_containers_runs_trailer_only() {
    let ctx = TestContext::new();
    let pod = fixtures::pod(POD_NAME, Vec::new());

    ctx.creator().create_pod(&pod, false).await.unwrap();

    assert_eq!(
        ctx.proxy.ops(),
        vec![
            Op::CreateHandle,
            Op::AddInteractionToHandle,
            Op::AddLoggingToHandle,
            Op::CommitHandle,
        ]
    );
    assert_eq!(ctx.cache.len().unwrap(), 1);
}

#[tokio::test]
async fn create_with_always_policy_does_not_pull() {
    let ctx = TestContext::with_images(FakeImageStore::new());
    let mut container = fixtures::container("busybox", "busybox", &[]);
    container.image_pull_policy = Some("Always".into());
    let pod = fixtures::pod(POD_NAME, vec![container]);

    let err = ctx.creator().create_pod(&pod, false).await.unwrap_err();

    assert!(err.is_not_found());
    assert!(ctx.images.lookups().iter().all(|l| !l.realize));
}

#[tokio::test]
async fn create_twice_keeps_single_cache_entry() {
    let ctx = TestContext::new();
    let pod = fixtures::two_container_pod();

    ctx.creator().create_pod(&pod, false).await.unwrap();
    ctx.creator().create_pod(&pod, false).await.unwrap();

    assert_eq!(ctx.cache.len().unwrap(), 1);
}

#[tokio::test]
async fn create_caches_pod_even_if_start_fails() {
    let ctx = TestContext::new();
    ctx.proxy
        .fail(Op::BindScope, VickletError::Internal("no network".into()));

    let err = ctx
        .creator()
        .create_pod(&fixtures::two_container_pod(), true)
        .await
        .unwrap_err();

    assert_eq!(err, VickletError::Internal("no network".into()));
    assert_eq!(ctx.cache.get(&ctx.key()).unwrap().start_time, None);
}

// ============================================================================
// START
// ============================================================================

#[tokio::test]
async fn start_binds_sets_running_and_commits() {
    let ctx = TestContext::new();
    PodStarter::new(ctx.isolation())
        .start("pod-1234", POD_NAME)
        .await
        .unwrap();

    assert_eq!(
        ctx.proxy.ops(),
        vec![Op::Handle, Op::BindScope, Op::SetState, Op::CommitHandle]
    );
}

#[tokio::test]
async fn start_unbinds_after_failure_past_bind() {
    let ctx = TestContext::new();
    ctx.proxy
        .fail(Op::CommitHandle, VickletError::Internal("commit failed".into()));

    let err = PodStarter::new(ctx.isolation())
        .start("pod-1234", POD_NAME)
        .await
        .unwrap_err();

    assert_eq!(err, VickletError::Internal("commit failed".into()));
    assert_eq!(
        ctx.proxy.ops(),
        vec![
            Op::Handle,
            Op::BindScope,
            Op::SetState,
            Op::CommitHandle,
            Op::UnbindScope,
        ]
    );
}

#[tokio::test]
async fn start_bind_failure_needs_no_unbind() {
    let ctx = TestContext::new();
    ctx.proxy
        .fail(Op::BindScope, VickletError::NotFound("scope".into()));

    assert!(
        PodStarter::new(ctx.isolation())
            .start("pod-1234", POD_NAME)
            .await
            .is_err()
    );
    assert_eq!(ctx.proxy.count(Op::UnbindScope), 0);
}

// ============================================================================
// STOP
// ============================================================================

#[tokio::test(start_paused = true)]
async fn stop_retries_on_conflict() {
    let ctx = TestContext::new();
    ctx.proxy
        .fail_times(Op::CommitHandle, 1, VickletError::Conflict("stale handle".into()));

    let started = tokio::time::Instant::now();
    PodStopper::new(ctx.isolation())
        .stop("pod-1234", POD_NAME)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(600));
    assert_eq!(
        ctx.proxy.ops(),
        vec![
            Op::Handle,
            Op::UnbindScope,
            Op::SetState,
            Op::CommitHandle,
            Op::Handle,
            Op::UnbindScope,
            Op::SetState,
            Op::CommitHandle,
        ]
    );
    assert_eq!(ctx.proxy.details(Op::SetState), vec!["STOPPED", "STOPPED"]);
}

#[tokio::test(start_paused = true)]
async fn stop_does_not_retry_other_errors() {
    let ctx = TestContext::new();
    ctx.proxy
        .fail(Op::UnbindScope, VickletError::Internal("boom".into()));

    let err = PodStopper::new(ctx.isolation())
        .stop("pod-1234", POD_NAME)
        .await
        .unwrap_err();

    assert_eq!(err, VickletError::Internal("boom".into()));
    assert_eq!(ctx.proxy.count(Op::Handle), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_gives_up_after_budget() {
    let ctx = TestContext::new();
    ctx.proxy
        .fail(Op::CommitHandle, VickletError::Conflict("busy".into()));
    let retry = RetryConfig {
        max_elapsed: Duration::from_secs(5),
        ..RetryConfig::for_conflict()
    };

    let err = PodStopper::with_retry(ctx.isolation(), retry)
        .stop("pod-1234", POD_NAME)
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert!(ctx.proxy.count(Op::CommitHandle) > 1);
}

#[tokio::test]
async fn stop_twice_is_safe() {
    let ctx = TestContext::new();
    let stopper = PodStopper::new(ctx.isolation());
    stopper.stop("pod-1234", POD_NAME).await.unwrap();
    stopper.stop("pod-1234", POD_NAME).await.unwrap();
}

// ============================================================================
// DELETE
// ============================================================================

#[tokio::test]
async fn delete_running_pod_stops_then_removes_once() {
    let ctx = TestContext::new();
    ctx.seed();
    ctx.proxy.set_backend_state("Running");

    ctx.deleter()
        .delete_pod(&fixtures::two_container_pod())
        .await
        .unwrap();

    assert_eq!(
        ctx.proxy.ops(),
        vec![
            Op::Handle,
            Op::UnbindScope,
            Op::SetState,
            Op::CommitHandle,
            Op::Remove,
        ]
    );
    assert_eq!(ctx.proxy.details(Op::Remove), vec!["pod-1234:force=true"]);
    assert!(ctx.cache.is_empty().unwrap());
}

#[tokio::test]
async fn delete_unknown_pod_makes_no_backend_calls() {
    let ctx = TestContext::new();

    let err = ctx
        .deleter()
        .delete_pod(&fixtures::two_container_pod())
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(ctx.proxy.ops().is_empty());
}

#[tokio::test]
async fn delete_failure_keeps_cache_entry() {
    let ctx = TestContext::new();
    ctx.seed();
    ctx.proxy
        .fail(Op::Remove, VickletError::Internal("vm locked".into()));

    assert!(
        ctx.deleter()
            .delete_pod(&fixtures::two_container_pod())
            .await
            .is_err()
    );
    assert_eq!(ctx.cache.len().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn forced_remove_retries_on_conflict() {
    let ctx = TestContext::new();
    ctx.seed();
    ctx.proxy
        .fail_times(Op::Remove, 2, VickletError::Conflict("in use".into()));

    ctx.deleter()
        .delete_pod(&fixtures::two_container_pod())
        .await
        .unwrap();

    assert_eq!(ctx.proxy.count(Op::Remove), 3);
    assert!(ctx.cache.is_empty().unwrap());
}

#[tokio::test]
async fn graceful_delete_refuses_starting_pod() {
    let ctx = TestContext::new();
    let vp = ctx.seed();
    ctx.proxy.set_backend_state("Starting");

    let err = ctx.deleter().delete(&vp, false).await.unwrap_err();

    assert!(matches!(err, VickletError::InvalidArgument(_)));
    assert_eq!(ctx.proxy.ops(), vec![Op::State]);
}

#[tokio::test]
async fn graceful_delete_of_running_pod_removes_once() {
    let ctx = TestContext::new();
    let vp = ctx.seed();
    ctx.proxy.set_backend_state("Running");
    ctx.proxy
        .fail(Op::Remove, VickletError::Conflict("in use".into()));

    let err = ctx.deleter().delete(&vp, false).await.unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(
        ctx.proxy.ops(),
        vec![Op::State, Op::Handle, Op::UnbindScope, Op::Remove]
    );
}

#[tokio::test]
async fn graceful_delete_of_errored_pod_stops_first() {
    let ctx = TestContext::new();
    let vp = ctx.seed();
    ctx.proxy.set_backend_state("Error");

    ctx.deleter().delete(&vp, false).await.unwrap();

    assert_eq!(
        ctx.proxy.ops(),
        vec![
            Op::State,
            Op::Handle,
            Op::UnbindScope,
            Op::SetState,
            Op::CommitHandle,
            Op::Handle,
            Op::UnbindScope,
            Op::Remove,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn graceful_delete_of_stopped_pod_retries_remove() {
    let ctx = TestContext::new();
    let vp = ctx.seed();
    ctx.proxy.set_backend_state("Stopped");
    ctx.proxy
        .fail_times(Op::Remove, 1, VickletError::Conflict("in use".into()));

    ctx.deleter().delete(&vp, false).await.unwrap();

    assert_eq!(ctx.proxy.count(Op::Remove), 2);
}
