use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use vicklet::proxy::{Endpoint, Handle, IsolationContainerConfig, IsolationProxy};
use vicklet_shared::errors::{VickletError, VickletResult};

/// Isolation proxy operation, one per trait method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CreateHandle,
    AddImageToHandle,
    CreateHandleTask,
    AddHandleToScope,
    RemoveHandleFromScope,
    AddInteractionToHandle,
    AddLoggingToHandle,
    CommitHandle,
    BindScope,
    UnbindScope,
    SetState,
    Handle,
    State,
    EpAddresses,
    Remove,
}

/// A recorded call. `detail` carries the argument most tests key on:
/// container name, task id, target state or scope name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub handle: Option<String>,
    pub detail: String,
}

#[derive(Debug, Clone)]
struct Failure {
    error: VickletError,
    /// Only calls whose detail matches fail.
    detail: Option<String>,
    /// Remaining failures; `None` fails forever.
    remaining: Option<u32>,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    failures: HashMap<Op, Vec<Failure>>,
    next_handle: u64,
    backend_state: String,
    ep_addresses: Vec<String>,
    task_configs: Vec<(String, IsolationContainerConfig)>,
}

/// In-memory portlayer that hands out sequential handles.
#[derive(Debug)]
pub struct FakeIsolationProxy {
    pod_id: String,
    state: Mutex<State>,
}

impl Default for FakeIsolationProxy {
    fn default() -> Self {
        Self::new("pod-1234")
    }
}

impl FakeIsolationProxy {
    pub fn new(pod_id: impl Into<String>) -> Self {
        Self {
            pod_id: pod_id.into(),
            state: Mutex::new(State {
                backend_state: "Running".into(),
                ep_addresses: vec!["10.0.0.2/24".into()],
                ..Default::default()
            }),
        }
    }

    pub fn pod_id(&self) -> &str {
        &self.pod_id
    }

    /// Fail every call to `op`.
    pub fn fail(&self, op: Op, error: VickletError) {
        self.push_failure(op, error, None, None);
    }

    /// Fail the next `times` calls to `op`.
    pub fn fail_times(&self, op: Op, times: u32, error: VickletError) {
        self.push_failure(op, error, None, Some(times));
    }

    /// Fail calls to `op` whose detail equals `detail`.
    pub fn fail_for(&self, op: Op, detail: &str, error: VickletError) {
        self.push_failure(op, error, Some(detail.to_string()), None);
    }

    fn push_failure(&self, op: Op, error: VickletError, detail: Option<String>, remaining: Option<u32>) {
        self.state.lock().failures.entry(op).or_default().push(Failure {
            error,
            detail,
            remaining,
        });
    }

    pub fn set_backend_state(&self, state: &str) {
        self.state.lock().backend_state = state.to_string();
    }

    pub fn set_ep_addresses(&self, addresses: Vec<String>) {
        self.state.lock().ep_addresses = addresses;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().calls.iter().map(|c| c.op).collect()
    }

    pub fn count(&self, op: Op) -> usize {
        self.state.lock().calls.iter().filter(|c| c.op == op).count()
    }

    /// Details recorded for `op`, in call order.
    pub fn details(&self, op: Op) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.op == op)
            .map(|c| c.detail.clone())
            .collect()
    }

    /// Container configs passed to CreateHandleTask, keyed by task id.
    pub fn task_configs(&self) -> Vec<(String, IsolationContainerConfig)> {
        self.state.lock().task_configs.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Record the call and return the injected failure, if any.
    fn record(&self, op: Op, handle: Option<&Handle>, detail: &str) -> VickletResult<()> {
        let mut state = self.state.lock();
        state.calls.push(Call {
            op,
            handle: handle.map(|h| h.as_str().to_string()),
            detail: detail.to_string(),
        });

        let Some(failures) = state.failures.get_mut(&op) else {
            return Ok(());
        };
        let matching = failures.iter_mut().find(|f| {
            f.remaining != Some(0) && f.detail.as_deref().is_none_or(|d| d == detail)
        });
        match matching {
            Some(failure) => {
                if let Some(n) = failure.remaining.as_mut() {
                    *n -= 1;
                }
                Err(failure.error.clone())
            }
            None => Ok(()),
        }
    }

    fn next_handle(&self) -> Handle {
        let mut state = self.state.lock();
        state.next_handle += 1;
        Handle::new(format!("handle-{}", state.next_handle))
    }
}

#[async_trait]
impl IsolationProxy for FakeIsolationProxy {
    async fn create_handle(&self) -> VickletResult<(String, Handle)> {
        self.record(Op::CreateHandle, None, "")?;
        Ok((self.pod_id.clone(), self.next_handle()))
    }

    async fn add_image_to_handle(
        &self,
        handle: Handle,
        delta_id: &str,
        _layer_id: &str,
        _image_id: &str,
        _image_name: &str,
    ) -> VickletResult<Handle> {
        self.record(Op::AddImageToHandle, Some(&handle), delta_id)?;
        Ok(self.next_handle())
    }

    async fn create_handle_task(
        &self,
        handle: Handle,
        task_id: &str,
        _layer_id: &str,
        config: &IsolationContainerConfig,
    ) -> VickletResult<Handle> {
        self.record(Op::CreateHandleTask, Some(&handle), task_id)?;
        self.state
            .lock()
            .task_configs
            .push((task_id.to_string(), config.clone()));
        Ok(self.next_handle())
    }

    async fn add_handle_to_scope(
        &self,
        handle: Handle,
        config: &IsolationContainerConfig,
    ) -> VickletResult<Handle> {
        self.record(Op::AddHandleToScope, Some(&handle), &config.name)?;
        Ok(self.next_handle())
    }

    async fn remove_handle_from_scope(&self, handle: &Handle, scope: &str) -> VickletResult<()> {
        self.record(Op::RemoveHandleFromScope, Some(handle), scope)
    }

    async fn add_interaction_to_handle(&self, handle: Handle) -> VickletResult<Handle> {
        self.record(Op::AddInteractionToHandle, Some(&handle), "")?;
        Ok(self.next_handle())
    }

    async fn add_logging_to_handle(&self, handle: Handle) -> VickletResult<Handle> {
        self.record(Op::AddLoggingToHandle, Some(&handle), "")?;
        Ok(self.next_handle())
    }

    async fn commit_handle(
        &self,
        handle: Handle,
        pod_id: &str,
        _wait_time: i32,
    ) -> VickletResult<()> {
        self.record(Op::CommitHandle, Some(&handle), pod_id)
    }

    async fn bind_scope(
        &self,
        handle: Handle,
        name: &str,
    ) -> VickletResult<(Handle, Vec<Endpoint>)> {
        self.record(Op::BindScope, Some(&handle), name)?;
        Ok((self.next_handle(), vec![Endpoint::default()]))
    }

    async fn unbind_scope(
        &self,
        handle: Handle,
        name: &str,
    ) -> VickletResult<(Handle, Vec<Endpoint>)> {
        self.record(Op::UnbindScope, Some(&handle), name)?;
        Ok((self.next_handle(), Vec::new()))
    }

    async fn set_state(&self, handle: Handle, _name: &str, state: &str) -> VickletResult<Handle> {
        self.record(Op::SetState, Some(&handle), state)?;
        Ok(self.next_handle())
    }

    async fn handle(&self, id: &str, _name: &str) -> VickletResult<Handle> {
        self.record(Op::Handle, None, id)?;
        Ok(self.next_handle())
    }

    async fn state(&self, id: &str, _name: &str) -> VickletResult<String> {
        self.record(Op::State, None, id)?;
        Ok(self.state.lock().backend_state.clone())
    }

    async fn ep_addresses(&self, id: &str, _name: &str) -> VickletResult<Vec<String>> {
        self.record(Op::EpAddresses, None, id)?;
        Ok(self.state.lock().ep_addresses.clone())
    }

    async fn remove(&self, id: &str, force: bool) -> VickletResult<()> {
        self.record(Op::Remove, None, &format!("{}:force={}", id, force))
    }
}
