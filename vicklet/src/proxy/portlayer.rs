//! HTTP client for the portlayer service.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use vicklet_shared::errors::{VickletError, VickletResult};

use super::config::{IsolationContainerConfig, NetworkConfig, TaskJoinConfig};
use super::isolation::{Endpoint, Handle, IsolationProxy};
use super::models::{
    BindContainerResponse, ContainerCreateConfig, ContainerCreatedInfo, ContainerInfo,
    HandleConfig, HandleResponse, ImageJoinConfig, ImageStoreRef, ScopesAddContainerConfig,
    StateChangeConfig, TaskBindConfig, VchInfo,
};
use super::system::SystemProxy;
use crate::http::{client_with_timeout, error_message, map_reqwest_error};
use crate::runtime::constants::{handle_defaults, timeouts};

/// Portlayer REST client.
///
/// Stateless apart from the connection pool; clones share it.
#[derive(Clone, Debug)]
pub struct PortLayerClient {
    base: String,
    http: Client,
    /// Image store name; the hypervisor host UUID.
    host_uuid: String,
}

fn seg(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

impl PortLayerClient {
    /// `addr` is the `host:port` of the portlayer service.
    pub fn new(addr: &str, host_uuid: impl Into<String>) -> VickletResult<Self> {
        Ok(Self {
            base: format!("http://{}", addr),
            http: client_with_timeout(timeouts::REQUEST)?,
            host_uuid: host_uuid.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Send a request and map non-2xx statuses into the error taxonomy.
    async fn execute(&self, request: RequestBuilder, what: &str) -> VickletResult<Response> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = error_message(response).await;
        tracing::debug!(operation = what, status = status.as_u16(), %message, "Portlayer call failed");
        Err(VickletError::from_status(
            status.as_u16(),
            format!("{}: {}", what, message),
        ))
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> VickletResult<T> {
        self.execute(request, what)
            .await?
            .json::<T>()
            .await
            .map_err(|e| VickletError::Internal(format!("{}: malformed response: {}", what, e)))
    }

    async fn handle_call(&self, request: RequestBuilder, what: &str) -> VickletResult<Handle> {
        let response: HandleResponse = self.execute_json(request, what).await?;
        Ok(Handle::new(response.handle))
    }

    async fn container_info(&self, id: &str) -> VickletResult<ContainerInfo> {
        let request = self.http.get(self.url(&format!("/containers/{}/info", seg(id))));
        self.execute_json(request, "container info").await
    }
}

#[async_trait]
impl IsolationProxy for PortLayerClient {
    #[tracing::instrument(skip(self))]
    async fn create_handle(&self) -> VickletResult<(String, Handle)> {
        let config = ContainerCreateConfig {
            num_cpus: handle_defaults::NUM_CPUS,
            memory_mb: handle_defaults::MEMORY_MB,
            layer: handle_defaults::LAYER_ID.to_string(),
            image: handle_defaults::IMAGE_ID.to_string(),
            repo_name: handle_defaults::REPO_NAME.to_string(),
            name: String::new(),
            image_store: ImageStoreRef {
                name: self.host_uuid.clone(),
            },
            network_disabled: true,
            hostname: handle_defaults::HOSTNAME.to_string(),
        };
        tracing::debug!(?config, "Creating pod handle");

        let request = self.http.post(self.url("/containers")).json(&config);
        let created: ContainerCreatedInfo =
            self.execute_json(request, "create handle").await.map_err(|e| match e {
                VickletError::NotFound(_) => {
                    VickletError::NotFound(format!("No such image: {}", handle_defaults::IMAGE_ID))
                }
                other => other,
            })?;

        Ok((created.id, Handle::new(created.handle)))
    }

    #[tracing::instrument(skip(self))]
    async fn add_image_to_handle(
        &self,
        handle: Handle,
        delta_id: &str,
        layer_id: &str,
        image_id: &str,
        image_name: &str,
    ) -> VickletResult<Handle> {
        let path = format!(
            "/storage/{}/images/{}/join",
            seg(&self.host_uuid),
            seg(layer_id)
        );
        let body = ImageJoinConfig {
            handle: handle.as_str().to_string(),
            delta_id: delta_id.to_string(),
            image_id: image_id.to_string(),
            repo_name: image_name.to_string(),
        };
        self.handle_call(self.http.post(self.url(&path)).json(&body), "image join")
            .await
    }

    #[tracing::instrument(skip(self, config), fields(container = %config.name))]
    async fn create_handle_task(
        &self,
        handle: Handle,
        task_id: &str,
        layer_id: &str,
        config: &IsolationContainerConfig,
    ) -> VickletResult<Handle> {
        let task = TaskJoinConfig::from_isolation_config(handle.as_str(), task_id, layer_id, config)?;
        tracing::debug!(?task, "Joining task");

        let joined = self
            .handle_call(self.http.post(self.url("/tasks")).json(&task), "task join")
            .await?;

        let bind = TaskBindConfig {
            handle: joined.as_str().to_string(),
            id: task_id.to_string(),
        };
        self.handle_call(self.http.post(self.url("/tasks/bind")).json(&bind), "task bind")
            .await
    }

    #[tracing::instrument(skip(self, config), fields(container = %config.name))]
    async fn add_handle_to_scope(
        &self,
        handle: Handle,
        config: &IsolationContainerConfig,
    ) -> VickletResult<Handle> {
        let network_config = NetworkConfig::from_isolation_config(config);
        let path = format!("/scopes/{}/containers", seg(&network_config.network_name));
        let body = ScopesAddContainerConfig {
            handle: handle.as_str().to_string(),
            network_config,
        };

        let request = self.http.post(self.url(&path)).json(&body);
        let next: String = self.execute_json(request, "scope add").await.map_err(|e| {
            tracing::error!(error = %e, "Adding container to scope failed");
            e
        })?;
        Ok(Handle::new(next))
    }

    #[tracing::instrument(skip(self))]
    async fn remove_handle_from_scope(&self, handle: &Handle, scope: &str) -> VickletResult<()> {
        let path = format!("/scopes/{}/containers/{}", seg(scope), seg(handle.as_str()));
        self.execute(self.http.delete(self.url(&path)), "scope remove")
            .await
            .map(|_| ())
    }

    #[tracing::instrument(skip(self))]
    async fn add_interaction_to_handle(&self, handle: Handle) -> VickletResult<Handle> {
        let body = HandleConfig {
            handle: handle.as_str().to_string(),
        };
        self.handle_call(
            self.http.post(self.url("/interaction/join")).json(&body),
            "interaction join",
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn add_logging_to_handle(&self, handle: Handle) -> VickletResult<Handle> {
        let body = HandleConfig {
            handle: handle.as_str().to_string(),
        };
        self.handle_call(
            self.http.post(self.url("/logging/join")).json(&body),
            "logging join",
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn commit_handle(
        &self,
        handle: Handle,
        pod_id: &str,
        wait_time: i32,
    ) -> VickletResult<()> {
        let mut request = self
            .http
            .put(self.url(&format!("/containers/{}", seg(handle.as_str()))));
        if wait_time > 0 {
            request = request.query(&[("wait", wait_time)]);
        }

        self.execute(request, "commit")
            .await
            .map(|_| ())
            .map_err(|e| match e {
                VickletError::NotFound(_) => VickletError::NotFound(pod_id.to_string()),
                other => other,
            })
    }

    #[tracing::instrument(skip(self))]
    async fn bind_scope(
        &self,
        handle: Handle,
        name: &str,
    ) -> VickletResult<(Handle, Vec<Endpoint>)> {
        let path = format!("/scopes/bind/{}", seg(handle.as_str()));
        let response: BindContainerResponse = self
            .execute_json(self.http.post(self.url(&path)), "scope bind")
            .await
            .map_err(|e| not_found_as(e, name))?;
        Ok((Handle::new(response.handle), response.endpoints))
    }

    #[tracing::instrument(skip(self))]
    async fn unbind_scope(
        &self,
        handle: Handle,
        name: &str,
    ) -> VickletResult<(Handle, Vec<Endpoint>)> {
        let path = format!("/scopes/unbind/{}", seg(handle.as_str()));
        let response: BindContainerResponse = self
            .execute_json(self.http.post(self.url(&path)), "scope unbind")
            .await
            .map_err(|e| not_found_as(e, name))?;
        Ok((Handle::new(response.handle), response.endpoints))
    }

    #[tracing::instrument(skip(self))]
    async fn set_state(&self, handle: Handle, name: &str, state: &str) -> VickletResult<Handle> {
        let path = format!("/containers/{}/state", seg(handle.as_str()));
        let body = StateChangeConfig {
            state: state.to_string(),
        };
        let next: String = self
            .execute_json(self.http.put(self.url(&path)).json(&body), "state change")
            .await
            .map_err(|e| not_found_as(e, name))?;
        Ok(Handle::new(next))
    }

    #[tracing::instrument(skip(self))]
    async fn handle(&self, id: &str, name: &str) -> VickletResult<Handle> {
        let request = self.http.get(self.url(&format!("/containers/{}", seg(id))));
        let handle: String = self
            .execute_json(request, "get handle")
            .await
            .map_err(|e| not_found_as(e, name))?;
        Ok(Handle::new(handle))
    }

    #[tracing::instrument(skip(self))]
    async fn state(&self, id: &str, name: &str) -> VickletResult<String> {
        let info = self
            .container_info(id)
            .await
            .map_err(|e| not_found_as(e, name))?;
        Ok(info.container_config.state)
    }

    #[tracing::instrument(skip(self))]
    async fn ep_addresses(&self, id: &str, name: &str) -> VickletResult<Vec<String>> {
        let info = self
            .container_info(id)
            .await
            .map_err(|e| not_found_as(e, name))?;
        Ok(info
            .endpoints
            .into_iter()
            .map(|ep| ep.address)
            .filter(|a| !a.is_empty())
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, id: &str, force: bool) -> VickletResult<()> {
        let request = self
            .http
            .delete(self.url(&format!("/containers/{}", seg(id))))
            .query(&[("force", force)]);
        self.execute(request, "remove").await.map(|_| ())
    }
}

#[async_trait]
impl SystemProxy for PortLayerClient {
    async fn ping(&self) -> VickletResult<()> {
        self.execute(self.http.get(self.url("/_ping")), "ping")
            .await
            .map(|_| ())
    }

    async fn vch_info(&self) -> VickletResult<VchInfo> {
        self.execute_json(self.http.get(self.url("/system/vchinfo")), "vch info")
            .await
    }
}

/// Report a missing entity by the pod name the caller knows it as.
fn not_found_as(err: VickletError, name: &str) -> VickletError {
    match err {
        VickletError::NotFound(_) => VickletError::NotFound(name.to_string()),
        other => other,
    }
}
