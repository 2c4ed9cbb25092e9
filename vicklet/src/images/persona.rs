//! Client for the persona service (Docker-compatible API, version v1.35).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use vicklet_shared::errors::{VickletError, VickletResult};

use super::config::{ImageConfig, ImageRef, strip_digest_prefix};
use crate::http::{client_with_timeout, error_message, map_reqwest_error};
use crate::runtime::constants::{persona, timeouts};

/// Registry credentials forwarded opaquely in `X-Registry-Auth`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
}

impl RegistryCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Option<Self> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() && password.is_empty() {
            None
        } else {
            Some(Self { username, password })
        }
    }

    fn header_value(&self) -> VickletResult<String> {
        Ok(URL_SAFE.encode(serde_json::to_vec(self)?))
    }
}

/// Body of `POST /containers/create`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerCreateSpec {
    pub image: String,
    pub cmd: Vec<String>,
    pub env: Vec<String>,
    pub working_dir: String,
    pub user: String,
    pub tty: bool,
    pub open_stdin: bool,
    pub host_config: HostConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfig {
    pub network_mode: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            network_mode: "default".to_string(),
        }
    }
}

// ============================================================================
// Wire Models
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(rename = "Id")]
    id: String,
}

/// One message in the pull progress stream.
#[derive(Debug, Default, Deserialize)]
struct PullMessage {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "errorDetail")]
    error_detail: Option<ErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectResponse {
    id: String,
    #[serde(default)]
    repo_tags: Option<Vec<String>>,
    #[serde(default)]
    config: Option<InspectConfig>,
    #[serde(default, rename = "RootFS")]
    root_fs: Option<RootFs>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectConfig {
    #[serde(default)]
    cmd: Option<Vec<String>>,
    #[serde(default)]
    entrypoint: Option<Vec<String>>,
    #[serde(default)]
    env: Option<Vec<String>>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    working_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RootFs {
    #[serde(default)]
    layers: Vec<String>,
}

impl InspectResponse {
    fn into_image_config(self, name: &str) -> ImageConfig {
        let id = strip_digest_prefix(&self.id).to_string();
        let layer_id = self
            .root_fs
            .and_then(|fs| fs.layers.last().cloned())
            .map(|l| strip_digest_prefix(&l).to_string())
            .unwrap_or_else(|| id.clone());
        let config = self.config.unwrap_or_default();

        ImageConfig {
            id,
            layer_id,
            name: name.to_string(),
            tags: self.repo_tags.unwrap_or_default(),
            cmd: config.cmd.unwrap_or_default(),
            entrypoint: config.entrypoint.unwrap_or_default(),
            env: config.env.unwrap_or_default(),
            user: config.user.unwrap_or_default(),
            working_dir: config.working_dir.unwrap_or_default(),
        }
    }
}

/// Repository name for a listed image: its first tag without the tag suffix.
fn name_from_tags(tags: &[String]) -> String {
    tags.first()
        .and_then(|t| ImageRef::parse(t, "").ok())
        .map(|r| r.name)
        .unwrap_or_default()
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client for the persona service.
///
/// Cheap to clone; clones share the underlying connection pools.
#[derive(Clone, Debug)]
pub struct PersonaClient {
    base: String,
    http: Client,
    pull_http: Client,
}

impl PersonaClient {
    /// `addr` is the `host:port` of the persona service.
    pub fn new(addr: &str) -> VickletResult<Self> {
        Ok(Self {
            base: format!("http://{}/{}", addr, persona::API_VERSION),
            http: client_with_timeout(timeouts::REQUEST)?,
            pull_http: client_with_timeout(timeouts::PULL)?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// `GET /info`.
    #[tracing::instrument(skip(self))]
    pub async fn ping(&self) -> VickletResult<()> {
        let response = self
            .http
            .get(self.url("/info"))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if response.status().as_u16() >= 300 {
            tracing::error!(status = %response.status(), "Persona ping failed");
            return Err(VickletError::Internal("server error".to_string()));
        }
        Ok(())
    }

    /// `POST /images/create?fromImage=..&tag=..`
    ///
    /// Blocks until the pull finishes. The 200 body is a stream of JSON
    /// progress messages; an `error` in any of them fails the pull.
    #[tracing::instrument(skip(self, credentials))]
    pub async fn pull_image(
        &self,
        reference: &str,
        tag: &str,
        credentials: Option<&RegistryCredentials>,
    ) -> VickletResult<()> {
        let mut query = vec![("fromImage", reference)];
        if !tag.is_empty() {
            query.push(("tag", tag));
        }

        let mut request = self
            .pull_http
            .post(self.url("/images/create"))
            .query(&query)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(credentials) = credentials {
            request = request.header(persona::REGISTRY_AUTH_HEADER, credentials.header_value()?);
        }

        tracing::info!(reference, tag, "Pulling image");
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = error_message(response).await;
            tracing::error!(reference, %status, %message, "Image pull failed");
            return Err(VickletError::ImageFetch(format!(
                "pull {}: status {}: {}",
                reference,
                status.as_u16(),
                message
            )));
        }

        let body = response.text().await.map_err(map_reqwest_error)?;
        check_pull_stream(reference, &body)
    }

    /// `GET /images/{ref}/json`.
    #[tracing::instrument(skip(self))]
    pub async fn inspect_image(&self, image: &ImageRef) -> VickletResult<ImageConfig> {
        let path = format!("/images/{}/json", urlencoding::encode(&image.full()));
        let response = self
            .http
            .get(self.url(&path))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(VickletError::NotFound(format!("image {}", image.full())));
        }
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(VickletError::Internal(format!(
                "inspect {}: {}",
                image.full(),
                message
            )));
        }

        let inspect: InspectResponse = response.json().await.map_err(map_reqwest_error)?;
        Ok(inspect.into_image_config(&image.name))
    }

    /// `GET /images/json`.
    #[tracing::instrument(skip(self))]
    pub async fn list_images(&self) -> VickletResult<Vec<ImageConfig>> {
        let response = self
            .http
            .get(self.url("/images/json"))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            let message = error_message(response).await;
            return Err(VickletError::Internal(format!("list images: {}", message)));
        }

        let listed: Vec<InspectResponse> = response.json().await.map_err(map_reqwest_error)?;
        Ok(listed
            .into_iter()
            .map(|image| {
                let name = name_from_tags(image.repo_tags.as_deref().unwrap_or_default());
                image.into_image_config(&name)
            })
            .collect())
    }

    /// `POST /containers/create` followed by `POST /containers/{id}/start`.
    ///
    /// Returns the id of the started container.
    #[tracing::instrument(skip(self, spec), fields(image = %spec.image))]
    pub async fn create_container(&self, spec: &ContainerCreateSpec) -> VickletResult<String> {
        let response = self
            .http
            .post(self.url("/containers/create"))
            .json(spec)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if response.status().as_u16() >= 300 {
            let status = response.status();
            let message = error_message(response).await;
            tracing::error!(%status, %message, "Container create failed");
            return Err(VickletError::from_status(status.as_u16(), message));
        }

        let created: CreateResponse = response.json().await.map_err(map_reqwest_error)?;
        tracing::info!(container_id = %created.id, "Starting container");

        let response = self
            .http
            .post(self.url(&format!("/containers/{}/start", created.id)))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if response.status().as_u16() >= 300 {
            let status = response.status();
            let message = error_message(response).await;
            return Err(VickletError::from_status(status.as_u16(), message));
        }

        Ok(created.id)
    }
}

/// Scan the pull progress stream for an error message.
fn check_pull_stream(reference: &str, body: &str) -> VickletResult<()> {
    let messages = serde_json::Deserializer::from_str(body).into_iter::<PullMessage>();
    for message in messages {
        let message = match message {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(reference, error = %e, "Unparseable pull progress message");
                break;
            }
        };

        let error = message
            .error
            .or_else(|| message.error_detail.and_then(|d| d.message));
        if let Some(error) = error {
            return Err(VickletError::ImageFetch(format!("pull {}: {}", reference, error)));
        }
        if let Some(status) = message.status {
            tracing::debug!(reference, %status, "Pull progress");
        }
    }
    Ok(())
}
