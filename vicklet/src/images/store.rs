//! Image store contract consumed by pod operations.

use async_trait::async_trait;
use vicklet_shared::errors::{VickletError, VickletResult};

use super::config::{ImageConfig, ImageRef};
use super::persona::{PersonaClient, RegistryCredentials};

/// Access to images known to the backend.
///
/// Implementations must be safe to call concurrently; pulls of the same
/// image may race and the backend deduplicates them.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Image config for `reference`.
    ///
    /// When the image is absent and `realize` is set, it is pulled and the
    /// config read again. When absent and `realize` is not set, the lookup
    /// fails with `NotFound`.
    async fn get(&self, reference: &str, tag: &str, realize: bool) -> VickletResult<ImageConfig>;

    /// Every image the backend has cached.
    async fn get_images(&self) -> VickletResult<Vec<ImageConfig>>;

    /// Ask the backend to fetch an image. Empty credentials pull anonymously.
    async fn pull_image(
        &self,
        reference: &str,
        tag: &str,
        username: &str,
        password: &str,
    ) -> VickletResult<()>;
}

/// Image store backed by the persona service.
#[derive(Clone, Debug)]
pub struct PersonaImageStore {
    client: PersonaClient,
}

impl PersonaImageStore {
    pub fn new(client: PersonaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageStore for PersonaImageStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, reference: &str, tag: &str, realize: bool) -> VickletResult<ImageConfig> {
        let image = ImageRef::parse(reference, tag)?;

        match self.client.inspect_image(&image).await {
            Ok(config) => return Ok(config),
            Err(e) if e.is_not_found() && realize => {
                tracing::debug!(image = %image.full(), "Image not cached, pulling");
            }
            Err(e) => return Err(e),
        }

        self.pull_image(&image.name, image.pull_tag(), "", "").await?;

        self.client.inspect_image(&image).await.map_err(|e| {
            if e.is_not_found() {
                VickletError::ImageFetch(format!("image {} missing after pull", image.full()))
            } else {
                e
            }
        })
    }

    async fn get_images(&self) -> VickletResult<Vec<ImageConfig>> {
        self.client.list_images().await
    }

    async fn pull_image(
        &self,
        reference: &str,
        tag: &str,
        username: &str,
        password: &str,
    ) -> VickletResult<()> {
        let credentials = RegistryCredentials::new(username, password);
        self.client
            .pull_image(reference, tag, credentials.as_ref())
            .await
    }
}
