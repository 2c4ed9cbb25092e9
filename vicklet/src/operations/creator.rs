//! Pod creation: image prefetch, VM assembly on a handle chain, commit,
//! cache registration and optional start.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use vicklet_shared::errors::{VickletError, VickletResult};

use super::chain::HandleChain;
use super::container::isolation_config;
use super::starter::PodStarter;
use super::validate_pod;
use crate::cache::{CacheError, PodCache, PodKey, VicPod};
use crate::images::ImageStore;
use crate::proxy::IsolationProxy;
use crate::runtime::constants::task;

/// Pull policy that lets a missing image be fetched on demand.
const PULL_IF_NOT_PRESENT: &str = "IfNotPresent";

#[derive(Clone)]
pub struct PodCreator {
    images: Arc<dyn ImageStore>,
    proxy: Arc<dyn IsolationProxy>,
    cache: PodCache,
    starter: PodStarter,
}

impl PodCreator {
    pub fn new(
        images: Arc<dyn ImageStore>,
        proxy: Arc<dyn IsolationProxy>,
        cache: PodCache,
    ) -> Self {
        let starter = PodStarter::new(proxy.clone());
        Self {
            images,
            proxy,
            cache,
            starter,
        }
    }

    /// Create the pod VM and, when `start_after` is set, start it.
    ///
    /// The pod is cached once committed, so a failed start leaves a
    /// created-but-stopped pod that can still be deleted.
    #[tracing::instrument(skip_all, fields(pod = %PodKey::for_pod(pod)))]
    pub async fn create_pod(&self, pod: &Pod, start_after: bool) -> VickletResult<()> {
        let (name, spec) = validate_pod(pod)?;

        self.pull_pod_containers(spec).await?;
        let id = self.create_pod_vm(pod, spec).await?;
        tracing::info!(id = %id, "Pod VM committed");

        let key = PodKey::for_pod(pod);
        match self.cache.add(key.clone(), VicPod::new(&id, pod)) {
            Ok(()) => {}
            Err(CacheError::Duplicate(existing)) => {
                tracing::warn!(existing = %existing, "Pod already cached, keeping existing entry");
            }
            Err(e) => return Err(e.into()),
        }

        if start_after {
            self.starter.start(&id, name).await?;
            if let Err(e) = self.cache.set_start_time(&key, Utc::now()) {
                tracing::warn!(error = %e, "Could not record pod start time");
            }
        }

        Ok(())
    }

    /// Make every container image available, concurrently.
    ///
    /// All lookups run to completion; the first error in container order is
    /// returned. Configs are read again during assembly so that a pull
    /// failure stays distinguishable from a config read failure.
    async fn pull_pod_containers(&self, spec: &PodSpec) -> VickletResult<()> {
        let pulls = spec.containers.iter().map(|container| async move {
            let reference = container_image(container)?;
            tracing::debug!(container = %container.name, image = reference, "Pulling image");
            self.images
                .get(reference, "", realize(container))
                .await
                .map(|_| ())
        });

        join_all(pulls).await.into_iter().collect()
    }

    async fn create_pod_vm(&self, pod: &Pod, spec: &PodSpec) -> VickletResult<String> {
        let (id, handle) = self.proxy.create_handle().await?;
        let mut chain = HandleChain::new(self.proxy.as_ref(), handle);

        for (index, container) in spec.containers.iter().enumerate() {
            let image = self
                .images
                .get(container_image(container)?, "", realize(container))
                .await?;
            tracing::debug!(container = %container.name, image = ?image, "Image config");

            let config = isolation_config(pod, container, &image)?;
            tracing::debug!(container = %container.name, config = ?config, "Isolation config");

            chain
                .add_image(&container.name, &image.layer_id, &image.id, &image.name)
                .await?;

            let task_id = if index == 0 {
                id.clone()
            } else {
                task::secondary_task_id(index)
            };
            chain.add_task(&task_id, &image.layer_id, &config).await?;
            chain.add_to_scope(&config).await?;
        }

        chain.add_interaction().await?;
        chain.add_logging().await?;
        chain.commit(&id).await?;

        Ok(id)
    }
}

/// Only `IfNotPresent` lets a missing image be fetched. `Always` and an
/// unset policy require the image to be cached already.
fn realize(container: &Container) -> bool {
    container.image_pull_policy.as_deref() == Some(PULL_IF_NOT_PRESENT)
}

fn container_image(container: &Container) -> VickletResult<&str> {
    container
        .image
        .as_deref()
        .filter(|i| !i.is_empty())
        .ok_or_else(|| {
            VickletError::InvalidArgument(format!("container {} has no image", container.name))
        })
}
