//! Thread-safe pod cache implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;

use super::CacheError;

/// Cache key: `(namespace, name)`.
///
/// An absent namespace is stored as the empty string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PodKey {
    pub namespace: String,
    pub name: String,
}

impl PodKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key for a pod object, from its metadata.
    pub fn for_pod(pod: &Pod) -> Self {
        Self::new(
            pod.metadata.namespace.clone().unwrap_or_default(),
            pod.metadata.name.clone().unwrap_or_default(),
        )
    }
}

impl fmt::Display for PodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// A pod the backend has realized.
#[derive(Clone, Debug, PartialEq)]
pub struct VicPod {
    /// Backend pod id assigned at CreateHandle.
    pub id: String,
    /// Pod spec as accepted by CreatePod.
    pub pod: Pod,
    /// Most recent successful start.
    pub start_time: Option<DateTime<Utc>>,
}

impl VicPod {
    pub fn new(id: impl Into<String>, pod: &Pod) -> Self {
        Self {
            id: id.into(),
            pod: pod.clone(),
            start_time: None,
        }
    }

    pub fn name(&self) -> &str {
        self.pod.metadata.name.as_deref().unwrap_or_default()
    }
}

/// Thread-safe registry of realized pods.
///
/// Cloneable; all clones share one map behind a single mutex, so every
/// read and write is exclusive.
#[derive(Clone, Debug, Default)]
pub struct PodCache {
    inner: Arc<Mutex<HashMap<PodKey, VicPod>>>,
}

impl PodCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<PodKey, VicPod>>, CacheError> {
        self.inner
            .lock()
            .map_err(|e| CacheError::Poisoned(e.to_string()))
    }

    /// Insert a pod.
    ///
    /// # Errors
    ///
    /// `EmptyName` for an empty name, `Duplicate` if the key or the backend
    /// id is already cached.
    pub fn add(&self, key: PodKey, pod: VicPod) -> Result<(), CacheError> {
        if key.name.is_empty() {
            return Err(CacheError::EmptyName);
        }

        let mut pods = self.lock()?;
        if pods.contains_key(&key) {
            return Err(CacheError::Duplicate(key.to_string()));
        }
        if pods.values().any(|cached| cached.id == pod.id) {
            return Err(CacheError::Duplicate(format!("{} (backend id {})", key, pod.id)));
        }

        tracing::debug!(pod = %key, pod_id = %pod.id, "Caching pod");
        pods.insert(key, pod);
        Ok(())
    }

    /// Look up a pod, returning a copy.
    pub fn get(&self, key: &PodKey) -> Result<VicPod, CacheError> {
        if key.name.is_empty() {
            return Err(CacheError::EmptyName);
        }

        self.lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    /// Snapshot of every cached pod, in no particular order.
    pub fn get_all(&self) -> Result<Vec<VicPod>, CacheError> {
        Ok(self.lock()?.values().cloned().collect())
    }

    /// Remove a pod. Absent keys are not an error.
    pub fn delete(&self, key: &PodKey) -> Result<Option<VicPod>, CacheError> {
        if key.name.is_empty() {
            return Err(CacheError::EmptyName);
        }

        let removed = self.lock()?.remove(key);
        if removed.is_some() {
            tracing::debug!(pod = %key, "Removed pod from cache");
        }
        Ok(removed)
    }

    /// Record the time of a successful start.
    pub fn set_start_time(&self, key: &PodKey, time: DateTime<Utc>) -> Result<(), CacheError> {
        let mut pods = self.lock()?;
        let pod = pods
            .get_mut(key)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
        pod.start_time = Some(time);
        Ok(())
    }

    /// Repopulate from the backend after a restart.
    ///
    /// The backend does not keep the Kubernetes pod spec, so there is nothing
    /// to rebuild entries from; the cache starts empty and fills as the
    /// controller re-issues CreatePod.
    pub fn rehydrate(&self) -> Result<(), CacheError> {
        let count = self.lock()?.len();
        tracing::info!(cached = count, "Pod cache rehydrate skipped, backend holds no pod specs");
        Ok(())
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.lock()?.is_empty())
    }
}
