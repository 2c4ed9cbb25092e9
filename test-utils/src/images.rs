use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Barrier;
use vicklet::images::{ImageConfig, ImageStore};
use vicklet_shared::errors::{VickletError, VickletResult};

/// A recorded image lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLookup {
    pub reference: String,
    pub realize: bool,
}

/// Image store serving configs from memory.
///
/// Unknown references fail with `NotFound`. With a barrier installed the
/// first `n` lookups each wait until all `n` are in flight, so callers that
/// issue them one at a time hang.
#[derive(Default)]
pub struct FakeImageStore {
    images: Mutex<HashMap<String, ImageConfig>>,
    errors: Mutex<HashMap<String, VickletError>>,
    lookups: Mutex<Vec<ImageLookup>>,
    pulls: Mutex<Vec<String>>,
    barrier: Mutex<Option<(Arc<Barrier>, usize)>>,
}

impl FakeImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(self, reference: &str, config: ImageConfig) -> Self {
        self.images.lock().insert(reference.to_string(), config);
        self
    }

    pub fn with_error(self, reference: &str, error: VickletError) -> Self {
        self.errors.lock().insert(reference.to_string(), error);
        self
    }

    /// Require `n` concurrent lookups before any of them returns.
    pub fn with_barrier(self, n: usize) -> Self {
        *self.barrier.lock() = Some((Arc::new(Barrier::new(n)), n));
        self
    }

    pub fn lookups(&self) -> Vec<ImageLookup> {
        self.lookups.lock().clone()
    }

    pub fn pulls(&self) -> Vec<String> {
        self.pulls.lock().clone()
    }
}

#[async_trait]
impl ImageStore for FakeImageStore {
    async fn get(&self, reference: &str, _tag: &str, realize: bool) -> VickletResult<ImageConfig> {
        self.lookups.lock().push(ImageLookup {
            reference: reference.to_string(),
            realize,
        });

        let barrier = {
            let mut slot = self.barrier.lock();
            match slot.as_mut() {
                Some((barrier, remaining)) if *remaining > 0 => {
                    *remaining -= 1;
                    Some(barrier.clone())
                }
                _ => None,
            }
        };
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        if let Some(err) = self.errors.lock().get(reference) {
            return Err(err.clone());
        }
        self.images
            .lock()
            .get(reference)
            .cloned()
            .ok_or_else(|| VickletError::NotFound(format!("image {} not cached", reference)))
    }

    async fn get_images(&self) -> VickletResult<Vec<ImageConfig>> {
        Ok(self.images.lock().values().cloned().collect())
    }

    async fn pull_image(
        &self,
        reference: &str,
        _tag: &str,
        _username: &str,
        _password: &str,
    ) -> VickletResult<()> {
        self.pulls.lock().push(reference.to_string());
        Ok(())
    }
}
