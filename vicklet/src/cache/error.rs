//! Pod cache failures.

use thiserror::Error;
use vicklet_shared::errors::VickletError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("pod name is empty")]
    EmptyName,

    #[error("pod {0} already cached")]
    Duplicate(String),

    #[error("pod {0} not found in cache")]
    NotFound(String),

    #[error("pod cache lock poisoned: {0}")]
    Poisoned(String),
}

impl From<CacheError> for VickletError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::EmptyName => VickletError::InvalidArgument(err.to_string()),
            CacheError::Duplicate(_) => VickletError::AlreadyExists(err.to_string()),
            CacheError::NotFound(_) => VickletError::NotFound(err.to_string()),
            CacheError::Poisoned(_) => VickletError::Internal(err.to_string()),
        }
    }
}
