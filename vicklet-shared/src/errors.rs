//! Error taxonomy for the pod lifecycle engine.
//!
//! Every backend fault is folded into one of the kinds below. Only
//! [`VickletError::Conflict`] is eligible for retry; callers decide that with
//! [`VickletError::is_conflict`].

use thiserror::Error;

/// Result alias used across the vicklet crates.
pub type VickletResult<T> = Result<T, VickletError>;

// ============================================================================
// Top-Level Error
// ============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VickletError {
    /// Caller supplied something unusable (missing pod, empty name, conflicting flags).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Pod missing from the cache, or backend entity missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Name already registered in the pod cache.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Backend rejected the request because of a concurrent state change.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend rejected the request as malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Any other backend failure.
    #[error("internal server error: {0}")]
    Internal(String),

    /// Image pull returned non-success, or image config missing after pull.
    #[error("image fetch: {0}")]
    ImageFetch(String),

    /// HTTP timeout or connection failure.
    #[error("transport: {0}")]
    Transport(String),

    /// Configuration could not be loaded or is incomplete.
    #[error("config: {0}")]
    Config(String),

    /// A backend endpoint never answered the readiness probe.
    #[error("server not ready: {0}")]
    ServerNotReady(String),
}

impl VickletError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, VickletError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, VickletError::NotFound(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, VickletError::Transport(_))
    }

    pub fn is_server_not_ready(&self) -> bool {
        matches!(self, VickletError::ServerNotReady(_))
    }

    /// Translate an HTTP status returned by the portlayer into an error kind.
    ///
    /// 404, 409 and 400 have dedicated kinds; everything else is internal.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => VickletError::NotFound(message),
            409 => VickletError::Conflict(message),
            400 => VickletError::BadRequest(message),
            _ => VickletError::Internal(message),
        }
    }
}

impl From<serde_json::Error> for VickletError {
    fn from(err: serde_json::Error) -> Self {
        VickletError::Internal(format!("json: {}", err))
    }
}

impl From<std::io::Error> for VickletError {
    fn from(err: std::io::Error) -> Self {
        VickletError::Internal(format!("io: {}", err))
    }
}
