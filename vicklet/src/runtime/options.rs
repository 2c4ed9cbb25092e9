//! Configuration for vicklet.
//!
//! Addresses come from a YAML file when one is given; any key the file does
//! not set falls back to the matching environment variable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vicklet_shared::errors::{VickletError, VickletResult};

use crate::runtime::constants::{envs, logging};

// ============================================================================
// Backend Endpoints
// ============================================================================

/// Backend endpoints and host identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VickletConfig {
    /// host:port of the image/persona service.
    #[serde(default)]
    pub persona_server: Option<String>,

    /// host:port of the portlayer service.
    #[serde(default)]
    pub portlayer_server: Option<String>,

    /// Hypervisor host identifier. Resolved from sysfs when absent.
    #[serde(default)]
    pub host_uuid: Option<String>,
}

impl VickletConfig {
    /// Load configuration from an optional YAML file, falling back to the
    /// process environment for unset keys.
    pub fn load(path: Option<&Path>) -> VickletResult<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Same as [`VickletConfig::load`] with an injectable environment lookup.
    pub fn load_with_env(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> VickletResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let from_env = |key: &str| non_empty(env(key));
        config.persona_server =
            non_empty(config.persona_server).or_else(|| from_env(envs::PERSONA_ADDR));
        config.portlayer_server =
            non_empty(config.portlayer_server).or_else(|| from_env(envs::PORTLAYER_ADDR));
        config.host_uuid = non_empty(config.host_uuid).or_else(|| from_env(envs::HOST_UUID));

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> VickletResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VickletError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&raw).map_err(|e| {
            VickletError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    fn validate(&self) -> VickletResult<()> {
        if self.persona_server.is_none() {
            return Err(VickletError::Config(format!(
                "persona-server not set (yaml key or {})",
                envs::PERSONA_ADDR
            )));
        }
        if self.portlayer_server.is_none() {
            return Err(VickletError::Config(format!(
                "portlayer-server not set (yaml key or {})",
                envs::PORTLAYER_ADDR
            )));
        }
        Ok(())
    }

    /// Persona address. Always set after a successful load.
    pub fn persona_addr(&self) -> &str {
        self.persona_server.as_deref().unwrap_or_default()
    }

    /// Portlayer address. Always set after a successful load.
    pub fn portlayer_addr(&self) -> &str {
        self.portlayer_server.as_deref().unwrap_or_default()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Logging Options
// ============================================================================

/// Where the log file lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub file_name: String,
    /// `RUST_LOG`-style directive used when the environment sets none.
    pub default_filter: String,
}

impl LogConfig {
    pub fn from_env() -> Self {
        let local = std::env::var(envs::LOCAL_VIRTUAL_KUBELET)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        Self::for_mode(local)
    }

    pub fn for_mode(local: bool) -> Self {
        let dir = if local {
            logging::LOCAL_LOG_DIR
        } else {
            logging::LOG_DIR
        };
        Self {
            dir: PathBuf::from(dir),
            file_name: logging::LOG_FILE.to_string(),
            default_filter: logging::DEFAULT_FILTER.to_string(),
        }
    }

    pub fn file_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

/// `1`, `t` and `true` in any case.
pub fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "t" | "true")
}
