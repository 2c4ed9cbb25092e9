//! Image metadata as returned by the persona service.

use std::str::FromStr;

use oci_client::Reference;
use serde::{Deserialize, Serialize};
use vicklet_shared::errors::{VickletError, VickletResult};

const DEFAULT_TAG: &str = "latest";

/// Metadata for a cached image. Immutable once pulled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Image id (config digest, without the `sha256:` prefix).
    pub id: String,
    /// Top filesystem layer; the namespace tasks run in.
    pub layer_id: String,
    /// Repository name the image was requested by.
    pub name: String,
    pub tags: Vec<String>,
    pub cmd: Vec<String>,
    pub entrypoint: Vec<String>,
    pub env: Vec<String>,
    pub user: String,
    pub working_dir: String,
}

/// An image reference split into repository name, tag and optional digest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRef {
    pub name: String,
    pub tag: String,
    /// `algorithm:hex`; pins the image regardless of tag.
    pub digest: Option<String>,
}

impl ImageRef {
    /// Parse `reference`, letting a non-empty `tag` override any tag it carries.
    pub fn parse(reference: &str, tag: &str) -> VickletResult<Self> {
        let parsed = Reference::from_str(reference).map_err(|e| {
            VickletError::InvalidArgument(format!("invalid image reference {:?}: {}", reference, e))
        })?;

        let mut name = reference;
        if let Some(digest) = parsed.digest() {
            name = strip_component(name, digest, '@');
        }
        if let Some(existing) = parsed.tag() {
            name = strip_component(name, existing, ':');
        }
        let name = name.to_string();

        let tag = if !tag.is_empty() {
            tag.to_string()
        } else {
            parsed.tag().unwrap_or(DEFAULT_TAG).to_string()
        };

        Ok(Self {
            name,
            tag,
            digest: parsed.digest().map(str::to_string),
        })
    }

    /// `name@digest` when pinned, otherwise `name:tag`; the form the persona
    /// service indexes by.
    pub fn full(&self) -> String {
        match &self.digest {
            Some(digest) => format!("{}@{}", self.name, digest),
            None => format!("{}:{}", self.name, self.tag),
        }
    }

    /// Value for the pull request's `tag` parameter: the digest when pinned.
    pub fn pull_tag(&self) -> &str {
        self.digest.as_deref().unwrap_or(&self.tag)
    }
}

/// Drop a trailing `<sep><component>` from `reference`.
fn strip_component<'a>(reference: &'a str, component: &str, sep: char) -> &'a str {
    reference
        .strip_suffix(component)
        .and_then(|r| r.strip_suffix(sep))
        .unwrap_or(reference)
}

pub(crate) fn strip_digest_prefix(id: &str) -> &str {
    id.strip_prefix("sha256:").unwrap_or(id)
}
