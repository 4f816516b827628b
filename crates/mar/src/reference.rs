//! Package image reference parsing.

use std::str::FromStr;

use mar_common::{MarError, MarResult};

/// A parsed application package reference.
///
/// The raw string is what gets handed to the container runtime; the parsed
/// parts are only used for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    raw: String,
    /// Registry hostname.
    pub registry: String,
    /// Repository name.
    pub repository: String,
    /// Tag or digest.
    pub reference: ImageTag,
}

/// Image tag or digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTag {
    /// A tag (e.g., "latest").
    Tag(String),
    /// A digest (e.g., "sha256:abc123...").
    Digest(String),
}

impl ImageReference {
    /// Default registry.
    pub const DEFAULT_REGISTRY: &'static str = "docker.io";
    /// Default tag.
    pub const DEFAULT_TAG: &'static str = "latest";

    /// Parse a package reference string.
    ///
    /// Examples:
    /// - `my-app` -> docker.io/library/my-app:latest
    /// - `my-app:1.0` -> docker.io/library/my-app:1.0
    /// - `localhost:5000/seg-app` -> localhost:5000/seg-app:latest
    /// - `ghcr.io/org/app@sha256:...` -> pinned by digest
    ///
    /// # Errors
    ///
    /// Returns [`MarError::InvalidReference`] for empty references, references
    /// containing whitespace or control characters, and references starting
    /// with `-` (which the runtime would read as an option).
    pub fn parse(reference: &str) -> MarResult<Self> {
        let invalid = |reason: &str| MarError::InvalidReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        let raw = reference;
        if raw.is_empty() {
            return Err(invalid("reference is empty"));
        }
        if raw.starts_with('-') {
            return Err(invalid("reference must not start with '-'"));
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("reference must not contain whitespace"));
        }

        let (name, tag) = if let Some(idx) = raw.find('@') {
            let (name, digest) = raw.split_at(idx);
            if digest.len() == 1 {
                return Err(invalid("digest is empty"));
            }
            (name, ImageTag::Digest(digest[1..].to_string()))
        } else if let Some(idx) = raw.rfind(':') {
            // registry:port/image carries no tag
            let potential_tag = &raw[idx + 1..];
            if potential_tag.contains('/') {
                (raw, ImageTag::Tag(Self::DEFAULT_TAG.to_string()))
            } else if potential_tag.is_empty() {
                return Err(invalid("tag is empty"));
            } else {
                let (name, tag) = raw.split_at(idx);
                (name, ImageTag::Tag(tag[1..].to_string()))
            }
        } else {
            (raw, ImageTag::Tag(Self::DEFAULT_TAG.to_string()))
        };

        if name.is_empty() {
            return Err(invalid("repository name is empty"));
        }

        let (registry, repository) = match name.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (first.to_string(), rest.to_string())
            }
            Some(_) => (Self::DEFAULT_REGISTRY.to_string(), name.to_string()),
            None => (
                Self::DEFAULT_REGISTRY.to_string(),
                format!("library/{name}"),
            ),
        };

        Ok(Self {
            raw: raw.to_string(),
            registry,
            repository,
            reference: tag,
        })
    }

    /// The reference exactly as supplied by the caller.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Get the fully qualified reference string.
    #[must_use]
    pub fn full_reference(&self) -> String {
        let tag = match &self.reference {
            ImageTag::Tag(t) => format!(":{t}"),
            ImageTag::Digest(d) => format!("@{d}"),
        };
        format!("{}/{}{}", self.registry, self.repository, tag)
    }
}

impl FromStr for ImageReference {
    type Err = MarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
