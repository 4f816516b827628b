//! Container runtime abstraction.
//!
//! The launcher never implements a runtime itself; it drives an external
//! CLI (Docker or a compatible one) through the [`ContainerRuntime`] seam.
//! Every invocation is an explicit argument vector built by [`RunSpec`].

mod cli;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use mar_common::{MarError, MarResult};

use crate::reference::ImageReference;

pub use cli::{CliRuntime, resolve_program};

/// What happens to a container's stdout/stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Stream to the launcher's console.
    Inherit,
    /// Discard the byte stream; the exit code is still observed.
    Discard,
}

/// A host directory bound to a container path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    host: PathBuf,
    container: String,
}

impl VolumeMount {
    /// Create a bind mount.
    ///
    /// # Errors
    ///
    /// Returns [`MarError::InvalidMount`] if the host path is relative or
    /// cannot be expressed in `-v host:container` form, or if the container
    /// path is not absolute.
    pub fn new(host: impl Into<PathBuf>, container: impl Into<String>) -> MarResult<Self> {
        let host = host.into();
        let container = container.into();

        if !host.is_absolute() {
            return Err(MarError::InvalidMount {
                path: host,
                reason: "host path must be absolute".to_string(),
            });
        }
        if cfg!(unix) && host.to_string_lossy().contains(':') {
            return Err(MarError::InvalidMount {
                path: host,
                reason: "host path must not contain ':'".to_string(),
            });
        }
        if !container.starts_with('/') {
            return Err(MarError::InvalidMount {
                path: host,
                reason: format!("container path '{container}' must be absolute"),
            });
        }

        Ok(Self { host, container })
    }

    /// Host side of the binding.
    #[must_use]
    pub fn host(&self) -> &Path {
        &self.host
    }

    /// Container side of the binding.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    fn to_arg(&self) -> OsString {
        let mut arg = self.host.as_os_str().to_owned();
        arg.push(":");
        arg.push(&self.container);
        arg
    }
}

/// A single `run` invocation of a package image.
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Image to run.
    pub image: ImageReference,
    /// Bind mounts.
    pub mounts: Vec<VolumeMount>,
    /// Keep stdin attached (`-i`).
    pub interactive: bool,
    /// Allocate a pseudo-terminal (`-t`).
    pub tty: bool,
    /// Console handling for the container output.
    pub output: OutputMode,
    /// Container name, unique per run.
    pub name: String,
    /// Upper bound on the run.
    pub timeout: Option<Duration>,
}

impl RunSpec {
    /// A detached-from-terminal run of `image` with a fresh container name.
    #[must_use]
    pub fn new(image: &ImageReference) -> Self {
        Self {
            image: image.clone(),
            mounts: Vec::new(),
            interactive: false,
            tty: false,
            output: OutputMode::Inherit,
            name: format!("mar-{}", uuid::Uuid::new_v4().simple()),
            timeout: None,
        }
    }

    /// Add a bind mount.
    #[must_use]
    pub fn mount(mut self, mount: VolumeMount) -> Self {
        self.mounts.push(mount);
        self
    }

    /// Request `-i` and `-t`.
    #[must_use]
    pub const fn terminal(mut self, interactive: bool, tty: bool) -> Self {
        self.interactive = interactive;
        self.tty = tty;
        self
    }

    /// Set the output mode.
    #[must_use]
    pub const fn output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Bound the run.
    #[must_use]
    pub const fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Argument vector passed to the runtime binary.
    #[must_use]
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["run".into(), "--rm".into()];
        args.push("--name".into());
        args.push(self.name.clone().into());
        if self.interactive {
            args.push("-i".into());
        }
        if self.tty {
            args.push("-t".into());
        }
        for mount in &self.mounts {
            args.push("-v".into());
            args.push(mount.to_arg());
        }
        args.push(self.image.as_str().into());
        args
    }
}

/// Operations the launcher needs from a container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Runtime binary name, used in messages.
    fn program(&self) -> &str;

    /// Whether the runtime binary can be resolved.
    fn is_installed(&self) -> bool;

    /// Whether the image is present locally.
    async fn image_exists(&self, image: &ImageReference) -> MarResult<bool>;

    /// Pull the image, returning the runtime's exit code.
    async fn pull(&self, image: &ImageReference, output: OutputMode) -> MarResult<i32>;

    /// Run a container to completion, returning its exit code.
    async fn run(&self, spec: &RunSpec) -> MarResult<i32>;
}
