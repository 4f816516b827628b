//! Dependency verification.

use mar_common::{MarError, MarResult};

use crate::config::RunnerConfig;
use crate::reference::ImageReference;
use crate::runtime::{ContainerRuntime, OutputMode};

/// Confirms the runtime is installed and the package image is resolvable.
pub struct DependencyVerifier<'a> {
    runtime: &'a dyn ContainerRuntime,
    config: &'a RunnerConfig,
}

impl<'a> DependencyVerifier<'a> {
    /// Create a verifier.
    pub fn new(runtime: &'a dyn ContainerRuntime, config: &'a RunnerConfig) -> Self {
        Self { runtime, config }
    }

    /// Check all dependencies, reporting the first unmet one.
    ///
    /// May pull the image. Nothing is retried.
    ///
    /// # Errors
    ///
    /// [`MarError::RuntimeNotInstalled`] or [`MarError::ImageUnavailable`].
    pub async fn check(&self, image: &ImageReference) -> MarResult<()> {
        tracing::info!("Checking dependencies...");

        let program = self.runtime.program();
        tracing::info!("--> Verifying if \"{program}\" is installed...");
        if !self.runtime.is_installed() {
            return Err(MarError::RuntimeNotInstalled {
                runtime: program.to_string(),
            });
        }

        tracing::info!("--> Verifying if \"{image}\" is available...");
        tracing::debug!(
            registry = %image.registry,
            repository = %image.repository,
            reference = ?image.reference,
            full = %image.full_reference(),
            "Resolved package reference"
        );
        if self.image_available(image).await {
            Ok(())
        } else {
            Err(MarError::ImageUnavailable {
                image: image.to_string(),
            })
        }
    }

    /// Whether every dependency is satisfied. Failures are logged, not raised.
    pub async fn verify(&self, image: &ImageReference) -> bool {
        match self.check(image).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("{e}");
                false
            }
        }
    }

    async fn image_available(&self, image: &ImageReference) -> bool {
        match self.runtime.image_exists(image).await {
            Ok(true) => {
                tracing::debug!(image = %image, "Image present locally");
                return true;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(image = %image, error = %e, "Image inspection failed");
            }
        }

        tracing::info!(image = %image, "Image not found locally, pulling");
        let output = if self.config.quiet {
            OutputMode::Discard
        } else {
            OutputMode::Inherit
        };
        match self.runtime.pull(image, output).await {
            Ok(0) => true,
            Ok(code) => {
                tracing::debug!(image = %image, code, "Pull failed");
                false
            }
            Err(e) => {
                tracing::debug!(image = %image, error = %e, "Pull could not be started");
                false
            }
        }
    }
}
