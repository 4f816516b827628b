//! Verify → fetch manifest → execute.

use std::path::PathBuf;

use mar_common::{MarError, MarResult};

use crate::config::RunnerConfig;
use crate::executor::ApplicationExecutor;
use crate::manifest::ManifestFetcher;
use crate::reference::ImageReference;
use crate::runtime::ContainerRuntime;
use crate::verify::DependencyVerifier;

/// Pipeline progress. Linear, with `Failed` absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing has run yet.
    Start,
    /// Runtime and image are available.
    Verified,
    /// Application manifest fetched and parsed.
    Manifested,
    /// Application ran and exited zero.
    Executed,
    /// A stage failed; nothing further runs.
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Verified => write!(f, "verified"),
            Self::Manifested => write!(f, "manifested"),
            Self::Executed => write!(f, "executed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One launcher invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Package image.
    pub image: ImageReference,
    /// Absolute host input directory.
    pub input_dir: PathBuf,
    /// Absolute host output directory.
    pub output_dir: PathBuf,
}

/// Drives the three launcher stages in order.
pub struct Pipeline<'a> {
    runtime: &'a dyn ContainerRuntime,
    config: &'a RunnerConfig,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline over a runtime.
    pub fn new(runtime: &'a dyn ContainerRuntime, config: &'a RunnerConfig) -> Self {
        Self {
            runtime,
            config,
            stage: Stage::Start,
        }
    }

    /// Last stage reached.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Run every stage, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the error of the failing stage; a non-zero application exit
    /// becomes [`MarError::ApplicationFailed`].
    pub async fn run(&mut self, invocation: &Invocation) -> MarResult<()> {
        let result = self.advance(invocation).await;
        if result.is_err() {
            self.transition(Stage::Failed);
        }
        result
    }

    async fn advance(&mut self, invocation: &Invocation) -> MarResult<()> {
        self.stage = Stage::Start;
        let image = &invocation.image;

        DependencyVerifier::new(self.runtime, self.config)
            .check(image)
            .await?;
        self.transition(Stage::Verified);

        let manifest = ManifestFetcher::new(self.runtime, self.config)
            .fetch(image)
            .await?;
        self.transition(Stage::Manifested);

        let code = ApplicationExecutor::new(self.runtime, self.config)
            .run(image, &invocation.input_dir, &invocation.output_dir, &manifest)
            .await?;
        if code != 0 {
            return Err(MarError::ApplicationFailed {
                image: image.to_string(),
                code,
            });
        }
        self.transition(Stage::Executed);

        Ok(())
    }

    fn transition(&mut self, next: Stage) {
        tracing::debug!(from = %self.stage, to = %next, "Pipeline transition");
        self.stage = next;
    }
}
