//! Application execution.

use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use mar_common::MarResult;

use crate::config::RunnerConfig;
use crate::manifest::ApplicationManifest;
use crate::reference::ImageReference;
use crate::runtime::{ContainerRuntime, OutputMode, RunSpec, VolumeMount};

const WAITING_MESSAGE: &str = "Running application package...";

/// Runs a package with the caller's directories bound to its manifest paths.
pub struct ApplicationExecutor<'a> {
    runtime: &'a dyn ContainerRuntime,
    config: &'a RunnerConfig,
}

impl<'a> ApplicationExecutor<'a> {
    /// Create an executor.
    pub fn new(runtime: &'a dyn ContainerRuntime, config: &'a RunnerConfig) -> Self {
        Self { runtime, config }
    }

    /// Build the run invocation binding `input_dir` and `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`mar_common::MarError::InvalidMount`] if a directory cannot
    /// be bound.
    pub fn build_spec(
        &self,
        image: &ImageReference,
        input_dir: &Path,
        output_dir: &Path,
        manifest: &ApplicationManifest,
    ) -> MarResult<RunSpec> {
        let (output, terminal) = if self.config.quiet {
            (OutputMode::Discard, false)
        } else {
            (
                OutputMode::Inherit,
                std::io::stdin().is_terminal() && std::io::stdout().is_terminal(),
            )
        };

        Ok(RunSpec::new(image)
            .mount(VolumeMount::new(input_dir, manifest.input_path())?)
            .mount(VolumeMount::new(output_dir, manifest.output_path())?)
            .terminal(terminal, terminal)
            .output(output)
            .timeout(self.config.timeout))
    }

    /// Run the application once and return its exit code.
    ///
    /// In quiet mode the container output is discarded and a spinner is
    /// shown instead; the exit code is the same either way.
    ///
    /// # Errors
    ///
    /// Fails if the run cannot be built, spawned, or times out. A non-zero
    /// exit is returned as `Ok(code)`.
    pub async fn run(
        &self,
        image: &ImageReference,
        input_dir: &Path,
        output_dir: &Path,
        manifest: &ApplicationManifest,
    ) -> MarResult<i32> {
        let spec = self.build_spec(image, input_dir, output_dir, manifest)?;
        tracing::info!(
            image = %image,
            input = %input_dir.display(),
            output = %output_dir.display(),
            "Running application package"
        );

        if !self.config.quiet {
            return self.runtime.run(&spec).await;
        }

        // indicatif draws nothing when stderr is not a terminal
        if !std::io::stderr().is_terminal() {
            tracing::info!("{WAITING_MESSAGE}");
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner());
        spinner.set_message(WAITING_MESSAGE);
        spinner.enable_steady_tick(Duration::from_millis(120));

        let result = self.runtime.run(&spec).await;
        spinner.finish_and_clear();
        result
    }
}
