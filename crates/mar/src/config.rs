//! Launcher configuration.

use std::time::Duration;

use mar_common::paths::EXPORT_CONFIG_DIR;

/// Default container runtime binary.
pub const DEFAULT_RUNTIME: &str = "docker";

/// Run-scoped settings shared by every pipeline stage.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Container runtime binary (name on `PATH` or explicit path).
    pub runtime: String,
    /// Dump the exported manifest files at debug level.
    pub verbose: bool,
    /// Discard container console output during the application run.
    pub quiet: bool,
    /// Upper bound for each container run.
    pub timeout: Option<Duration>,
    /// Container path the package exports its manifests into.
    pub export_dir: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            runtime: DEFAULT_RUNTIME.to_string(),
            verbose: false,
            quiet: false,
            timeout: None,
            export_dir: EXPORT_CONFIG_DIR.clone(),
        }
    }
}

impl RunnerConfig {
    /// Set the runtime binary.
    #[must_use]
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = runtime.into();
        self
    }

    /// Enable or disable quiet mode.
    #[must_use]
    pub const fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Enable or disable verbose diagnostics.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Bound each container run.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the manifest export mount point.
    #[must_use]
    pub fn with_export_dir(mut self, dir: impl Into<String>) -> Self {
        self.export_dir = dir.into();
        self
    }
}
