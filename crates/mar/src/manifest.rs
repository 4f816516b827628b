//! Application manifest model and export protocol.
//!
//! A package image, when started with a host directory bound to the export
//! mount point, writes `app.json` and `pkg.json` there and exits. The
//! [`ManifestFetcher`] drives that run and parses `app.json`.

use std::path::Path;

use mar_common::{ManifestPaths, MarError, MarResult};
use serde::Deserialize;

use crate::config::RunnerConfig;
use crate::reference::ImageReference;
use crate::runtime::{ContainerRuntime, OutputMode, RunSpec, VolumeMount};

/// Application manifest (`app.json`).
///
/// Only `input.path` and `output.path` are load-bearing. The remaining
/// fields are kept as raw JSON for diagnostics and never fail parsing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApplicationManifest {
    /// Manifest schema version.
    #[serde(default)]
    pub api_version: Option<serde_json::Value>,
    /// SDK version the package was built with.
    #[serde(default)]
    pub sdk_version: Option<serde_json::Value>,
    /// Command the package runs.
    #[serde(default)]
    pub command: Option<serde_json::Value>,
    /// Working directory inside the container.
    #[serde(default)]
    pub working_directory: Option<serde_json::Value>,
    /// Advisory run time limit.
    #[serde(default)]
    pub timeout: Option<serde_json::Value>,
    /// Environment baked into the package.
    #[serde(default)]
    pub environment: Option<serde_json::Value>,
    /// Input mount.
    pub input: InputSpec,
    /// Output mount.
    pub output: OutputSpec,
}

/// Input section of the application manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InputSpec {
    /// Container path the package reads input from.
    pub path: String,
    /// Accepted input formats.
    #[serde(default)]
    pub formats: Option<serde_json::Value>,
}

/// Output section of the application manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputSpec {
    /// Container path the package writes output to.
    pub path: String,
    /// Produced output format.
    #[serde(default)]
    pub format: Option<serde_json::Value>,
}

impl ApplicationManifest {
    /// Parse and validate an application manifest.
    ///
    /// # Errors
    ///
    /// Returns [`MarError::ManifestFormat`] if the document is not valid
    /// JSON, lacks `input.path` or `output.path`, or either path is not an
    /// absolute container path.
    pub fn from_json(text: &str) -> MarResult<Self> {
        let manifest: Self = serde_json::from_str(text).map_err(|e| MarError::ManifestFormat {
            message: e.to_string(),
        })?;

        for (field, path) in [
            ("input.path", &manifest.input.path),
            ("output.path", &manifest.output.path),
        ] {
            if path.is_empty() {
                return Err(MarError::ManifestFormat {
                    message: format!("{field} is empty"),
                });
            }
            if !path.starts_with('/') {
                return Err(MarError::ManifestFormat {
                    message: format!("{field} '{path}' is not an absolute path"),
                });
            }
        }

        Ok(manifest)
    }

    /// Container path bound to the caller's input directory.
    #[must_use]
    pub fn input_path(&self) -> &str {
        &self.input.path
    }

    /// Container path bound to the caller's output directory.
    #[must_use]
    pub fn output_path(&self) -> &str {
        &self.output.path
    }
}

/// Fetches the application manifest out of a package image.
pub struct ManifestFetcher<'a> {
    runtime: &'a dyn ContainerRuntime,
    config: &'a RunnerConfig,
}

impl<'a> ManifestFetcher<'a> {
    /// Create a fetcher.
    pub fn new(runtime: &'a dyn ContainerRuntime, config: &'a RunnerConfig) -> Self {
        Self { runtime, config }
    }

    /// Run the package in export mode and parse its application manifest.
    ///
    /// The host export directory is removed before this returns, on every
    /// path.
    ///
    /// # Errors
    ///
    /// - [`MarError::ManifestExport`] if the export run exits non-zero; the
    ///   manifest files are not read in that case.
    /// - [`MarError::ManifestRead`] / [`MarError::ManifestFormat`] if the
    ///   exported files are missing or malformed.
    pub async fn fetch(&self, image: &ImageReference) -> MarResult<ApplicationManifest> {
        tracing::info!(image = %image, "Reading application package manifest...");

        let export_dir = tempfile::Builder::new().prefix("mar-export-").tempdir()?;
        let paths = ManifestPaths::new(export_dir.path()).with_container_dir(&self.config.export_dir);

        let spec = RunSpec::new(image)
            .mount(VolumeMount::new(paths.host_dir(), paths.container_dir.clone())?)
            .output(OutputMode::Inherit)
            .timeout(self.config.timeout);

        let code = self.runtime.run(&spec).await?;
        if code != 0 {
            return Err(MarError::ManifestExport {
                image: image.to_string(),
                code,
            });
        }

        let app_json = read_manifest(&paths.app_manifest())?;
        let pkg_json = read_manifest(&paths.pkg_manifest())?;

        if self.config.verbose {
            log_manifests(&app_json, &pkg_json);
        }

        let manifest = ApplicationManifest::from_json(&app_json)?;
        tracing::debug!(
            input = manifest.input_path(),
            output = manifest.output_path(),
            api_version = ?manifest.api_version,
            sdk_version = ?manifest.sdk_version,
            "Parsed application manifest"
        );

        Ok(manifest)
    }
}

fn log_manifests(app_json: &str, pkg_json: &str) {
    tracing::debug!("-------------------application manifest-------------------");
    tracing::debug!("{app_json}");
    tracing::debug!("-------------------package manifest-------------------");
    match serde_json::from_str::<serde_json::Value>(pkg_json)
        .and_then(|v| serde_json::to_string_pretty(&v))
    {
        Ok(pretty) => tracing::debug!("{pretty}"),
        Err(_) => tracing::debug!("{pkg_json}"),
    }
}

fn read_manifest(path: &Path) -> MarResult<String> {
    std::fs::read_to_string(path).map_err(|source| MarError::ManifestRead {
        path: path.to_path_buf(),
        source,
    })
}
