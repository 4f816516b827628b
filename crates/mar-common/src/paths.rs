//! Well-known manifest export paths.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;

/// Container path into which a package exports its manifests.
pub static EXPORT_CONFIG_DIR: Lazy<String> = Lazy::new(|| {
    std::env::var("MAR_EXPORT_DIR").unwrap_or_else(|_| "/var/run/monai/export/config".to_string())
});

/// File name of the application manifest.
pub const APP_MANIFEST_FILE: &str = "app.json";

/// File name of the package manifest.
pub const PKG_MANIFEST_FILE: &str = "pkg.json";

/// Host and container sides of the manifest export directory.
#[derive(Debug, Clone)]
pub struct ManifestPaths {
    /// Host directory bound into the container.
    pub host_dir: PathBuf,
    /// Mount point inside the container.
    pub container_dir: String,
}

impl ManifestPaths {
    /// Paths for a host directory bound to the default export mount.
    #[must_use]
    pub fn new(host_dir: impl Into<PathBuf>) -> Self {
        Self {
            host_dir: host_dir.into(),
            container_dir: EXPORT_CONFIG_DIR.clone(),
        }
    }

    /// Override the container mount point.
    #[must_use]
    pub fn with_container_dir(mut self, dir: impl Into<String>) -> Self {
        self.container_dir = dir.into();
        self
    }

    /// Host path of the exported application manifest.
    #[must_use]
    pub fn app_manifest(&self) -> PathBuf {
        self.host_dir.join(APP_MANIFEST_FILE)
    }

    /// Host path of the exported package manifest.
    #[must_use]
    pub fn pkg_manifest(&self) -> PathBuf {
        self.host_dir.join(PKG_MANIFEST_FILE)
    }

    /// Host directory bound into the container.
    #[must_use]
    pub fn host_dir(&self) -> &Path {
        &self.host_dir
    }
}
