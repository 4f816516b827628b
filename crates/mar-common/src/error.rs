//! Error types for the MAR launcher.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`MarError`].
pub type MarResult<T> = Result<T, MarError>;

/// Errors raised while launching an application package.
#[derive(Error, Diagnostic, Debug)]
pub enum MarError {
    /// Container runtime binary could not be resolved.
    #[error("\"{runtime}\" not installed")]
    #[diagnostic(
        code(mar::env::runtime_missing),
        help("Install Docker (or pass --runtime with a compatible CLI such as podman)")
    )]
    RuntimeNotInstalled {
        /// The runtime binary that was looked up.
        runtime: String,
    },

    /// Image is neither present locally nor pullable.
    #[error("Unable to fetch required image: {image}")]
    #[diagnostic(
        code(mar::env::image_unavailable),
        help("Check the image name and tag, registry credentials and network access")
    )]
    ImageUnavailable {
        /// The image reference.
        image: String,
    },

    /// The manifest export run exited with a non-zero code.
    #[error("Failed to fetch manifest from \"{image}\" (exit code {code})")]
    #[diagnostic(code(mar::exec::manifest_export))]
    ManifestExport {
        /// The image reference.
        image: String,
        /// Exit code of the export run.
        code: i32,
    },

    /// The application run exited with a non-zero code.
    #[error("Application package \"{image}\" failed (exit code {code})")]
    #[diagnostic(code(mar::exec::application))]
    ApplicationFailed {
        /// The image reference.
        image: String,
        /// Exit code of the application run.
        code: i32,
    },

    /// A container run exceeded its time limit.
    #[error("Container run of \"{image}\" timed out after {seconds}s")]
    #[diagnostic(code(mar::exec::timeout), help("Raise or remove --timeout"))]
    Timeout {
        /// The image reference.
        image: String,
        /// The limit that was exceeded.
        seconds: u64,
    },

    /// The runtime process could not be spawned or awaited.
    #[error("Failed to execute {program}: {source}")]
    #[diagnostic(code(mar::exec::spawn))]
    Spawn {
        /// The program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A manifest file exported by the package could not be read.
    #[error("Unable to read manifest file {}: {source}", path.display())]
    #[diagnostic(
        code(mar::manifest::read),
        help("The package must write app.json and pkg.json into its export directory")
    )]
    ManifestRead {
        /// Host path of the manifest file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The application manifest is malformed or lacks required fields.
    #[error("Invalid application manifest: {message}")]
    #[diagnostic(
        code(mar::manifest::format),
        help("app.json must contain string fields input.path and output.path")
    )]
    ManifestFormat {
        /// Description of the problem.
        message: String,
    },

    /// Invalid package image reference.
    #[error("Invalid image reference '{reference}': {reason}")]
    #[diagnostic(
        code(mar::input::reference),
        help("Use formats like 'my-app', 'my-app:1.0' or 'ghcr.io/org/my-app:1.0'")
    )]
    InvalidReference {
        /// The rejected reference.
        reference: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A host directory cannot be bound into a container.
    #[error("Cannot bind {}: {reason}", path.display())]
    #[diagnostic(code(mar::input::mount))]
    InvalidMount {
        /// The offending host path.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(mar::io))]
    Io(#[from] std::io::Error),
}

impl MarError {
    /// Exit code reported by the container run behind this error, if any.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ManifestExport { code, .. } | Self::ApplicationFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}
