//! # mar
//!
//! Launcher for containerized application packages.
//!
//! A package image declares, through a manifest it exports on demand, the
//! container paths it reads input from and writes output to. `mar` runs a
//! three-stage pipeline over a Docker-compatible runtime:
//! - verify the runtime and the image are available
//! - run the image in export mode and parse its application manifest
//! - run the image with the caller's directories bound to those paths

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod executor;
pub mod manifest;
pub mod pipeline;
pub mod reference;
pub mod runtime;
pub mod verify;

pub use config::RunnerConfig;
pub use executor::ApplicationExecutor;
pub use manifest::{ApplicationManifest, ManifestFetcher};
pub use pipeline::{Invocation, Pipeline, Stage};
pub use reference::ImageReference;
pub use runtime::{CliRuntime, ContainerRuntime, OutputMode, RunSpec, VolumeMount};
pub use verify::DependencyVerifier;
