//! # mar-common
//!
//! Shared types for the MAR application package launcher.
//!
//! This crate provides:
//! - The launcher error taxonomy
//! - Well-known manifest export paths

#![warn(missing_docs)]

pub mod error;
pub mod paths;

pub use error::{MarError, MarResult};
pub use paths::ManifestPaths;
