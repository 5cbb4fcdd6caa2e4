//! Error types for build context resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving a [`BuildContext`](crate::BuildContext).
///
/// Resolution is deterministic, so none of these are retryable: the same
/// inputs always fail the same way.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error(
        "image-build currently only supports building from an explicit base image with an image name; missing: {}",
        .missing.join(", ")
    )]
    MissingRequired { missing: Vec<&'static str> },

    #[error("config file '{}' is not valid YAML: {reason}", .path.display())]
    InvalidYaml { path: PathBuf, reason: String },

    #[error("reading config file '{}'", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for context resolution.
pub type Result<T> = std::result::Result<T, ContextError>;
