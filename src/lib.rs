//! Build container images from Puppet manifests.
//!
//! Given a manifest and a handful of options, this crate works out everything
//! a container build needs to apply that manifest and produces either a
//! Dockerfile (docker/rocker) or an acbuild script (rkt):
//!
//! - **OS catalog** - codenames and Puppet packaging per distribution
//! - **Config loading** - YAML config file overlaid by explicit options
//! - **Context resolution** - validated, immutable [`BuildContext`]
//! - **Build plan** - which build tool runs and how
//! - **Artifacts** - ordered build instructions and their renderers
//!
//! # Architecture
//!
//! ```text
//! BuildOptions ──► config::merge_options ──► build::context::resolve_context
//!                                                  │  (uses OsCatalog)
//!                                                  ▼
//!                                            BuildContext
//!                                             │        │
//!                          build::plan::build_command  artifact::generate_artifact
//!                                             │        │
//!                                        BuildCommand  Artifact ──► render()
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use image_build::{ArtifactKind, BuildOptions, ImageBuilder, OsCatalog};
//!
//! let catalog = OsCatalog::builtin();
//! let options = BuildOptions {
//!     from: Some("ubuntu:16.04".into()),
//!     image_name: Some("puppet/nginx".into()),
//!     ..Default::default()
//! };
//! let builder = ImageBuilder::new("manifests/init.pp", options, &catalog);
//! print!("{}", builder.dockerfile()?.render());
//! ```

pub mod artifact;
pub mod build;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod error;
pub mod preflight;

pub use artifact::{generate_artifact, Artifact, ArtifactRenderer, Instruction};
pub use build::context::{resolve_context, BuildContext, BuildTool, ContextResolver};
pub use build::plan::{build_command, ArtifactKind, BuildCommand};
pub use builder::ImageBuilder;
pub use catalog::{OsCatalog, Packaging};
pub use config::BuildOptions;
pub use error::ContextError;
