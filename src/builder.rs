//! Image builder: one manifest, one set of options, one resolved context.
//!
//! ```rust,ignore
//! use image_build::{ArtifactKind, BuildOptions, ImageBuilder, OsCatalog};
//!
//! let catalog = OsCatalog::builtin();
//! let builder = ImageBuilder::new("manifests/init.pp", options, &catalog);
//! let dockerfile = builder.write_artifact(ArtifactKind::Dockerfile, Path::new("."))?;
//! println!("built with: {}", builder.build_command(ArtifactKind::Dockerfile)?);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::artifact::{generate_artifact, Artifact};
use crate::build::context::{BuildContext, ContextResolver};
use crate::build::plan::{build_command, ArtifactKind, BuildCommand};
use crate::catalog::OsCatalog;
use crate::config::BuildOptions;
use crate::error;

/// Builds artifacts for a single manifest.
///
/// The context is resolved on first use and reused for every later call.
pub struct ImageBuilder<'a> {
    resolver: ContextResolver<'a>,
}

impl<'a> ImageBuilder<'a> {
    pub fn new(manifest: impl Into<PathBuf>, options: BuildOptions, catalog: &'a OsCatalog) -> Self {
        Self {
            resolver: ContextResolver::new(manifest, options, catalog),
        }
    }

    pub fn manifest(&self) -> &Path {
        self.resolver.manifest()
    }

    /// The resolved build context.
    pub fn context(&self) -> error::Result<&BuildContext> {
        self.resolver.context()
    }

    /// Instructions for `kind`.
    pub fn artifact(&self, kind: ArtifactKind) -> error::Result<Artifact> {
        Ok(generate_artifact(self.context()?, kind))
    }

    pub fn dockerfile(&self) -> error::Result<Artifact> {
        self.artifact(ArtifactKind::Dockerfile)
    }

    /// Command that builds the image once the `kind` artifact is written.
    pub fn build_command(&self, kind: ArtifactKind) -> error::Result<BuildCommand> {
        Ok(build_command(self.context()?, kind))
    }

    /// Render the `kind` artifact into `dir`, returning the written path.
    pub fn write_artifact(&self, kind: ArtifactKind, dir: &Path) -> Result<PathBuf> {
        let artifact = self
            .artifact(kind)
            .with_context(|| format!("resolving build context for '{}'", self.manifest().display()))?;

        let path = dir.join(kind.file_name());
        fs::write(&path, artifact.render())
            .with_context(|| format!("writing {} '{}'", kind, path.display()))?;
        tracing::info!("wrote {}", path.display());

        Ok(path)
    }
}
