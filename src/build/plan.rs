//! Build plan selection: which artifact to write and which command builds it.

use std::fmt;

use serde::Serialize;

use super::context::{BuildContext, BuildTool};

/// Kind of build artifact to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// A Dockerfile, built by docker or rocker.
    Dockerfile,
    /// A script of acbuild commands producing an ACI for rkt.
    Acbuild,
}

impl ArtifactKind {
    /// Conventional file name of the artifact inside the build directory.
    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Dockerfile => "Dockerfile",
            ArtifactKind::Acbuild => "build.acb",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Dockerfile => write!(f, "dockerfile"),
            ArtifactKind::Acbuild => write!(f, "acbuild"),
        }
    }
}

/// A command line that builds the image from a written artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Select the command that builds `kind` for `context`.
///
/// Run from the build directory the artifact was written to.
pub fn build_command(context: &BuildContext, kind: ArtifactKind) -> BuildCommand {
    let mut args: Vec<String> = Vec::new();
    let program = match (kind, context.build_tool) {
        (ArtifactKind::Dockerfile, BuildTool::Docker) => {
            args.extend([
                "build".to_string(),
                "-t".to_string(),
                context.image_name.clone(),
            ]);
            if context.no_cache {
                args.push("--no-cache".into());
            }
            args.push(".".into());
            "docker"
        }
        (ArtifactKind::Dockerfile, BuildTool::Rocker) => {
            args.extend([
                "build".to_string(),
                "-f".to_string(),
                ArtifactKind::Dockerfile.file_name().to_string(),
            ]);
            if context.no_cache {
                args.push("--no-cache".into());
            }
            "rocker"
        }
        (ArtifactKind::Acbuild, _) => {
            args.extend([
                "script".to_string(),
                ArtifactKind::Acbuild.file_name().to_string(),
            ]);
            "acbuild"
        }
    };

    BuildCommand {
        program: program.to_string(),
        args,
    }
}
