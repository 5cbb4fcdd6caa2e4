//! Build artifact generation.
//!
//! An [`Artifact`] is an ordered list of [`Instruction`]s describing WHAT the
//! image build does: start from the base image, install Puppet, copy the
//! manifest and its inputs in, apply it, and describe the result. Turning that
//! list into text is the job of an [`ArtifactRenderer`]:
//!
//! - [`dockerfile`] - Dockerfile for docker/rocker
//! - [`acbuild`] - acbuild script for rkt images
//!
//! Generation reads everything it needs from the [`BuildContext`]; nothing is
//! looked up again here.

pub mod acbuild;
pub mod dockerfile;
mod install;

use std::path::Path;

use crate::build::context::BuildContext;
use crate::catalog::Packaging;

pub use crate::build::plan::ArtifactKind;

/// Where the manifest is copied inside the image.
pub const MANIFEST_DEST: &str = "/manifest.pp";
/// Where the Puppetfile is copied inside the image.
pub const PUPPETFILE_DEST: &str = "/Puppetfile";
/// Module path r10k installs into.
pub const MODULE_DIR: &str = "/etc/puppetlabs/code/modules";
pub const HIERA_CONFIG_DEST: &str = "/etc/puppetlabs/puppet/hiera.yaml";
pub const HIERA_DATA_DEST: &str = "/etc/puppetlabs/code/environments/production/hieradata";
/// apt configuration snippet holding the build-time proxy.
pub const APT_PROXY_FILE: &str = "/etc/apt/apt.conf.d/01proxy";

/// `PATH` tail for formats that can't reference the inherited value.
const SYSTEM_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// One step of an image build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    // ─────────────────────────────────────────────────────────────────────
    // Image identity
    // ─────────────────────────────────────────────────────────────────────
    /// Base image reference.
    From(String),

    /// Name of the image being built (acbuild only; docker names via `-t`).
    SetName(String),

    Maintainer(String),

    /// Free-form metadata (key, value).
    Label(String, String),

    // ─────────────────────────────────────────────────────────────────────
    // Build steps
    // ─────────────────────────────────────────────────────────────────────
    /// Environment variables, in order.
    Env(Vec<(String, String)>),

    /// Shell command run inside the image.
    Run(String),

    /// Copy a file or directory from the build directory into the image.
    Copy { source: String, destination: String },

    // ─────────────────────────────────────────────────────────────────────
    // Runtime configuration
    // ─────────────────────────────────────────────────────────────────────
    /// Port, optionally with protocol (`80`, `53/udp`).
    Expose(String),

    Volume(String),

    Entrypoint(Vec<String>),

    Cmd(Vec<String>),

    /// Entrypoint and command combined (acbuild only).
    Exec(Vec<String>),

    // ─────────────────────────────────────────────────────────────────────
    // Output (acbuild only)
    // ─────────────────────────────────────────────────────────────────────
    /// Write the image to this file.
    Write(String),

    /// Finish the build session.
    End,
}

/// Generated build instructions for one artifact kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub instructions: Vec<Instruction>,
}

impl Artifact {
    /// Render with the renderer matching [`Artifact::kind`].
    pub fn render(&self) -> String {
        match self.kind {
            ArtifactKind::Dockerfile => dockerfile::DockerfileRenderer.render(self),
            ArtifactKind::Acbuild => acbuild::AcbuildRenderer.render(self),
        }
    }
}

/// Serializes an [`Artifact`] into the text of its file.
pub trait ArtifactRenderer {
    fn render(&self, artifact: &Artifact) -> String;
}

/// Generate the instruction list for `kind` from a resolved context.
pub fn generate_artifact(context: &BuildContext, kind: ArtifactKind) -> Artifact {
    let mut instructions = vec![Instruction::From(context.from.clone())];

    if kind == ArtifactKind::Acbuild {
        instructions.push(Instruction::SetName(context.image_name.clone()));
    }
    if let Some(maintainer) = &context.maintainer {
        instructions.push(Instruction::Maintainer(maintainer.clone()));
    }
    for (key, value) in &context.labels {
        instructions.push(Instruction::Label(key.clone(), value.clone()));
    }

    if !context.environment.is_empty() {
        instructions.push(Instruction::Env(
            context
                .environment
                .iter()
                .map(|(key, value)| (key.to_ascii_uppercase(), value.clone()))
                .collect(),
        ));
    }
    let inherited = match kind {
        ArtifactKind::Dockerfile => "$PATH",
        ArtifactKind::Acbuild => SYSTEM_PATH,
    };
    instructions.push(Instruction::Env(vec![(
        "PATH".to_string(),
        search_path(context, inherited),
    )]));
    if !context.env.is_empty() {
        instructions.push(Instruction::Env(context.env.clone()));
    }

    let proxied = context.packaging == Packaging::Apt
        && context.apt_proxy.is_some()
        && !context.skip_puppet_install;
    if proxied {
        if let Some(proxy) = &context.apt_proxy {
            instructions.push(Instruction::Run(format!(
                "echo 'Acquire::http::Proxy \"{}\";' > {}",
                proxy, APT_PROXY_FILE
            )));
        }
    }

    if context.skip_puppet_install {
        tracing::debug!("skipping Puppet installation for {}", context.from);
    } else {
        match install::install_command(context) {
            Some(command) => instructions.push(Instruction::Run(command)),
            None => tracing::warn!(
                "don't know how to install Puppet on '{}'; assuming the base image provides it",
                context.os
            ),
        }
    }

    if let Some(puppetfile) = context.puppetfile.as_deref() {
        instructions.push(copy(puppetfile, PUPPETFILE_DEST));
    }
    if context.use_hiera {
        if let (Some(config), Some(data)) = (
            context.hiera_config.as_deref(),
            context.hiera_data.as_deref(),
        ) {
            instructions.push(copy(config, HIERA_CONFIG_DEST));
            instructions.push(copy(data, HIERA_DATA_DEST));
        }
    }
    instructions.push(copy(&context.manifest, MANIFEST_DEST));
    instructions.push(Instruction::Run(apply_command(context, proxied)));

    for port in &context.expose {
        instructions.push(Instruction::Expose(port.clone()));
    }
    for volume in &context.volumes {
        instructions.push(Instruction::Volume(volume.clone()));
    }

    match kind {
        ArtifactKind::Dockerfile => {
            if !context.entrypoint.is_empty() {
                instructions.push(Instruction::Entrypoint(context.entrypoint.clone()));
            }
            if !context.cmd.is_empty() {
                instructions.push(Instruction::Cmd(context.cmd.clone()));
            }
        }
        ArtifactKind::Acbuild => {
            let exec: Vec<String> = context
                .entrypoint
                .iter()
                .chain(context.cmd.iter())
                .cloned()
                .collect();
            if !exec.is_empty() {
                instructions.push(Instruction::Exec(exec));
            }
            instructions.push(Instruction::Write(aci_file_name(&context.image_name)));
            instructions.push(Instruction::End);
        }
    }

    Artifact { kind, instructions }
}

/// File name of the ACI written for `image_name`: `puppet/nginx:1.0` -> `nginx.aci`.
pub fn aci_file_name(image_name: &str) -> String {
    let name = image_name
        .rsplit_once('/')
        .map_or(image_name, |(_, name)| name);
    let name = name.split_once(':').map_or(name, |(name, _tag)| name);
    format!("{}.aci", name)
}

fn copy(source: &Path, destination: &str) -> Instruction {
    Instruction::Copy {
        source: source.display().to_string(),
        destination: destination.to_string(),
    }
}

fn search_path(context: &BuildContext, inherited: &str) -> String {
    let mut dirs: Vec<&str> = Vec::new();
    for dir in [
        context.puppet_path.as_str(),
        context.gem_path.as_str(),
        context.r10k_path.as_str(),
    ] {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs.push(inherited);
    dirs.join(":")
}

fn apply_command(context: &BuildContext, proxied: bool) -> String {
    let mut steps = Vec::new();
    if context.use_puppetfile {
        steps.push(format!(
            "{}/r10k puppetfile install --moduledir {} --puppetfile {}",
            context.r10k_path, MODULE_DIR, PUPPETFILE_DEST
        ));
    }
    steps.push(format!(
        "{}/puppet apply {} --verbose --show_diff --summarize",
        context.puppet_path, MANIFEST_DEST
    ));

    let mut cleanup = vec![MANIFEST_DEST];
    if context.use_puppetfile {
        cleanup.push(PUPPETFILE_DEST);
    }
    if context.use_hiera {
        cleanup.push(HIERA_CONFIG_DEST);
        cleanup.push(HIERA_DATA_DEST);
    }
    if proxied {
        cleanup.push(APT_PROXY_FILE);
    }
    steps.push(format!("rm -rf {}", cleanup.join(" ")));

    steps.join(" && ")
}
