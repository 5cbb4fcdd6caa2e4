use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use image_build::{ArtifactKind, BuildOptions};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod workflows;

/// Build Docker and ACI images from Puppet manifests
#[derive(Parser)]
#[command(name = "image-build", version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Docker images, built with docker or rocker
    Docker {
        #[command(subcommand)]
        action: DockerAction,
    },
    /// ACI images for rkt, built with acbuild
    Aci {
        #[command(subcommand)]
        action: AciAction,
    },
}

#[derive(Subcommand)]
enum DockerAction {
    /// Write a Dockerfile for the manifest
    Dockerfile(BuildArgs),
    /// Write the Dockerfile and build the image
    Build(BuildArgs),
    /// Print the resolved build context as JSON
    Context(BuildArgs),
}

#[derive(Subcommand)]
enum AciAction {
    /// Write an acbuild script for the manifest
    Script(BuildArgs),
    /// Write the script and build the image
    Build(BuildArgs),
    /// Print the resolved build context as JSON
    Context(BuildArgs),
}

/// What to do with a resolved build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Write,
    Build,
    Context,
}

#[derive(Args, Debug, Clone)]
struct BuildArgs {
    /// Puppet manifest to apply inside the image
    #[arg(default_value = "manifests/init.pp")]
    manifest: PathBuf,

    /// Base image, e.g. ubuntu:16.04
    #[arg(long)]
    from: Option<String>,

    /// Name of the image to build
    #[arg(long)]
    image_name: Option<String>,

    #[arg(long)]
    maintainer: Option<String>,

    /// Puppetfile installed with r10k before applying
    #[arg(long)]
    puppetfile: Option<PathBuf>,

    #[arg(long)]
    hiera_config: Option<PathBuf>,

    #[arg(long)]
    hiera_data: Option<PathBuf>,

    /// YAML file with default values for these options
    /// [default: <context-dir>/metadata.yaml when present]
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Build with rocker instead of docker
    #[arg(long)]
    rocker: bool,

    /// Image label (repeatable)
    #[arg(long = "label", value_name = "KEY=VALUE")]
    labels: Vec<String>,

    /// Environment variable baked into the image (repeatable)
    #[arg(long, value_name = "KEY=VALUE")]
    env: Vec<String>,

    /// Port to expose, e.g. 80 or 53/udp (repeatable)
    #[arg(long)]
    expose: Vec<String>,

    /// Volume path (repeatable)
    #[arg(long = "volume")]
    volumes: Vec<String>,

    /// Default command, comma separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    cmd: Vec<String>,

    /// Entrypoint, comma separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    entrypoint: Vec<String>,

    /// HTTP proxy for apt while Puppet is installed
    #[arg(long)]
    apt_proxy: Option<String>,

    #[arg(long)]
    puppet_agent_version: Option<String>,

    #[arg(long)]
    r10k_version: Option<String>,

    /// The base image already has Puppet installed
    #[arg(long)]
    skip_puppet_install: bool,

    /// Build without the layer cache
    #[arg(long)]
    no_cache: bool,

    /// Directory the artifact is written to and the build runs in
    #[arg(long, default_value = ".")]
    context_dir: PathBuf,
}

impl BuildArgs {
    /// Explicit options; unset flags leave room for the config file.
    fn options(&self) -> BuildOptions {
        BuildOptions {
            from: self.from.clone(),
            image_name: self.image_name.clone(),
            maintainer: self.maintainer.clone(),
            puppetfile: self.puppetfile.clone(),
            hiera_config: self.hiera_config.clone(),
            hiera_data: self.hiera_data.clone(),
            config_file: self.config_file.clone(),
            rocker: self.rocker.then_some(true),
            labels: self.labels.clone(),
            env: self.env.clone(),
            expose: self.expose.clone(),
            volumes: self.volumes.clone(),
            cmd: self.cmd.clone(),
            entrypoint: self.entrypoint.clone(),
            apt_proxy: self.apt_proxy.clone(),
            puppet_agent_version: self.puppet_agent_version.clone(),
            r10k_version: self.r10k_version.clone(),
            skip_puppet_install: self.skip_puppet_install.then_some(true),
            no_cache: self.no_cache.then_some(true),
        }
    }
}

impl Commands {
    fn into_parts(self) -> (ArtifactKind, Action, BuildArgs) {
        match self {
            Commands::Docker { action } => match action {
                DockerAction::Dockerfile(args) => (ArtifactKind::Dockerfile, Action::Write, args),
                DockerAction::Build(args) => (ArtifactKind::Dockerfile, Action::Build, args),
                DockerAction::Context(args) => (ArtifactKind::Dockerfile, Action::Context, args),
            },
            Commands::Aci { action } => match action {
                AciAction::Script(args) => (ArtifactKind::Acbuild, Action::Write, args),
                AciAction::Build(args) => (ArtifactKind::Acbuild, Action::Build, args),
                AciAction::Context(args) => (ArtifactKind::Acbuild, Action::Context, args),
            },
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let (kind, action, args) = cli.command.into_parts();
    match workflows::run(kind, action, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
