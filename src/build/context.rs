//! Build context resolution.
//!
//! Turns merged [`BuildOptions`] into a [`BuildContext`]: validates the
//! required inputs, infers the operating system from the base image, looks up
//! its codename and packaging in the [`OsCatalog`], and derives the Puppet
//! binary paths and environment.
//!
//! Only two things fail resolution: a config file that isn't valid YAML, and
//! a missing `from`/`image_name`. An operating system the catalog doesn't
//! know still resolves, just without codename or version metadata.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::catalog::{OsCatalog, Packaging};
use crate::config::{merge_options, BuildOptions};
use crate::error::{ContextError, Result};

/// puppet-agent release installed when none is configured.
pub const DEFAULT_PUPPET_AGENT_VERSION: &str = "1.8.2";
/// r10k gem release installed when none is configured.
pub const DEFAULT_R10K_VERSION: &str = "2.5.1";

/// Tool used to turn a Dockerfile into an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTool {
    #[default]
    Docker,
    Rocker,
}

impl fmt::Display for BuildTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildTool::Docker => write!(f, "docker"),
            BuildTool::Rocker => write!(f, "rocker"),
        }
    }
}

/// Everything needed to generate a build artifact for one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildContext {
    /// Manifest to apply, relative to the build directory.
    pub manifest: PathBuf,
    pub from: String,
    pub image_name: String,
    /// Distribution family inferred from `from`.
    pub os: String,
    /// Image tag of `from`.
    pub os_version: String,
    pub packaging: Packaging,
    /// Variables exported into the build, e.g. `codename`.
    pub environment: BTreeMap<String, String>,
    pub puppet_path: String,
    pub gem_path: String,
    pub r10k_path: String,
    pub use_puppetfile: bool,
    pub use_hiera: bool,
    pub puppetfile: Option<PathBuf>,
    pub hiera_config: Option<PathBuf>,
    pub hiera_data: Option<PathBuf>,
    pub build_tool: BuildTool,
    pub maintainer: Option<String>,
    pub labels: Vec<(String, String)>,
    /// User-supplied image environment, separate from `environment`.
    pub env: Vec<(String, String)>,
    pub expose: Vec<String>,
    pub volumes: Vec<String>,
    pub cmd: Vec<String>,
    pub entrypoint: Vec<String>,
    pub apt_proxy: Option<String>,
    pub skip_puppet_install: bool,
    pub no_cache: bool,
}

/// Resolve a build context from explicit options.
///
/// `options.config_file`, when set, is loaded and overlaid first.
pub fn resolve_context(
    options: BuildOptions,
    manifest: &Path,
    catalog: &OsCatalog,
) -> Result<BuildContext> {
    let options = merge_options(options)?;

    let (from, image_name) = match (non_empty(&options.from), non_empty(&options.image_name)) {
        (Some(from), Some(image_name)) => (from.to_string(), image_name.to_string()),
        (from, image_name) => {
            let mut missing = Vec::new();
            if from.is_none() {
                missing.push("from");
            }
            if image_name.is_none() {
                missing.push("image_name");
            }
            return Err(ContextError::MissingRequired { missing });
        }
    };

    let (os, os_version) = infer_os(&from);
    tracing::debug!("inferred operating system {} {} from '{}'", os, os_version, from);

    let packaging = catalog.packaging(&os);
    if packaging == Packaging::Unknown {
        tracing::warn!(
            "operating system '{}' is not in the catalog; Puppet must already be present in '{}'",
            os,
            from
        );
    }

    let mut environment = BTreeMap::new();
    match catalog.lookup_codename(&os, &os_version) {
        Some(codename) => {
            environment.insert("codename".to_string(), codename.to_string());
        }
        None => tracing::debug!("no codename known for {} {}", os, os_version),
    }
    if let Some(family_env) = catalog.environment(&os) {
        environment.extend(family_env.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    if packaging.uses_puppet_agent() {
        environment.insert(
            "puppet_agent_version".to_string(),
            options
                .puppet_agent_version
                .clone()
                .unwrap_or_else(|| DEFAULT_PUPPET_AGENT_VERSION.to_string()),
        );
    }
    environment.insert(
        "r10k_version".to_string(),
        options
            .r10k_version
            .clone()
            .unwrap_or_else(|| DEFAULT_R10K_VERSION.to_string()),
    );

    let paths = packaging.paths();
    let use_puppetfile = options.puppetfile.is_some();
    let use_hiera = options.hiera_config.is_some() && options.hiera_data.is_some();
    let build_tool = if options.rocker.unwrap_or(false) {
        BuildTool::Rocker
    } else {
        BuildTool::Docker
    };

    Ok(BuildContext {
        manifest: manifest.to_path_buf(),
        from,
        image_name,
        os,
        os_version,
        packaging,
        environment,
        puppet_path: paths.puppet.to_string(),
        gem_path: paths.gem.to_string(),
        r10k_path: paths.r10k.to_string(),
        use_puppetfile,
        use_hiera,
        puppetfile: options.puppetfile,
        hiera_config: options.hiera_config,
        hiera_data: options.hiera_data,
        build_tool,
        maintainer: options.maintainer.filter(|m| !m.trim().is_empty()),
        labels: parse_pairs(&options.labels, "label"),
        env: parse_pairs(&options.env, "env"),
        expose: options.expose,
        volumes: options.volumes,
        cmd: options.cmd,
        entrypoint: options.entrypoint,
        apt_proxy: options.apt_proxy,
        skip_puppet_install: options.skip_puppet_install.unwrap_or(false),
        no_cache: options.no_cache.unwrap_or(false),
    })
}

/// Resolves a context on first use and hands out the same one afterwards.
///
/// Not `Sync`; one resolver serves one invocation on one thread.
pub struct ContextResolver<'a> {
    manifest: PathBuf,
    options: BuildOptions,
    catalog: &'a OsCatalog,
    resolved: OnceCell<BuildContext>,
}

impl<'a> ContextResolver<'a> {
    pub fn new(manifest: impl Into<PathBuf>, options: BuildOptions, catalog: &'a OsCatalog) -> Self {
        Self {
            manifest: manifest.into(),
            options,
            catalog,
            resolved: OnceCell::new(),
        }
    }

    /// The resolved context. Failures are not cached; success is.
    pub fn context(&self) -> Result<&BuildContext> {
        if let Some(context) = self.resolved.get() {
            return Ok(context);
        }
        let context = resolve_context(self.options.clone(), &self.manifest, self.catalog)?;
        Ok(self.resolved.get_or_init(|| context))
    }

    pub fn manifest(&self) -> &Path {
        &self.manifest
    }
}

/// Split an image reference into `(family, version)`.
///
/// The family is the last path segment of the repository. A reference
/// without a tag (or pinned by digest) gets version `latest`.
pub fn infer_os(from: &str) -> (String, String) {
    let reference = from.split_once('@').map_or(from, |(name, _digest)| name);
    let (repo, tag) = match reference.rsplit_once(':') {
        Some((repo, tag)) if !tag.contains('/') && !tag.is_empty() => (repo, tag),
        _ => (reference, "latest"),
    };
    let family = repo.rsplit_once('/').map_or(repo, |(_, name)| name);
    (family.to_string(), tag.to_string())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_pairs(entries: &[String], what: &str) -> Vec<(String, String)> {
    entries
        .iter()
        .filter_map(|entry| match entry.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Some((key.trim().to_string(), value.to_string()))
            }
            _ => {
                tracing::warn!("ignoring {} '{}': expected KEY=value", what, entry);
                None
            }
        })
        .collect()
}
