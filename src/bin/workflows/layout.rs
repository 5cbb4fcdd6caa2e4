use anyhow::{bail, Context, Result};
use image_build::config::merge_options;
use image_build::BuildOptions;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file picked up from the build directory when none is named.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "metadata.yaml";

/// Manifest path as seen from the build directory.
pub(crate) fn manifest_in_context(context_dir: &Path, manifest: &Path) -> Result<PathBuf> {
    if !context_dir.is_dir() {
        bail!("build directory does not exist: {}", context_dir.display());
    }

    let relative = input_in_context(context_dir, manifest, "manifest")?;
    if !context_dir.join(&relative).is_file() {
        bail!("manifest is not a file: {}", context_dir.join(&relative).display());
    }
    Ok(relative)
}

/// Merge the config file under `explicit` and rebase every copied input on
/// the build directory.
///
/// The returned options carry no `config_file`; the file has been applied.
pub(crate) fn options_in_context(context_dir: &Path, explicit: BuildOptions) -> Result<BuildOptions> {
    let mut explicit = explicit;
    if explicit.config_file.is_none() {
        let default = context_dir.join(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            tracing::info!("using config file {}", default.display());
            explicit.config_file = Some(default);
        }
    }

    let mut options = merge_options(explicit)?;
    options.config_file = None;

    for (what, field) in [
        ("Puppetfile", &mut options.puppetfile),
        ("hiera config", &mut options.hiera_config),
        ("hiera data", &mut options.hiera_data),
    ] {
        if let Some(path) = field.take() {
            *field = Some(input_in_context(context_dir, &path, what)?);
        }
    }

    Ok(options)
}

/// Path of a build input relative to the build directory.
///
/// COPY sources are resolved inside the build directory, so the input has to
/// exist under it. Relative paths are taken as relative to it already.
fn input_in_context(context_dir: &Path, path: &Path, what: &str) -> Result<PathBuf> {
    let candidate = context_dir.join(path);
    if !candidate.exists() {
        bail!("{what} not found: {}", candidate.display());
    }

    let root = fs::canonicalize(context_dir)
        .with_context(|| format!("resolving build directory '{}'", context_dir.display()))?;
    let resolved = fs::canonicalize(&candidate)
        .with_context(|| format!("resolving {what} '{}'", candidate.display()))?;

    match resolved.strip_prefix(&root) {
        Ok(rest) => Ok(rest.to_path_buf()),
        Err(_) => bail!(
            "{what} {} is outside the build directory {}",
            path.display(),
            root.display()
        ),
    }
}
