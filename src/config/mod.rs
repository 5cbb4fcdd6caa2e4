//! Build option loading and merging.
//!
//! Options come from three layers, highest precedence first:
//!
//! 1. Explicit options from the caller (CLI flags)
//! 2. The YAML file named by `config_file`
//! 3. Built-in defaults, applied later by the context resolver
//!
//! This module only merges structure. It does not check that `from` is set
//! or that paths exist; that is the resolver's job.

use crate::error::{ContextError, Result};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Every input `image-build` understands.
///
/// All fields are optional so that a partial layer can be overlaid on
/// another. Unknown keys in a config file are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Base image, `<repo>:<tag>`.
    pub from: Option<String>,
    /// Name (and optional tag) of the image to produce.
    pub image_name: Option<String>,
    pub maintainer: Option<String>,
    pub puppetfile: Option<PathBuf>,
    pub hiera_config: Option<PathBuf>,
    pub hiera_data: Option<PathBuf>,
    /// YAML file supplying defaults for everything else.
    pub config_file: Option<PathBuf>,
    /// Build with rocker instead of docker.
    pub rocker: Option<bool>,
    /// `KEY=value` image labels.
    #[serde(deserialize_with = "one_or_many")]
    pub labels: Vec<String>,
    /// `KEY=value` environment variables baked into the image.
    #[serde(deserialize_with = "one_or_many")]
    pub env: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub expose: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub volumes: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub cmd: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub entrypoint: Vec<String>,
    /// HTTP proxy for apt while Puppet is installed.
    pub apt_proxy: Option<String>,
    pub puppet_agent_version: Option<String>,
    pub r10k_version: Option<String>,
    /// The base image already carries Puppet.
    pub skip_puppet_install: Option<bool>,
    pub no_cache: Option<bool>,
}

impl BuildOptions {
    /// Overlay `explicit` on top of `self`, field by field.
    ///
    /// A value present in `explicit` wins; an absent one keeps `self`'s.
    /// Lists count as present when non-empty and replace, not extend.
    pub fn overlay(self, explicit: BuildOptions) -> BuildOptions {
        fn list(base: Vec<String>, over: Vec<String>) -> Vec<String> {
            if over.is_empty() {
                base
            } else {
                over
            }
        }

        BuildOptions {
            from: explicit.from.or(self.from),
            image_name: explicit.image_name.or(self.image_name),
            maintainer: explicit.maintainer.or(self.maintainer),
            puppetfile: explicit.puppetfile.or(self.puppetfile),
            hiera_config: explicit.hiera_config.or(self.hiera_config),
            hiera_data: explicit.hiera_data.or(self.hiera_data),
            config_file: explicit.config_file.or(self.config_file),
            rocker: explicit.rocker.or(self.rocker),
            labels: list(self.labels, explicit.labels),
            env: list(self.env, explicit.env),
            expose: list(self.expose, explicit.expose),
            volumes: list(self.volumes, explicit.volumes),
            cmd: list(self.cmd, explicit.cmd),
            entrypoint: list(self.entrypoint, explicit.entrypoint),
            apt_proxy: explicit.apt_proxy.or(self.apt_proxy),
            puppet_agent_version: explicit.puppet_agent_version.or(self.puppet_agent_version),
            r10k_version: explicit.r10k_version.or(self.r10k_version),
            skip_puppet_install: explicit.skip_puppet_install.or(self.skip_puppet_install),
            no_cache: explicit.no_cache.or(self.no_cache),
        }
    }
}

/// Load options from a YAML config file.
///
/// The document must be a mapping. An empty document yields empty options.
pub fn load_config_file(path: &Path) -> Result<BuildOptions> {
    let text = fs::read_to_string(path).map_err(|source| ContextError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    let invalid = |reason: String| ContextError::InvalidYaml {
        path: path.to_path_buf(),
        reason,
    };

    let value: Value = serde_yaml::from_str(&text).map_err(|e| invalid(e.to_string()))?;
    match value {
        Value::Null => Ok(BuildOptions::default()),
        Value::Mapping(_) => serde_yaml::from_value(value).map_err(|e| invalid(e.to_string())),
        other => Err(invalid(format!(
            "top-level value must be a mapping, found {}",
            value_kind(&other)
        ))),
    }
}

/// Merge a config file (if `explicit.config_file` names one) under `explicit`.
pub fn merge_options(explicit: BuildOptions) -> Result<BuildOptions> {
    let base = match explicit.config_file.as_deref() {
        Some(path) => {
            tracing::debug!("loading config file {}", path.display());
            load_config_file(path)?
        }
        None => BuildOptions::default(),
    };
    Ok(base.overlay(explicit))
}

/// A list field written as one scalar (`cmd: nginx`, `expose: 80`) or a sequence.
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Number(serde_yaml::Number),
        Flag(bool),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Scalar),
        Many(Vec<Scalar>),
    }

    fn text(scalar: Scalar) -> String {
        match scalar {
            Scalar::Text(text) => text,
            Scalar::Number(number) => number.to_string(),
            Scalar::Flag(flag) => flag.to_string(),
        }
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(scalar)) => vec![text(scalar)],
        Some(OneOrMany::Many(scalars)) => scalars.into_iter().map(text).collect(),
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_mapping() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "---\nfrom: debian:8\nimage_name: puppet/sample\nlabels:\n  - tier=web\n",
        );

        let options = load_config_file(&path).unwrap();
        assert_eq!(options.from.as_deref(), Some("debian:8"));
        assert_eq!(options.image_name.as_deref(), Some("puppet/sample"));
        assert_eq!(options.labels, vec!["tier=web".to_string()]);
        assert_eq!(options.rocker, None);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "from: debian:8\nsomething_new: true\n");
        let options = load_config_file(&path).unwrap();
        assert_eq!(options.from.as_deref(), Some("debian:8"));
    }

    #[test]
    fn test_empty_document_is_empty_options() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "---\n");
        assert_eq!(load_config_file(&path).unwrap(), BuildOptions::default());
    }

    #[test]
    fn test_sequence_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "- debian:8\n- puppet/sample\n");
        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ContextError::InvalidYaml { .. }));
        assert!(err.to_string().contains("valid YAML"));
        assert!(err.to_string().contains("sequence"));
    }

    #[test]
    fn test_malformed_document_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "-\ninvalid\n");
        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ContextError::InvalidYaml { .. }));
    }

    #[test]
    fn test_wrong_field_type_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "from:\n  - debian\n");
        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ContextError::InvalidYaml { .. }));
    }

    #[test]
    fn test_scalar_list_fields() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "from: ubuntu:16.04\nimage_name: puppet/nginx\ncmd: nginx\nexpose: 80\nvolumes:\n  - /data\n  - 8080\nlabels:\n",
        );

        let options = load_config_file(&path).unwrap();
        assert_eq!(options.cmd, vec!["nginx".to_string()]);
        assert_eq!(options.expose, vec!["80".to_string()]);
        assert_eq!(options.volumes, vec!["/data".to_string(), "8080".to_string()]);
        assert!(options.labels.is_empty());
    }

    #[test]
    fn test_mapping_list_field_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "cmd:\n  run: nginx\n");
        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ContextError::InvalidYaml { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_config_file(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ContextError::ConfigRead { .. }));
    }

    #[test]
    fn test_explicit_overrides_file_partially() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "from: debian:8\nimage_name: puppet/sample\nexpose:\n  - \"80\"\n",
        );

        let merged = merge_options(BuildOptions {
            config_file: Some(path),
            image_name: Some("puppet/different".into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(merged.image_name.as_deref(), Some("puppet/different"));
        assert_eq!(merged.from.as_deref(), Some("debian:8"));
        assert_eq!(merged.expose, vec!["80".to_string()]);
    }

    #[test]
    fn test_explicit_list_replaces_file_list() {
        let file = BuildOptions {
            volumes: vec!["/data".into(), "/logs".into()],
            ..Default::default()
        };
        let merged = file.overlay(BuildOptions {
            volumes: vec!["/srv".into()],
            ..Default::default()
        });
        assert_eq!(merged.volumes, vec!["/srv".to_string()]);
    }

    #[test]
    fn test_merge_without_config_file() {
        let explicit = BuildOptions {
            from: Some("alpine:3.4".into()),
            ..Default::default()
        };
        assert_eq!(merge_options(explicit.clone()).unwrap(), explicit);
    }
}
