//! Puppet installation commands per packaging scheme.

use crate::build::context::{BuildContext, DEFAULT_PUPPET_AGENT_VERSION, DEFAULT_R10K_VERSION};
use crate::catalog::Packaging;

const APT_REPO: &str = "https://apt.puppetlabs.com";
const YUM_REPO: &str = "https://yum.puppetlabs.com";

/// Shell command installing Puppet and r10k, or `None` when the packaging
/// scheme is unknown.
pub(crate) fn install_command(context: &BuildContext) -> Option<String> {
    let r10k_version = env_or(context, "r10k_version", DEFAULT_R10K_VERSION);
    let gem_install_r10k = format!(
        "{}/gem install r10k:{} --no-ri --no-rdoc",
        context.gem_path, r10k_version
    );

    let steps = match context.packaging {
        Packaging::Apt => {
            // Without a known codename, ask the image at build time.
            let codename = context
                .environment
                .get("codename")
                .cloned()
                .unwrap_or_else(|| "$(lsb_release -cs)".to_string());
            let agent_version =
                env_or(context, "puppet_agent_version", DEFAULT_PUPPET_AGENT_VERSION);
            let release_deb = format!("puppetlabs-release-pc1-{}.deb", codename);
            vec![
                "apt-get update".to_string(),
                "apt-get install -y --no-install-recommends wget ca-certificates lsb-release"
                    .to_string(),
                format!("wget {}/{}", APT_REPO, release_deb),
                format!("dpkg -i {}", release_deb),
                format!("rm {}", release_deb),
                "apt-get update".to_string(),
                format!(
                    "apt-get install -y --no-install-recommends puppet-agent={}-1{}",
                    agent_version, codename
                ),
                gem_install_r10k,
                "apt-get clean".to_string(),
                "rm -rf /var/lib/apt/lists/*".to_string(),
            ]
        }
        Packaging::Yum => {
            let el_release = context
                .os_version
                .split('.')
                .next()
                .unwrap_or(&context.os_version);
            let agent_version =
                env_or(context, "puppet_agent_version", DEFAULT_PUPPET_AGENT_VERSION);
            vec![
                format!(
                    "rpm -Uvh {}/puppetlabs-release-pc1-el-{}.noarch.rpm",
                    YUM_REPO, el_release
                ),
                format!("yum install -y puppet-agent-{}", agent_version),
                gem_install_r10k,
                "yum clean all".to_string(),
            ]
        }
        Packaging::Gem => vec![
            "apk add --no-cache ruby ruby-json ca-certificates".to_string(),
            format!(
                "{}/gem install {} {} r10k:{} --no-ri --no-rdoc",
                context.gem_path,
                gem_spec(context, "facter", "facter_version"),
                gem_spec(context, "puppet", "puppet_version"),
                r10k_version
            ),
        ],
        Packaging::Unknown => return None,
    };

    Some(steps.join(" && "))
}

fn env_or<'a>(context: &'a BuildContext, key: &str, default: &'a str) -> &'a str {
    context
        .environment
        .get(key)
        .map(String::as_str)
        .unwrap_or(default)
}

/// `name:version` when the environment pins a version, else bare `name`.
fn gem_spec(context: &BuildContext, name: &str, version_key: &str) -> String {
    match context.environment.get(version_key) {
        Some(version) => format!("{}:{}", name, version),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::context::resolve_context;
    use crate::catalog::{FamilyEntry, OsCatalog};
    use crate::config::BuildOptions;
    use std::path::Path;

    fn context_with(from: &str, catalog: &OsCatalog) -> BuildContext {
        resolve_context(
            BuildOptions {
                from: Some(from.into()),
                image_name: Some("puppet/sample".into()),
                ..Default::default()
            },
            Path::new("init.pp"),
            catalog,
        )
        .unwrap()
    }

    #[test]
    fn test_apt_uses_codename() {
        let ctx = context_with("ubuntu:16.04", &OsCatalog::builtin());
        let cmd = install_command(&ctx).unwrap();
        assert!(cmd.contains("puppetlabs-release-pc1-xenial.deb"));
        assert!(cmd.contains("puppet-agent=1.8.2-1xenial"));
        assert!(cmd.contains("/opt/puppetlabs/puppet/bin/gem install r10k:2.5.1"));
    }

    #[test]
    fn test_apt_without_codename_asks_lsb_release() {
        let ctx = context_with("ubuntu:17.04", &OsCatalog::builtin());
        let cmd = install_command(&ctx).unwrap();
        assert!(cmd.contains("puppetlabs-release-pc1-$(lsb_release -cs).deb"));
    }

    #[test]
    fn test_yum_uses_major_version() {
        let ctx = context_with("centos:7.3", &OsCatalog::builtin());
        let cmd = install_command(&ctx).unwrap();
        assert!(cmd.contains("puppetlabs-release-pc1-el-7.noarch.rpm"));
        assert!(cmd.contains("yum install -y puppet-agent-1.8.2"));
    }

    #[test]
    fn test_gem_pins_catalog_versions() {
        let ctx = context_with("alpine:3.4", &OsCatalog::builtin());
        let cmd = install_command(&ctx).unwrap();
        assert!(cmd.contains("/usr/bin/gem install facter:2.4.6 puppet:4.8.1 r10k:2.5.1"));
    }

    #[test]
    fn test_gem_unpinned_without_catalog_versions() {
        let catalog = OsCatalog::new().with_family("alpine", FamilyEntry::new(Packaging::Gem));
        let ctx = context_with("alpine:3.5", &catalog);
        let cmd = install_command(&ctx).unwrap();
        assert!(cmd.contains("gem install facter puppet r10k:"));
    }

    #[test]
    fn test_unknown_has_no_install() {
        let ctx = context_with("archlinux:latest", &OsCatalog::builtin());
        assert_eq!(install_command(&ctx), None);
    }
}
