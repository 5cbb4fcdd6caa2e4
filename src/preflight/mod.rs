//! Host checks run before handing a build to an external tool.
//!
//! `image-build docker build` and `image-build aci build` spawn docker,
//! rocker or acbuild. [`check_build_tool`] looks the program up on `PATH`
//! first so a missing tool is reported with the package that provides it.

use anyhow::{bail, Result};

use crate::build::plan::BuildCommand;

/// Build tools and the package that usually provides each.
pub const BUILD_TOOLS: &[(&str, &str)] = &[
    ("docker", "docker-ce"),
    ("rocker", "rocker"),
    ("acbuild", "acbuild"),
];

/// Whether `program` resolves on the host's `PATH`.
pub fn command_exists(program: &str) -> bool {
    which::which(program).is_ok()
}

/// Fail unless the program `command` runs is installed.
pub fn check_build_tool(command: &BuildCommand) -> Result<()> {
    let program = command.program.as_str();
    if command_exists(program) {
        return Ok(());
    }

    match BUILD_TOOLS.iter().find(|(tool, _)| *tool == program) {
        Some((_, package)) => bail!(
            "build tool '{}' is not on PATH; install the '{}' package to run `{}`",
            program,
            package,
            command
        ),
        None => bail!("build tool '{}' is not on PATH; cannot run `{}`", program, command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(program: &str) -> BuildCommand {
        BuildCommand {
            program: program.into(),
            args: vec!["build".into()],
        }
    }

    #[test]
    fn test_present_tool_passes() {
        assert!(command_exists("sh"));
        assert!(check_build_tool(&command("sh")).is_ok());
    }

    #[test]
    fn test_unknown_missing_tool() {
        let err = check_build_tool(&command("no_such_image_builder_tool"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("'no_such_image_builder_tool' is not on PATH"));
        assert!(err.contains("no_such_image_builder_tool build"));
        assert!(!err.contains("package"));
    }

    #[test]
    fn test_known_tools_name_their_package() {
        for (tool, package) in BUILD_TOOLS {
            if command_exists(tool) {
                continue;
            }
            let err = check_build_tool(&command(tool)).unwrap_err().to_string();
            assert!(err.contains(&format!("'{}' package", package)));
        }
    }
}
