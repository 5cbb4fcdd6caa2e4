use anyhow::{bail, Context, Result};
use image_build::preflight::check_build_tool;
use image_build::{ArtifactKind, BuildCommand, ImageBuilder, OsCatalog};
use std::path::Path;
use std::process::Command;

use crate::{Action, BuildArgs};

pub(crate) fn run(kind: ArtifactKind, action: Action, args: &BuildArgs) -> Result<()> {
    let catalog = OsCatalog::builtin();
    let manifest = crate::workflows::manifest_in_context(&args.context_dir, &args.manifest)?;
    let options = crate::workflows::options_in_context(&args.context_dir, args.options())?;
    let builder = ImageBuilder::new(manifest, options, &catalog);

    match action {
        Action::Context => {
            let context = builder.context().with_context(|| {
                format!("resolving build context for '{}'", builder.manifest().display())
            })?;
            println!("{}", serde_json::to_string_pretty(context)?);
        }
        Action::Write => {
            let path = builder.write_artifact(kind, &args.context_dir)?;
            println!("[{kind}] wrote {}", path.display());
        }
        Action::Build => {
            let path = builder.write_artifact(kind, &args.context_dir)?;
            println!("[{kind}] wrote {}", path.display());
            let command = builder.build_command(kind)?;
            run_build_command(&command, &args.context_dir)?;
            println!("[{kind}] built {}", builder.context()?.image_name);
        }
    }

    Ok(())
}

fn run_build_command(command: &BuildCommand, dir: &Path) -> Result<()> {
    check_build_tool(command)?;

    println!("[build] {}", command);
    let status = Command::new(&command.program)
        .args(&command.args)
        .current_dir(dir)
        .status()
        .with_context(|| format!("running '{}' in {}", command, dir.display()))?;

    if !status.success() {
        bail!("'{}' failed with status {status}", command.program);
    }

    Ok(())
}
