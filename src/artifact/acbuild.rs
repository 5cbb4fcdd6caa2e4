//! acbuild script rendering.
//!
//! The script is fed to `acbuild script`, one acbuild subcommand per line.
//! Docker base images are pulled through acbuild's `docker://` dependency
//! support.

use super::{Artifact, ArtifactRenderer, Instruction};

/// Renders an artifact as an acbuild script.
pub struct AcbuildRenderer;

impl ArtifactRenderer for AcbuildRenderer {
    fn render(&self, artifact: &Artifact) -> String {
        let mut out = String::new();
        for instruction in &artifact.instructions {
            for line in render_instruction(instruction) {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }
}

fn render_instruction(instruction: &Instruction) -> Vec<String> {
    match instruction {
        Instruction::From(image) => vec![format!("begin docker://{}", image)],
        Instruction::SetName(name) => vec![format!("set-name {}", name)],
        Instruction::Maintainer(who) => vec![format!("annotation add authors {}", quote(who))],
        Instruction::Label(key, value) => {
            vec![format!("annotation add {} {}", key, quote(value))]
        }
        Instruction::Env(pairs) => pairs
            .iter()
            .map(|(key, value)| format!("environment add {} {}", key, quote(value)))
            .collect(),
        Instruction::Run(command) => vec![format!("run -- /bin/sh -c {}", quote(command))],
        Instruction::Copy {
            source,
            destination,
        } => vec![format!("copy {} {}", source, destination)],
        Instruction::Expose(port) => {
            let (number, protocol) = port.split_once('/').unwrap_or((port.as_str(), "tcp"));
            vec![format!("port add {protocol}-{number} {protocol} {number}")]
        }
        Instruction::Volume(path) => {
            vec![format!("mount add {} {}", mount_name(path), path)]
        }
        Instruction::Entrypoint(args) | Instruction::Cmd(args) | Instruction::Exec(args) => {
            let args: Vec<String> = args.iter().map(|a| quote(a)).collect();
            vec![format!("set-exec -- {}", args.join(" "))]
        }
        Instruction::Write(file) => vec![format!("write --overwrite {}", file)],
        Instruction::End => vec!["end".to_string()],
    }
}

/// Single-quote a word unless it is made only of safe characters.
fn quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

/// ACI mount point name for a volume path: `/var/lib/data` -> `var-lib-data`.
fn mount_name(path: &str) -> String {
    let name: String = path
        .trim_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    if name.is_empty() {
        "root".to_string()
    } else {
        name
    }
}
