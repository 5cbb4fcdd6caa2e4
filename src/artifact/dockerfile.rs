//! Dockerfile rendering.

use super::{Artifact, ArtifactRenderer, Instruction};

/// Renders an artifact as a Dockerfile.
///
/// acbuild-only instructions ([`Instruction::SetName`], [`Instruction::Exec`],
/// [`Instruction::Write`], [`Instruction::End`]) have no Dockerfile form and
/// are skipped.
pub struct DockerfileRenderer;

impl ArtifactRenderer for DockerfileRenderer {
    fn render(&self, artifact: &Artifact) -> String {
        let mut out = String::new();
        for instruction in &artifact.instructions {
            if let Some(line) = render_instruction(instruction) {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }
}

fn render_instruction(instruction: &Instruction) -> Option<String> {
    let line = match instruction {
        Instruction::From(image) => format!("FROM {}", image),
        Instruction::Maintainer(who) => format!("LABEL maintainer={}", quote(who)),
        Instruction::Label(key, value) => format!("LABEL {}={}", key, quote(value)),
        Instruction::Env(pairs) => {
            let assignments: Vec<String> = pairs
                .iter()
                .map(|(key, value)| format!("{}={}", key, quote(value)))
                .collect();
            format!("ENV {}", assignments.join(" "))
        }
        Instruction::Run(command) => format!("RUN {}", command),
        Instruction::Copy {
            source,
            destination,
        } => format!("COPY {} {}", source, destination),
        Instruction::Expose(port) => format!("EXPOSE {}", port),
        Instruction::Volume(path) => format!("VOLUME {}", exec_form(std::slice::from_ref(path))),
        Instruction::Entrypoint(args) => format!("ENTRYPOINT {}", exec_form(args)),
        Instruction::Cmd(args) => format!("CMD {}", exec_form(args)),
        Instruction::SetName(_) | Instruction::Exec(_) | Instruction::Write(_) | Instruction::End => {
            return None
        }
    };
    Some(line)
}

/// Double-quote a value, keeping `$VAR` references expandable.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// JSON array form, so arguments are passed without a shell.
fn exec_form(args: &[String]) -> String {
    serde_json::Value::from(args.to_vec()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{generate_artifact, ArtifactKind};
    use crate::build::context::resolve_context;
    use crate::catalog::OsCatalog;
    use crate::config::BuildOptions;
    use std::path::Path;

    fn render(instructions: Vec<Instruction>) -> String {
        DockerfileRenderer.render(&Artifact {
            kind: ArtifactKind::Dockerfile,
            instructions,
        })
    }

    #[test]
    fn test_render_basic_instructions() {
        let text = render(vec![
            Instruction::From("debian:8".into()),
            Instruction::Label("tier".into(), "web \"front\"".into()),
            Instruction::Env(vec![
                ("CODENAME".into(), "jessie".into()),
                ("PATH".into(), "/opt/puppetlabs/bin:$PATH".into()),
            ]),
            Instruction::Run("echo hi".into()),
            Instruction::Copy {
                source: "init.pp".into(),
                destination: "/manifest.pp".into(),
            },
            Instruction::Expose("80".into()),
        ]);

        assert_eq!(
            text,
            "FROM debian:8\n\
             LABEL tier=\"web \\\"front\\\"\"\n\
             ENV CODENAME=\"jessie\" PATH=\"/opt/puppetlabs/bin:$PATH\"\n\
             RUN echo hi\n\
             COPY init.pp /manifest.pp\n\
             EXPOSE 80\n"
        );
    }

    #[test]
    fn test_exec_form() {
        let text = render(vec![
            Instruction::Entrypoint(vec!["nginx".into()]),
            Instruction::Cmd(vec!["-g".into(), "daemon off;".into()]),
            Instruction::Volume("/data".into()),
        ]);
        assert_eq!(
            text,
            "ENTRYPOINT [\"nginx\"]\nCMD [\"-g\",\"daemon off;\"]\nVOLUME [\"/data\"]\n"
        );
    }

    #[test]
    fn test_acbuild_only_instructions_skipped() {
        let text = render(vec![
            Instruction::From("debian:8".into()),
            Instruction::SetName("puppet/sample".into()),
            Instruction::Write("sample.aci".into()),
            Instruction::End,
        ]);
        assert_eq!(text, "FROM debian:8\n");
    }

    #[test]
    fn test_generated_dockerfile() {
        let ctx = resolve_context(
            BuildOptions {
                from: Some("debian:8".into()),
                image_name: Some("puppet/sample".into()),
                maintainer: Some("Ops <ops@example.com>".into()),
                ..Default::default()
            },
            Path::new("manifests/init.pp"),
            &OsCatalog::builtin(),
        )
        .unwrap();
        let text = generate_artifact(&ctx, ArtifactKind::Dockerfile).render();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "FROM debian:8");
        assert_eq!(lines[1], "LABEL maintainer=\"Ops <ops@example.com>\"");
        assert!(text.contains("ENV CODENAME=\"jessie\""));
        assert!(text.contains("COPY manifests/init.pp /manifest.pp\n"));
        assert!(lines.last().unwrap().starts_with("RUN /opt/puppetlabs/bin/puppet apply"));
    }
}
