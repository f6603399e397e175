//! Child-process helpers for the external build tools (git, npm, pip, cdk).

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::info;

use crate::error::SynthError;

/// A tool invocation with its working directory and extra environment.
#[derive(Debug, Clone)]
pub(crate) struct Invocation<'a> {
    program: &'a str,
    args: Vec<String>,
    dir: Option<&'a Path>,
    env: Vec<(&'static str, String)>,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(program: &'a str) -> Self {
        Self {
            program,
            args: Vec::new(),
            dir: None,
            env: Vec::new(),
        }
    }

    pub(crate) fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub(crate) fn current_dir(mut self, dir: &'a Path) -> Self {
        self.dir = Some(dir);
        self
    }

    pub(crate) fn env(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.env.push((key, value.into()));
        self
    }

    /// The command line as a user would type it.
    pub(crate) fn display(&self) -> String {
        std::iter::once(self.program.to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.program);
        cmd.args(&self.args).kill_on_drop(true);
        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run with inherited stdio so tool output shows up live.
    pub(crate) async fn run(&self) -> Result<(), SynthError> {
        let command = self.display();
        info!(command = %command, "running");

        let status = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| SynthError::Spawn {
                command: command.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(SynthError::CommandFailed {
                command,
                status: status.to_string(),
            })
        }
    }

    /// Run and return stdout and stderr joined, trimmed.
    pub(crate) async fn capture(&self) -> Result<String, SynthError> {
        let command = self.display();
        let output = self
            .command()
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| SynthError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SynthError::CommandFailed {
                command,
                status: output.status.to_string(),
            });
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text.trim().to_string())
    }
}

/// Whether `program` resolves on `PATH`.
pub(crate) async fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
