use std::io;
use std::path::PathBuf;

use stratus_core::TemplateError;
use thiserror::Error;

use crate::project::ProjectKind;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {status}")]
    CommandFailed { command: String, status: String },

    #[error("unable to detect CDK project type in {}", dir.display())]
    UnknownProject { dir: PathBuf },

    #[error("dependency install is not supported for {0} projects")]
    UnsupportedProject(ProjectKind),

    #[error("failed to parse Python version from: {output}")]
    PythonVersion { output: String },

    #[error("python version {installed} is incompatible with project requirements (>={required})")]
    PythonIncompatible { installed: String, required: String },

    #[error("invalid cdk.json at {}: {source}", path.display())]
    CdkConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("empty app command in cdk.json")]
    EmptyAppCommand,

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl SynthError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
