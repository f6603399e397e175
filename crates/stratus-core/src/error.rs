use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid stack name: {0:?}")]
    InvalidStackName(String),
}

/// Failures reading synthesized templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("no template found for stack {stack}")]
    NotFound { stack: String },

    #[error("no CloudFormation templates found in {}", dir.display())]
    NoTemplates { dir: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
