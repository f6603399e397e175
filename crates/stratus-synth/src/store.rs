use std::path::{Path, PathBuf};

use stratus_core::{StackName, TemplateError, TemplateStore};
use tracing::warn;

const TEMPLATE_SUFFIX: &str = ".template.json";

/// Templates in a synthesized cloud assembly directory (`cdk.out`).
#[derive(Debug, Clone)]
pub struct CloudAssembly {
    dir: PathBuf,
    stacks: Vec<StackName>,
}

impl CloudAssembly {
    /// Index `<dir>/*.template.json`. Stack names come back sorted.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, TemplateError> {
        let dir = dir.into();
        let entries = std::fs::read_dir(&dir).map_err(|source| TemplateError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut stacks = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| TemplateError::Io {
                path: dir.clone(),
                source,
            })?;
            let file_name = entry.file_name();
            let Some(stem) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(TEMPLATE_SUFFIX))
            else {
                continue;
            };
            match stem.parse::<StackName>() {
                Ok(name) => stacks.push(name),
                Err(e) => warn!(file = %entry.path().display(), error = %e, "skipping template"),
            }
        }

        if stacks.is_empty() {
            return Err(TemplateError::NoTemplates { dir });
        }
        stacks.sort();

        Ok(Self { dir, stacks })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn template_path(&self, stack: &StackName) -> PathBuf {
        self.dir.join(format!("{stack}{TEMPLATE_SUFFIX}"))
    }
}

impl TemplateStore for CloudAssembly {
    fn stack_names(&self) -> Result<Vec<StackName>, TemplateError> {
        Ok(self.stacks.clone())
    }

    fn template_body(&self, stack: &StackName) -> Result<String, TemplateError> {
        if !self.stacks.contains(stack) {
            return Err(TemplateError::NotFound {
                stack: stack.to_string(),
            });
        }
        let path = self.template_path(stack);
        std::fs::read_to_string(&path).map_err(|source| TemplateError::Io { path, source })
    }
}
