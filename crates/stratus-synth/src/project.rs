use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::SynthError;

/// Language a CDK app is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    TypeScript,
    Python,
    Go,
    Java,
    CSharp,
}

impl ProjectKind {
    /// Detect from marker files. First match wins, in this order:
    /// `package.json`, `requirements.txt` or `setup.py`, `go.mod`,
    /// `pom.xml`, any `*.csproj`.
    pub fn detect(dir: &Path) -> Result<Self, SynthError> {
        let has = |name: &str| dir.join(name).is_file();

        if has("package.json") {
            return Ok(Self::TypeScript);
        }
        if has("requirements.txt") || has("setup.py") {
            return Ok(Self::Python);
        }
        if has("go.mod") {
            return Ok(Self::Go);
        }
        if has("pom.xml") {
            return Ok(Self::Java);
        }

        let entries = std::fs::read_dir(dir).map_err(|e| SynthError::io(dir, e))?;
        let csproj = entries
            .filter_map(Result::ok)
            .any(|entry| entry.path().extension().is_some_and(|ext| ext == "csproj"));
        if csproj {
            return Ok(Self::CSharp);
        }

        Err(SynthError::UnknownProject {
            dir: dir.to_path_buf(),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Python => "python",
            Self::Go => "go",
            Self::Java => "java",
            Self::CSharp => "csharp",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
