//! Python interpreter version checks for CDK apps written in Python.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::command::Invocation;
use crate::error::SynthError;

static VERSION_OUTPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Python (\d+)\.(\d+)(?:\.(\d+))?").expect("valid regex"));
static PYENV_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)").expect("valid regex"));
static SETUP_PY_REQUIRES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"python_requires\s*=\s*['"]>=(\d+)\.(\d+)"#).expect("valid regex")
});
static PYPROJECT_REQUIRES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"requires-python\s*=\s*['"]>=(\d+)\.(\d+)"#).expect("valid regex")
});

/// Oldest interpreter the CDK supports, used when the project says nothing.
pub const CDK_MINIMUM: PythonVersion = PythonVersion {
    major: 3,
    minor: 7,
    patch: 0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PythonVersion {
    /// Parse `python --version` output such as `Python 3.9.7` or `Python 3.9`.
    pub fn parse(output: &str) -> Result<Self, SynthError> {
        let caps = VERSION_OUTPUT
            .captures(output.trim())
            .ok_or_else(|| SynthError::PythonVersion {
                output: output.trim().to_string(),
            })?;
        Ok(Self {
            major: number(caps.get(1).map(|m| m.as_str())),
            minor: number(caps.get(2).map(|m| m.as_str())),
            patch: number(caps.get(3).map(|m| m.as_str())),
        })
    }

    /// `major.minor` only, as requirements are written.
    pub fn short(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    fn meets(&self, required: &PythonVersion) -> bool {
        (self.major, self.minor) >= (required.major, required.minor)
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn number(digits: Option<&str>) -> u32 {
    digits.and_then(|d| d.parse().ok()).unwrap_or(0)
}

fn major_minor(re: &Regex, text: &str) -> Option<PythonVersion> {
    let caps = re.captures(text)?;
    Some(PythonVersion {
        major: caps.get(1)?.as_str().parse().ok()?,
        minor: caps.get(2)?.as_str().parse().ok()?,
        patch: 0,
    })
}

/// Minimum Python version the project asks for.
///
/// Looks at `.python-version`, then `python_requires` in `setup.py`, then
/// `requires-python` in `pyproject.toml`; falls back to [`CDK_MINIMUM`].
pub fn required_python_version(project: &Path) -> PythonVersion {
    let read = |name: &str| std::fs::read_to_string(project.join(name)).ok();

    if let Some(v) = read(".python-version").and_then(|s| major_minor(&PYENV_VERSION, s.trim())) {
        return v;
    }
    if let Some(v) = read("setup.py").and_then(|s| major_minor(&SETUP_PY_REQUIRES, &s)) {
        return v;
    }
    if let Some(v) = read("pyproject.toml").and_then(|s| major_minor(&PYPROJECT_REQUIRES, &s)) {
        return v;
    }
    CDK_MINIMUM
}

/// Fail unless `python` is at least the project's required version.
pub async fn check_python_compatibility(
    python: &str,
    project: &Path,
) -> Result<PythonVersion, SynthError> {
    let output = Invocation::new(python).args(["--version"]).capture().await?;
    let installed = PythonVersion::parse(&output)?;
    let required = required_python_version(project);

    info!(installed = %installed, required = %required.short(), "python version");

    if installed.meets(&required) {
        Ok(installed)
    } else {
        Err(SynthError::PythonIncompatible {
            installed: installed.to_string(),
            required: required.short(),
        })
    }
}
