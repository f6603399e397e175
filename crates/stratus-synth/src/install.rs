use std::path::Path;

use tracing::info;

use crate::command::{Invocation, command_exists};
use crate::error::SynthError;
use crate::project::ProjectKind;
use crate::python;

/// Virtual environment directory created inside Python projects.
pub const VENV_DIR: &str = ".venv";

/// Install the project's dependencies with its native tooling.
pub async fn install_dependencies(project: &Path, kind: ProjectKind) -> Result<(), SynthError> {
    match kind {
        ProjectKind::TypeScript => {
            if project.join("node_modules").is_dir() {
                info!("node_modules present, skipping npm install");
                return Ok(());
            }
            info!("installing npm dependencies");
            Invocation::new("npm")
                .args(["install"])
                .current_dir(project)
                .run()
                .await
        }
        ProjectKind::Python => install_python(project).await,
        ProjectKind::Go => {
            info!("installing Go dependencies");
            Invocation::new("go")
                .args(["mod", "download"])
                .current_dir(project)
                .run()
                .await
        }
        ProjectKind::Java => {
            info!("installing Java dependencies");
            Invocation::new("mvn")
                .args(["dependency:resolve"])
                .current_dir(project)
                .run()
                .await
        }
        ProjectKind::CSharp => Err(SynthError::UnsupportedProject(kind)),
    }
}

async fn install_python(project: &Path) -> Result<(), SynthError> {
    // pip is invoked by path from inside the project
    let project = std::path::absolute(project).map_err(|e| SynthError::io(project, e))?;
    let project = project.as_path();
    let interpreter = if command_exists("python3").await {
        "python3"
    } else {
        "python"
    };

    python::check_python_compatibility(interpreter, project).await?;

    if !project.join(VENV_DIR).is_dir() {
        info!("creating Python virtual environment");
        Invocation::new(interpreter)
            .args(["-m", "venv", VENV_DIR])
            .current_dir(project)
            .run()
            .await?;
    }

    info!("installing Python dependencies in virtual environment");
    let pip = project.join(VENV_DIR).join("bin").join("pip");
    let pip = pip.to_string_lossy();
    Invocation::new(&pip)
        .args(["install", "-r", "requirements.txt"])
        .current_dir(project)
        .run()
        .await
}
