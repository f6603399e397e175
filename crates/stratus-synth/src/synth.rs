use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::command::Invocation;
use crate::error::SynthError;
use crate::install::VENV_DIR;
use crate::project::ProjectKind;
use crate::store::CloudAssembly;

/// Output directory for synthesized templates, relative to the project.
pub const CDK_OUT: &str = "cdk.out";

/// The parts of `cdk.json` synthesis needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CdkConfig {
    pub app: String,
}

impl CdkConfig {
    pub fn load(project: &Path) -> Result<Self, SynthError> {
        let path = project.join("cdk.json");
        let raw = std::fs::read_to_string(&path).map_err(|e| SynthError::io(&path, e))?;
        serde_json::from_str(&raw).map_err(|source| SynthError::CdkConfig { path, source })
    }
}

/// Synthesize the CDK app in `project` and open the resulting assembly.
///
/// cdk runs with the project as its working directory, so the project path
/// is made absolute before any output path is derived from it.
pub async fn synthesize(project: &Path, kind: ProjectKind) -> Result<CloudAssembly, SynthError> {
    let project = std::path::absolute(project).map_err(|e| SynthError::io(project, e))?;
    let project = project.as_path();
    let config = CdkConfig::load(project)?;
    if config.app.split_whitespace().next().is_none() {
        return Err(SynthError::EmptyAppCommand);
    }
    info!(app = %config.app, "CDK app command");

    let out_dir = project.join(CDK_OUT);
    let mut app = config.app.clone();

    if kind == ProjectKind::TypeScript
        && !app.contains("ts-node")
        && project.join("tsconfig.json").is_file()
    {
        info!("compiling TypeScript");
        // the app may still run through ts-node, so a failed compile is not fatal
        if let Err(e) = Invocation::new("npx")
            .args(["tsc"])
            .current_dir(project)
            .run()
            .await
        {
            warn!(error = %e, "TypeScript compilation failed, continuing");
        }
    }

    let mut synth = Invocation::new("npx")
        .current_dir(project)
        .env("CDK_OUTDIR", out_dir.to_string_lossy());

    if kind == ProjectKind::Python {
        let venv = project.join(VENV_DIR);
        let venv_bin = venv.join("bin");
        app = venv_app_command(&app, &venv_bin.join("python"));

        let path = std::env::var("PATH").unwrap_or_default();
        synth = synth
            .env("PATH", format!("{}:{path}", venv_bin.display()))
            .env("VIRTUAL_ENV", venv.to_string_lossy());
    }

    info!(out_dir = %out_dir.display(), "synthesizing CDK app");
    synth
        .args(["cdk", "synth", "--app"])
        .args([app])
        .args(["--output".to_string(), out_dir.to_string_lossy().into_owned()])
        .run()
        .await?;

    Ok(CloudAssembly::open(out_dir)?)
}

/// Point a leading `python`/`python3` in the app command at the venv
/// interpreter.
pub fn venv_app_command(app: &str, venv_python: &Path) -> String {
    let venv_python = venv_python.display();
    if let Some(rest) = app.strip_prefix("python3 ") {
        format!("{venv_python} {rest}")
    } else if let Some(rest) = app.strip_prefix("python ") {
        format!("{venv_python} {rest}")
    } else {
        app.to_string()
    }
}
