//! Command implementations: source checkout, synthesis, and the deploy and
//! drift batches.

use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use stratus_core::{StackName, TemplateStore};
use stratus_provisioner::{BatchFailure, CloudFormationClient, Deployer, DriftDetector};
use stratus_synth::{Checkout, CloudAssembly, ProjectKind, SynthError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::aws;
use crate::cli::{CheckoutArgs, Cli, Commands, ConfigCommand, DeployArgs, DriftArgs, SourceArgs};
use crate::config::{self, StratusConfig};
use crate::report::{self, BatchReport};

/// Settings shared by the synth, deploy, and drift commands.
pub struct Context {
    pub config: StratusConfig,
    pub cancel: CancellationToken,
}

pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> eyre::Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let region = cli.region.as_deref();
    let profile = cli.profile.as_deref();

    let context = || -> eyre::Result<Context> {
        let config = config::load_or_default(&config_path)?;
        Ok(Context {
            config: config::with_overrides(config, region, profile),
            cancel: cancel.clone(),
        })
    };

    match &cli.command {
        Commands::Synth(args) => synth(&context()?, &args.source, &args.checkout).await,
        Commands::Deploy(args) => deploy(&context()?, args).await,
        Commands::Drift(args) => drift(&context()?, args).await,
        Commands::Config(command) => run_config(&config_path, command, region, profile),
    }
}

/// A CDK project on disk. A clone is removed on drop unless kept.
pub struct Workspace {
    pub project: PathBuf,
    checkout: Option<Checkout>,
    keep: bool,
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(checkout) = &self.checkout
            && !self.keep
        {
            stratus_synth::cleanup_repository(checkout);
        }
    }
}

/// Run `work` unless the token fires first. Dropping `work` kills any
/// child process it spawned.
async fn cancellable<T>(
    cancel: &CancellationToken,
    what: &str,
    work: impl Future<Output = Result<T, SynthError>>,
) -> eyre::Result<T> {
    tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(eyre::eyre!("cancelled during {what}")),
        result = work => Ok(result?),
    }
}

/// Child processes run inside the project, so paths from the command line
/// are resolved against our own working directory first.
fn absolute(path: &Path) -> eyre::Result<PathBuf> {
    std::path::absolute(path)
        .map_err(|e| eyre::eyre!("failed to resolve {}: {e}", path.display()))
}

pub async fn prepare(
    source: &SourceArgs,
    checkout: &CheckoutArgs,
    cancel: &CancellationToken,
) -> eyre::Result<Workspace> {
    if let Some(url) = &source.repo {
        let dest = checkout.dest.as_deref().map(absolute).transpose()?;
        let cloned = cancellable(
            cancel,
            "clone",
            stratus_synth::clone_repository(url, dest.as_deref()),
        )
        .await?;
        return Ok(Workspace {
            project: cloned.path.clone(),
            checkout: Some(cloned),
            keep: checkout.keep,
        });
    }

    let project = source
        .project
        .as_deref()
        .ok_or_else(|| eyre::eyre!("either --repo or --project is required"))?;
    let project = absolute(project)?;
    if !project.is_dir() {
        return Err(eyre::eyre!("{} is not a directory", project.display()));
    }
    Ok(Workspace {
        project,
        checkout: None,
        keep: true,
    })
}

pub async fn synthesize(
    workspace: &Workspace,
    checkout: &CheckoutArgs,
    cancel: &CancellationToken,
) -> eyre::Result<CloudAssembly> {
    let project = workspace.project.as_path();
    let kind = ProjectKind::detect(project)?;
    info!(project = %project.display(), kind = %kind, "detected CDK project");

    if checkout.skip_install {
        info!("skipping dependency installation");
    } else {
        cancellable(
            cancel,
            "dependency install",
            stratus_synth::install_dependencies(project, kind),
        )
        .await?;
    }

    cancellable(cancel, "synthesis", stratus_synth::synthesize(project, kind)).await
}

async fn synth(ctx: &Context, source: &SourceArgs, checkout: &CheckoutArgs) -> eyre::Result<()> {
    let workspace = prepare(source, checkout, &ctx.cancel).await?;
    let assembly = synthesize(&workspace, checkout, &ctx.cancel).await?;

    let mut out = io::stdout().lock();
    writeln!(out, "Templates: {}", assembly.dir().display())?;
    for stack in assembly.stack_names()? {
        writeln!(out, "  {stack}")?;
    }
    Ok(())
}

async fn connect(ctx: &Context) -> eyre::Result<aws_config::SdkConfig> {
    let sdk = aws::build_aws_config(ctx.config.region.as_deref(), &ctx.config.credentials).await;

    let identity = tokio::select! {
        biased;

        _ = ctx.cancel.cancelled() => return Err(eyre::eyre!("cancelled during credential check")),
        identity = aws::validate_credentials(&sdk) => identity?,
    };
    info!(account = %identity.account_id, arn = %identity.arn, "credentials valid");
    Ok(sdk)
}

async fn deploy(ctx: &Context, args: &DeployArgs) -> eyre::Result<()> {
    let workspace = prepare(&args.source, &args.checkout, &ctx.cancel).await?;
    let assembly = synthesize(&workspace, &args.checkout, &ctx.cancel).await?;
    let stacks = assembly.stack_names()?;
    info!(stacks = stacks.len(), "deploying synthesized stacks");

    let sdk = connect(ctx).await?;
    let client = CloudFormationClient::new(&sdk);
    let deployer = Deployer::new(&client, &assembly, ctx.cancel.clone())
        .with_policy(ctx.config.polling.stack_policy());

    match deployer.deploy_all(&stacks).await {
        Ok(outcomes) => {
            render(args.json, &BatchReport::complete(&outcomes), |out, r| {
                report::write_deploy(out, r)
            })?;
            info!(stacks = outcomes.len(), "deploy complete");
            Ok(())
        }
        Err(failure) => fail(args.json, failure, |out, r| report::write_deploy(out, r)),
    }
}

async fn drift(ctx: &Context, args: &DriftArgs) -> eyre::Result<()> {
    let stacks = drift_targets(ctx, args).await?;

    let sdk = connect(ctx).await?;
    let client = CloudFormationClient::new(&sdk);
    let detector = DriftDetector::new(&client, ctx.cancel.clone())
        .with_policy(ctx.config.polling.drift_policy());

    match detector.detect_all(&stacks).await {
        Ok(outcomes) => {
            render(args.json, &BatchReport::complete(&outcomes), |out, r| {
                report::write_drift(out, r)
            })?;
            info!(stacks = outcomes.len(), "drift check complete");
            Ok(())
        }
        Err(failure) => fail(args.json, failure, |out, r| report::write_drift(out, r)),
    }
}

/// Stacks named on the command line, or every stack the app synthesizes.
async fn drift_targets(ctx: &Context, args: &DriftArgs) -> eyre::Result<Vec<StackName>> {
    if !args.stacks.is_empty() {
        return Ok(args.stacks.clone());
    }
    let source = args
        .source()
        .ok_or_else(|| eyre::eyre!("pass --stack, or --repo/--project to synthesize the stack list"))?;

    let workspace = prepare(&source, &args.checkout, &ctx.cancel).await?;
    let assembly = synthesize(&workspace, &args.checkout, &ctx.cancel).await?;
    Ok(assembly.stack_names()?)
}

fn render<T: Serialize>(
    json: bool,
    batch: &BatchReport<'_, T>,
    human: impl FnOnce(&mut io::StdoutLock<'static>, &[T]) -> io::Result<()>,
) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if json {
        report::write_json(&mut out, batch)
    } else {
        human(&mut out, batch.results)
    }
}

/// Print what finished before the failure, then surface the failure.
fn fail<T: Serialize + std::fmt::Debug + Send + Sync + 'static>(
    json: bool,
    failure: BatchFailure<T>,
    human: impl FnOnce(&mut io::StdoutLock<'static>, &[T]) -> io::Result<()>,
) -> eyre::Result<()> {
    if !failure.skipped.is_empty() {
        let skipped: Vec<_> = failure.skipped.iter().map(StackName::as_str).collect();
        warn!(skipped = ?skipped, "stacks not attempted");
    }

    let error = failure.source.to_string();
    render(
        json,
        &BatchReport {
            results: &failure.completed,
            failed_stack: Some(&failure.stack),
            error: Some(error),
            skipped: &failure.skipped,
        },
        human,
    )?;
    Err(failure.into())
}

fn run_config(
    path: &Path,
    command: &ConfigCommand,
    region: Option<&str>,
    profile: Option<&str>,
) -> eyre::Result<()> {
    match command {
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(eyre::eyre!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                ));
            }
            let config = config::with_overrides(StratusConfig::default(), region, profile);
            config::save_config(path, &config)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        ConfigCommand::Show => {
            let config = config::with_overrides(config::load_or_default(path)?, region, profile);
            let info = config::config_info(path, &config);
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
    }
}
