use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use stratus_core::StackName;

#[derive(Parser, Debug)]
#[command(name = "stratus")]
#[command(version, about = "Synthesize, deploy, and drift-check CDK stacks", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: <config dir>/stratus/config.json)
    #[arg(long, global = true, env = "STRATUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// AWS region, overriding the config file
    #[arg(long, global = true, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Named AWS profile, overriding the config file
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synthesize CloudFormation templates from a CDK app
    Synth(SynthArgs),

    /// Create or update every synthesized stack, in name order
    Deploy(DeployArgs),

    /// Run drift detection on deployed stacks
    Drift(DriftArgs),

    /// Manage the config file
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Where the CDK app comes from.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Git URL to shallow-clone
    #[arg(long)]
    pub repo: Option<String>,

    /// Local CDK project directory
    #[arg(long)]
    pub project: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckoutArgs {
    /// Parent directory for the clone (default: a temp directory)
    #[arg(long, requires = "repo")]
    pub dest: Option<PathBuf>,

    /// Keep the cloned repository afterwards
    #[arg(long)]
    pub keep: bool,

    /// Skip dependency installation
    #[arg(long)]
    pub skip_install: bool,
}

#[derive(Args, Debug)]
pub struct SynthArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub checkout: CheckoutArgs,
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub checkout: CheckoutArgs,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DriftArgs {
    /// Stack to check (repeatable); skips synthesis
    #[arg(long = "stack", value_name = "NAME")]
    pub stacks: Vec<StackName>,

    /// Git URL to synthesize the stack list from
    #[arg(long, conflicts_with_all = ["stacks", "project"])]
    pub repo: Option<String>,

    /// Local CDK project to synthesize the stack list from
    #[arg(long, conflicts_with = "stacks")]
    pub project: Option<PathBuf>,

    #[command(flatten)]
    pub checkout: CheckoutArgs,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

impl DriftArgs {
    pub fn source(&self) -> Option<SourceArgs> {
        if self.repo.is_none() && self.project.is_none() {
            return None;
        }
        Some(SourceArgs {
            repo: self.repo.clone(),
            project: self.project.clone(),
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a config file from `--region` and `--profile`
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective config with secrets redacted
    Show,
}
