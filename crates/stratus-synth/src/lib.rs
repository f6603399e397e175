//! stratus-synth
//!
//! Turns a CDK project (local or cloned from git) into CloudFormation
//! templates the provisioner can deploy.
//!
//! Public API:
//! - `clone_repository()` / `cleanup_repository()`: shallow git checkout
//! - `ProjectKind::detect()`: language of the CDK app from its marker files
//! - `install_dependencies()`: npm / venv+pip / go / maven setup
//! - `synthesize()`: run `cdk synth` and open the resulting cloud assembly
//! - `CloudAssembly`: `TemplateStore` over `cdk.out/*.template.json`

mod command;
pub mod error;
pub mod git;
pub mod install;
pub mod project;
pub mod python;
pub mod store;
pub mod synth;

pub use crate::error::SynthError;
pub use crate::git::{Checkout, cleanup_repository, clone_repository, repo_dir_name};
pub use crate::install::install_dependencies;
pub use crate::project::ProjectKind;
pub use crate::python::{PythonVersion, check_python_compatibility, required_python_version};
pub use crate::store::CloudAssembly;
pub use crate::synth::{CdkConfig, synthesize, venv_app_command};
