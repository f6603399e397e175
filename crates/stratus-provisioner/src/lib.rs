//! stratus-provisioner
//!
//! Stack-lifecycle engine: deploys synthesized CloudFormation templates and
//! runs drift detection against live stacks.
//!
//! Public API:
//! - `Deployer::deploy_all()`: create-or-update each stack, wait, collect outputs
//! - `DriftDetector::detect_all()`: detect drift on each stack, collect differences
//! - `run_sequential()`: the fail-fast, keep-partial batch loop both are built on
//! - `wait_for()`: interval polling under a deadline and a cancellation token
//!
//! All remote access goes through the [`CloudFormationApi`] trait;
//! [`CloudFormationClient`] implements it over the AWS SDK.

pub mod api;
pub mod batch;
pub mod cloudformation;
pub mod deploy;
pub mod drift;
pub mod error;
pub mod poll;

pub use crate::api::{ApiError, CloudFormationApi, OnFailure, RemoteStack, StackRequest};
pub use crate::batch::{run_sequential, BatchFailure};
pub use crate::cloudformation::CloudFormationClient;
pub use crate::deploy::Deployer;
pub use crate::drift::DriftDetector;
pub use crate::error::{Operation, ProvisionerError};
pub use crate::poll::{wait_for, PollPolicy, Tick};
