//! stratus-cli
//!
//! The `stratus` command: synthesize a CDK app, deploy its stacks, or
//! check them for drift.

pub mod aws;
pub mod cli;
pub mod config;
pub mod report;
pub mod run;
