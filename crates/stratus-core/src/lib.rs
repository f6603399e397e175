//! stratus-core
//!
//! Pure domain types for stack deployment and drift inspection.
//! Nothing here talks to AWS. Shared by every other stratus crate.

pub mod error;
pub mod models;
pub mod template;

pub use crate::error::{CoreError, TemplateError};
pub use crate::models::drift::{
    DifferenceType, DriftDetectionJob, DriftDetectionStatus, DriftOutcome, DriftedResource,
    PropertyDiff, ResourceDriftStatus, StackDriftStatus,
};
pub use crate::models::stack::{
    Capability, DeployOutcome, StackName, StackOutput, StackStatus, StatusPhase,
};
pub use crate::template::TemplateStore;
