use std::future::Future;
use std::pin::Pin;

use stratus_core::{
    Capability, DriftDetectionStatus, DriftedResource, ResourceDriftStatus, StackDriftStatus,
    StackName, StackOutput, StackStatus,
};
use thiserror::Error;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A failed call to the remote control plane.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Credentials missing, expired, or not authorized.
    #[error("authentication failed ({code}): {message}")]
    Auth { code: String, message: String },

    /// The request never produced a service response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service answered with an error.
    #[error("{message}")]
    Service {
        code: Option<String>,
        message: String,
    },
}

impl ApiError {
    /// CloudFormation reports a missing stack as a `ValidationError`
    /// whose message ends in "does not exist".
    pub fn is_stack_missing(&self) -> bool {
        matches!(self, Self::Service { code, message }
            if code.as_deref() == Some("ValidationError") && message.contains("does not exist"))
    }

    /// An update whose template matches the deployed one.
    pub fn is_no_updates(&self) -> bool {
        matches!(self, Self::Service { code, message }
            if code.as_deref() == Some("ValidationError")
                && message.contains("No updates are to be performed"))
    }
}

/// What CloudFormation should do when a create fails. Deploys always
/// roll back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    Rollback,
}

/// Body of a create or update request.
#[derive(Debug, Clone, Copy)]
pub struct StackRequest<'a> {
    pub stack: &'a StackName,
    pub template_body: &'a str,
    pub capabilities: &'a [Capability],
}

/// The parts of `DescribeStacks` the engine reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStack {
    pub stack_id: String,
    pub status: StackStatus,
    pub outputs: Vec<StackOutput>,
    /// Absent until drift detection has run at least once.
    pub drift_status: Option<StackDriftStatus>,
}

/// The CloudFormation calls the engine depends on.
///
/// Methods return boxed futures for dyn compatibility, so one client
/// handle can be shared by reference across every workflow.
pub trait CloudFormationApi: Send + Sync {
    /// `Ok(None)` only when the service says the stack does not exist;
    /// every other failure is an error.
    fn describe_stack<'a>(
        &'a self,
        stack: &'a StackName,
    ) -> BoxFuture<'a, Result<Option<RemoteStack>, ApiError>>;

    /// Returns the new stack's id.
    fn create_stack<'a>(
        &'a self,
        request: StackRequest<'a>,
        on_failure: OnFailure,
    ) -> BoxFuture<'a, Result<String, ApiError>>;

    /// Returns the stack id, or `None` when there was nothing to update.
    fn update_stack<'a>(
        &'a self,
        request: StackRequest<'a>,
    ) -> BoxFuture<'a, Result<Option<String>, ApiError>>;

    /// Starts drift detection and returns the detection id.
    fn detect_stack_drift<'a>(
        &'a self,
        stack: &'a StackName,
    ) -> BoxFuture<'a, Result<String, ApiError>>;

    fn describe_drift_detection<'a>(
        &'a self,
        detection_id: &'a str,
    ) -> BoxFuture<'a, Result<DriftDetectionStatus, ApiError>>;

    /// Per-resource drift records matching `filter`, in service order.
    fn describe_resource_drifts<'a>(
        &'a self,
        stack: &'a StackName,
        filter: &'a [ResourceDriftStatus],
    ) -> BoxFuture<'a, Result<Vec<DriftedResource>, ApiError>>;
}
