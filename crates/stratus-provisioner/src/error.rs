use std::fmt;
use std::time::Duration;

use stratus_core::{StackName, StackStatus, TemplateError};
use thiserror::Error;

use crate::api::ApiError;

/// The remote call (or local step) a workflow was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    DescribeStack,
    CreateStack,
    UpdateStack,
    CollectOutputs,
    DetectDrift,
    DescribeDriftDetection,
    DescribeResourceDrifts,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::DescribeStack => "DescribeStacks",
            Self::CreateStack => "CreateStack",
            Self::UpdateStack => "UpdateStack",
            Self::CollectOutputs => "collecting outputs",
            Self::DetectDrift => "DetectStackDrift",
            Self::DescribeDriftDetection => "DescribeStackDriftDetectionStatus",
            Self::DescribeResourceDrifts => "DescribeStackResourceDrifts",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("stack {stack} does not exist")]
    StackNotFound { stack: StackName },

    #[error("reading template for stack {stack}: {source}")]
    Template {
        stack: StackName,
        #[source]
        source: TemplateError,
    },

    #[error("{operation} for stack {stack}: cannot reach or authenticate to CloudFormation: {message}")]
    Transport {
        stack: StackName,
        operation: Operation,
        message: String,
    },

    #[error("{operation} rejected for stack {stack}: {message}")]
    Rejected {
        stack: StackName,
        operation: Operation,
        message: String,
    },

    #[error("{operation} failed for stack {stack}: {message}")]
    Api {
        stack: StackName,
        operation: Operation,
        message: String,
    },

    #[error("stack {stack} operation failed with status {status}")]
    OperationFailed { stack: StackName, status: StackStatus },

    #[error("stack {stack} is at {status} and its template is unchanged, so no update was submitted")]
    Unchanged { stack: StackName, status: StackStatus },

    #[error("drift detection {detection_id} for stack {stack} failed: {reason}")]
    DriftDetectionFailed {
        stack: StackName,
        detection_id: String,
        reason: String,
    },

    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    #[error("cancelled while waiting for {what}")]
    Cancelled { what: String },
}

impl ProvisionerError {
    /// Wrap a failed read. Service errors stay ordinary API failures.
    pub(crate) fn query(stack: &StackName, operation: Operation, err: ApiError) -> Self {
        match err {
            ApiError::Service { message, .. } => Self::Api {
                stack: stack.clone(),
                operation,
                message,
            },
            other => Self::transport(stack, operation, other),
        }
    }

    /// Wrap a failed mutating request. Service errors become rejections.
    pub(crate) fn submission(stack: &StackName, operation: Operation, err: ApiError) -> Self {
        match err {
            ApiError::Service { message, .. } => Self::Rejected {
                stack: stack.clone(),
                operation,
                message,
            },
            other => Self::transport(stack, operation, other),
        }
    }

    fn transport(stack: &StackName, operation: Operation, err: ApiError) -> Self {
        Self::Transport {
            stack: stack.clone(),
            operation,
            message: err.to_string(),
        }
    }

    /// True when the caller asked to stop, as opposed to a remote failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Walk the full error chain and join all causes into one string.
///
/// AWS SDK errors often have terse `Display` impls (e.g. "service error")
/// but useful detail in the source chain.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
