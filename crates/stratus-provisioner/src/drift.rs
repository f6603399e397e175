use stratus_core::{
    DriftDetectionJob, DriftDetectionStatus, DriftOutcome, ResourceDriftStatus, StackDriftStatus,
    StackName,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::CloudFormationApi;
use crate::batch::{self, BatchFailure};
use crate::error::{Operation, ProvisionerError};
use crate::poll::{self, PollPolicy, Tick};

/// Runs CloudFormation drift detection and gathers the differences.
pub struct DriftDetector<'a> {
    api: &'a dyn CloudFormationApi,
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl<'a> DriftDetector<'a> {
    pub fn new(api: &'a dyn CloudFormationApi, cancel: CancellationToken) -> Self {
        Self {
            api,
            policy: PollPolicy::DRIFT_DETECTION,
            cancel,
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Check every stack in order, stopping at the first failure.
    pub async fn detect_all(
        &self,
        stacks: &[StackName],
    ) -> Result<Vec<DriftOutcome>, BatchFailure<DriftOutcome>> {
        batch::run_sequential(stacks, move |stack| self.detect(stack)).await
    }

    /// Start detection, wait for it, and collect the report.
    pub async fn detect(&self, stack: &StackName) -> Result<DriftOutcome, ProvisionerError> {
        let job = self.start(stack).await?;
        self.wait(&job).await?;
        let outcome = self.results(stack).await?;

        info!(
            stack = %stack,
            drift_status = %outcome.drift_status,
            drifted = outcome.drifted_resources.len(),
            "drift detection complete"
        );
        Ok(outcome)
    }

    /// Start a detection job. The stack must already exist.
    pub async fn start(&self, stack: &StackName) -> Result<DriftDetectionJob, ProvisionerError> {
        let exists = self
            .api
            .describe_stack(stack)
            .await
            .map_err(|e| ProvisionerError::query(stack, Operation::DescribeStack, e))?
            .is_some();
        if !exists {
            return Err(ProvisionerError::StackNotFound {
                stack: stack.clone(),
            });
        }

        let detection_id = self
            .api
            .detect_stack_drift(stack)
            .await
            .map_err(|e| ProvisionerError::submission(stack, Operation::DetectDrift, e))?;

        info!(stack = %stack, detection_id = %detection_id, "drift detection started");

        Ok(DriftDetectionJob {
            stack: stack.clone(),
            detection_id,
            status: DriftDetectionStatus::InProgress,
        })
    }

    /// Poll the detection job until it completes.
    ///
    /// `DETECTION_FAILED` is returned as
    /// [`ProvisionerError::DriftDetectionFailed`] with the service's reason.
    pub async fn wait(&self, job: &DriftDetectionJob) -> Result<DriftDetectionJob, ProvisionerError> {
        let stack = &job.stack;
        let detection_id = job.detection_id.as_str();
        let what = format!("drift detection {detection_id} on stack {stack}");

        let status = poll::wait_for(self.policy, &self.cancel, &what, move || async move {
            let status = self
                .api
                .describe_drift_detection(detection_id)
                .await
                .map_err(|e| ProvisionerError::query(stack, Operation::DescribeDriftDetection, e))?;

            match status {
                DriftDetectionStatus::Complete => Ok(Tick::Done(status)),
                DriftDetectionStatus::Failed { reason } => {
                    Err(ProvisionerError::DriftDetectionFailed {
                        stack: stack.clone(),
                        detection_id: detection_id.to_string(),
                        reason,
                    })
                }
                DriftDetectionStatus::InProgress => {
                    Ok(Tick::Pending("DETECTION_IN_PROGRESS".to_string()))
                }
            }
        })
        .await?;

        Ok(DriftDetectionJob {
            status,
            ..job.clone()
        })
    }

    /// Fetch the stack's overall drift status and every modified, deleted,
    /// or not-checked resource with its property differences.
    pub async fn results(&self, stack: &StackName) -> Result<DriftOutcome, ProvisionerError> {
        let current = self
            .api
            .describe_stack(stack)
            .await
            .map_err(|e| ProvisionerError::query(stack, Operation::DescribeStack, e))?
            .ok_or_else(|| ProvisionerError::StackNotFound {
                stack: stack.clone(),
            })?;

        let mut drifted_resources = self
            .api
            .describe_resource_drifts(stack, &ResourceDriftStatus::REPORTABLE)
            .await
            .map_err(|e| ProvisionerError::query(stack, Operation::DescribeResourceDrifts, e))?;
        drifted_resources.retain(|r| r.drift_status.is_reportable());

        Ok(DriftOutcome {
            stack: stack.clone(),
            drift_status: current.drift_status.unwrap_or(StackDriftStatus::Unknown),
            drifted_resources,
        })
    }
}
