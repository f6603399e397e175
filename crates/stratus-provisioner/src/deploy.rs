use stratus_core::{
    Capability, DeployOutcome, StackName, StackOutput, StackStatus, StatusPhase, TemplateStore,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::{CloudFormationApi, OnFailure, StackRequest};
use crate::batch::{self, BatchFailure};
use crate::error::{Operation, ProvisionerError};
use crate::poll::{self, PollPolicy, Tick};

/// Creates or updates stacks from synthesized templates and waits for
/// each operation to settle.
pub struct Deployer<'a> {
    api: &'a dyn CloudFormationApi,
    templates: &'a dyn TemplateStore,
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl<'a> Deployer<'a> {
    pub fn new(
        api: &'a dyn CloudFormationApi,
        templates: &'a dyn TemplateStore,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            templates,
            policy: PollPolicy::STACK_OPERATION,
            cancel,
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Deploy every stack in order, stopping at the first failure.
    pub async fn deploy_all(
        &self,
        stacks: &[StackName],
    ) -> Result<Vec<DeployOutcome>, BatchFailure<DeployOutcome>> {
        batch::run_sequential(stacks, move |stack| self.deploy(stack)).await
    }

    /// Submit, wait, then collect outputs for one stack.
    pub async fn deploy(&self, stack: &StackName) -> Result<DeployOutcome, ProvisionerError> {
        let template_body =
            self.templates
                .template_body(stack)
                .map_err(|source| ProvisionerError::Template {
                    stack: stack.clone(),
                    source,
                })?;

        let stack_id = self.submit(stack, &template_body).await?;
        let status = self.wait_for_stack(stack).await?;
        let outputs = self.collect_outputs(stack).await?;

        info!(stack = %stack, status = %status, outputs = outputs.len(), "stack deployed");

        Ok(DeployOutcome {
            stack: stack.clone(),
            stack_id,
            status,
            outputs,
        })
    }

    /// Create the stack if CloudFormation has never heard of it, otherwise
    /// update it. Returns the stack id.
    ///
    /// Only a definite "does not exist" leads to a create; any other
    /// failure of the existence check aborts before anything is submitted.
    /// An unchanged template on a stack resting in a failure status is
    /// [`ProvisionerError::Unchanged`] and is not polled.
    /// Not safe to retry: a repeated create fails once the first succeeded.
    pub async fn submit(
        &self,
        stack: &StackName,
        template_body: &str,
    ) -> Result<String, ProvisionerError> {
        let existing = self
            .api
            .describe_stack(stack)
            .await
            .map_err(|e| ProvisionerError::query(stack, Operation::DescribeStack, e))?;

        let request = StackRequest {
            stack,
            template_body,
            capabilities: &Capability::ALL,
        };

        match existing {
            None => {
                info!(stack = %stack, "creating stack");
                self.api
                    .create_stack(request, OnFailure::Rollback)
                    .await
                    .map_err(|e| ProvisionerError::submission(stack, Operation::CreateStack, e))
            }
            Some(current) => {
                info!(stack = %stack, status = %current.status, "updating stack");
                let updated = self
                    .api
                    .update_stack(request)
                    .await
                    .map_err(|e| ProvisionerError::submission(stack, Operation::UpdateStack, e))?;

                match updated {
                    Some(stack_id) => Ok(stack_id),
                    None if current.status.phase() == StatusPhase::Failed => {
                        Err(ProvisionerError::Unchanged {
                            stack: stack.clone(),
                            status: current.status,
                        })
                    }
                    None => {
                        info!(stack = %stack, "template unchanged, no update submitted");
                        Ok(current.stack_id)
                    }
                }
            }
        }
    }

    /// Poll the stack's status until it settles.
    ///
    /// `CREATE_COMPLETE`/`UPDATE_COMPLETE` return the status; a terminal
    /// failure status is returned as [`ProvisionerError::OperationFailed`].
    pub async fn wait_for_stack(&self, stack: &StackName) -> Result<StackStatus, ProvisionerError> {
        info!(stack = %stack, "waiting for stack operation to complete");

        let what = format!("stack {stack}");
        poll::wait_for(self.policy, &self.cancel, &what, move || async move {
            let current = self
                .api
                .describe_stack(stack)
                .await
                .map_err(|e| ProvisionerError::query(stack, Operation::DescribeStack, e))?
                .ok_or_else(|| ProvisionerError::StackNotFound {
                    stack: stack.clone(),
                })?;

            match current.status.phase() {
                StatusPhase::Succeeded => Ok(Tick::Done(current.status)),
                StatusPhase::Failed => Err(ProvisionerError::OperationFailed {
                    stack: stack.clone(),
                    status: current.status,
                }),
                StatusPhase::InProgress => Ok(Tick::Pending(current.status.to_string())),
            }
        })
        .await
    }

    /// Read the stack's outputs in the order CloudFormation lists them.
    pub async fn collect_outputs(
        &self,
        stack: &StackName,
    ) -> Result<Vec<StackOutput>, ProvisionerError> {
        let current = self
            .api
            .describe_stack(stack)
            .await
            .map_err(|e| ProvisionerError::query(stack, Operation::CollectOutputs, e))?
            .ok_or_else(|| ProvisionerError::StackNotFound {
                stack: stack.clone(),
            })?;

        Ok(current.outputs)
    }
}
