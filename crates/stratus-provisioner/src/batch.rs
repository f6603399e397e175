use std::fmt::Debug;
use std::future::Future;

use stratus_core::StackName;
use thiserror::Error;
use tracing::{error, info};

use crate::error::ProvisionerError;

/// A batch that stopped at its first failing stack.
#[derive(Debug, Error)]
#[error("stack {stack} failed after {} stack(s) completed: {source}", .completed.len())]
pub struct BatchFailure<T: Debug> {
    /// Outcomes of every stack before the failing one, in list order.
    pub completed: Vec<T>,
    pub stack: StackName,
    /// Stacks after the failing one; none of them were attempted.
    pub skipped: Vec<StackName>,
    #[source]
    pub source: ProvisionerError,
}

impl<T: Debug> BatchFailure<T> {
    /// True when the batch stopped because the caller cancelled it.
    pub fn is_cancelled(&self) -> bool {
        self.source.is_cancelled()
    }
}

/// Run `workflow` for each stack strictly in order.
///
/// The first error stops the batch: results gathered so far are returned
/// inside the [`BatchFailure`] and the remaining stacks are never touched.
pub async fn run_sequential<'s, T, F, Fut>(
    stacks: &'s [StackName],
    mut workflow: F,
) -> Result<Vec<T>, BatchFailure<T>>
where
    T: Debug,
    F: FnMut(&'s StackName) -> Fut,
    Fut: Future<Output = Result<T, ProvisionerError>>,
{
    let mut completed = Vec::with_capacity(stacks.len());

    for (index, stack) in stacks.iter().enumerate() {
        info!(stack = %stack, position = index + 1, total = stacks.len(), "processing stack");

        match workflow(stack).await {
            Ok(outcome) => completed.push(outcome),
            Err(source) => {
                error!(stack = %stack, error = %source, "stack failed, stopping batch");
                return Err(BatchFailure {
                    completed,
                    stack: stack.clone(),
                    skipped: stacks[index + 1..].to_vec(),
                    source,
                });
            }
        }
    }

    Ok(completed)
}
