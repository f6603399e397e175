//! Fixed-interval waiting on remote state, bounded by a deadline and
//! interruptible by the caller.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ProvisionerError;

/// How often to re-query and when to give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    /// Stack create/update: every 10 s for up to 30 min.
    pub const STACK_OPERATION: Self = Self {
        interval: Duration::from_secs(10),
        timeout: Duration::from_secs(30 * 60),
    };

    /// Drift detection: every 5 s for up to 10 min.
    pub const DRIFT_DETECTION: Self = Self {
        interval: Duration::from_secs(5),
        timeout: Duration::from_secs(10 * 60),
    };
}

/// One observation of the remote state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick<T> {
    /// Still running; carries the observed status for logging.
    Pending(String),
    /// Reached a terminal success state.
    Done(T),
}

/// Query `check` once per interval until it reports `Done` or fails.
///
/// The first query happens one interval after the call. Between queries
/// three inputs race, checked in this order: `cancel`, the deadline, the
/// next tick. Cancellation and the deadline are therefore only observed
/// at wait boundaries; a query already in flight always completes.
///
/// An `Err` from `check` (a terminal failure status or a failed query) is
/// returned as-is without retrying.
pub async fn wait_for<T, F, Fut>(
    policy: PollPolicy,
    cancel: &CancellationToken,
    what: &str,
    mut check: F,
) -> Result<T, ProvisionerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Tick<T>, ProvisionerError>>,
{
    let start = Instant::now();
    let deadline = tokio::time::sleep_until(start + policy.timeout);
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval_at(start + policy.interval, policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut polls = 0u32;
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!(what, polls, "wait cancelled");
                return Err(ProvisionerError::Cancelled { what: what.to_string() });
            }
            _ = &mut deadline => {
                warn!(what, polls, timeout_secs = policy.timeout.as_secs(), "wait timed out");
                return Err(ProvisionerError::Timeout {
                    what: what.to_string(),
                    after: policy.timeout,
                });
            }
            _ = ticker.tick() => {}
        }

        polls += 1;
        match check().await? {
            Tick::Done(value) => {
                debug!(what, polls, elapsed_secs = start.elapsed().as_secs(), "wait finished");
                return Ok(value);
            }
            Tick::Pending(status) => {
                debug!(what, polls, status = %status, "still in progress");
            }
        }
    }
}
