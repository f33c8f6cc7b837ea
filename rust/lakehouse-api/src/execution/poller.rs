//! Completion polling for submitted executions.

use super::{ExecutionHandle, ExecutionState, ExecutionStatistics, QueryService};
use crate::error::{Result, ServiceError};
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 150,
        }
    }
}

/// What a successful wait observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub statistics: ExecutionStatistics,
    pub status_checks: u32,
}

enum Interrupt {
    Cancelled,
    Deadline,
}

/// Polls an execution until it reaches a terminal state.
///
/// The wait ends with:
/// - `Ok` on `SUCCEEDED`
/// - `Execution` on `FAILED`/`CANCELLED`, carrying the reported reason
/// - `StatusCheck` as soon as a status call itself fails
/// - `Timeout` once `max_attempts` status checks saw no terminal state, or the
///   deadline passes
/// - `Cancelled` when the caller's token fires
///
/// Timeouts and caller cancellation also send a best-effort cancel to the
/// service.
pub struct CompletionPoller<'a> {
    service: &'a dyn QueryService,
    policy: PollPolicy,
    deadline: Option<Instant>,
}

impl<'a> CompletionPoller<'a> {
    pub fn new(service: &'a dyn QueryService, policy: PollPolicy) -> Self {
        Self {
            service,
            policy,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub async fn wait(
        &self,
        handle: &ExecutionHandle,
        cancel: &CancellationToken,
    ) -> Result<Completion> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_state = ExecutionState::Queued;

        for attempt in 1..=max_attempts {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.abort(handle, Interrupt::Cancelled, last_state).await);
                }
                _ = deadline_elapsed(self.deadline) => {
                    return Err(self.abort(handle, Interrupt::Deadline, last_state).await);
                }
                polled = self.service.status(handle) => polled,
            };

            let status = polled.map_err(|err| {
                warn!(execution_id = %handle, attempt, error = %err, "status check failed");
                ServiceError::StatusCheck(err)
            })?;
            last_state = status.state;
            debug!(execution_id = %handle, attempt, max_attempts, state = %status.state, "polled query status");

            match status.state {
                ExecutionState::Succeeded => {
                    info!(execution_id = %handle, status_checks = attempt, "query succeeded");
                    return Ok(Completion {
                        statistics: status.statistics.unwrap_or_default(),
                        status_checks: attempt,
                    });
                }
                ExecutionState::Failed | ExecutionState::Cancelled => {
                    let reason = status
                        .reason
                        .unwrap_or_else(|| "no reason reported".to_string());
                    warn!(execution_id = %handle, state = %status.state, %reason, "query did not succeed");
                    return Err(ServiceError::Execution {
                        state: status.state,
                        reason,
                    });
                }
                ExecutionState::Queued | ExecutionState::Running => {}
            }

            if attempt == max_attempts {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.abort(handle, Interrupt::Cancelled, last_state).await);
                }
                _ = deadline_elapsed(self.deadline) => {
                    return Err(self.abort(handle, Interrupt::Deadline, last_state).await);
                }
                _ = sleep(self.policy.interval) => {}
            }
        }

        let budget = self.policy.interval.saturating_mul(max_attempts);
        self.cancel_remote(handle).await;
        warn!(execution_id = %handle, max_attempts, state = %last_state, "query polling budget exhausted");
        Err(ServiceError::Timeout(format!(
            "still {last_state} after {max_attempts} status checks (~{}s)",
            budget.as_secs()
        )))
    }

    async fn abort(
        &self,
        handle: &ExecutionHandle,
        interrupt: Interrupt,
        last_state: ExecutionState,
    ) -> ServiceError {
        self.cancel_remote(handle).await;
        match interrupt {
            Interrupt::Cancelled => {
                info!(execution_id = %handle, "caller cancelled query");
                ServiceError::Cancelled
            }
            Interrupt::Deadline => {
                warn!(execution_id = %handle, state = %last_state, "request deadline reached");
                ServiceError::Timeout(format!("request deadline reached while {last_state}"))
            }
        }
    }

    async fn cancel_remote(&self, handle: &ExecutionHandle) {
        if let Err(err) = self.service.cancel(handle).await {
            debug!(execution_id = %handle, error = %err, "best-effort cancel failed");
        }
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
