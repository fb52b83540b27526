//! Status polling: describe → match status → sleep, until a terminal status.
//!
//! The wait is an explicit loop, so a statement that takes thousands of
//! poll cycles costs no extra stack. Each sleep races the caller's
//! [`CancellationToken`]; cancelling stops local observation only and never
//! cancels the statement on the service side.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PollConfig;
use crate::error::RedshiftError;
use crate::service::StatementService;
use crate::types::{StatementDescription, StatementHandle, StatementStatus};

/// Polls faster than this risk throttling by the service.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How often to poll, and when to give up.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay before the second poll. Never below [`MIN_POLL_INTERVAL`].
    pub interval: Duration,
    /// Cap for the backed-off delay.
    pub max_interval: Duration,
    /// Multiplier applied after every pending poll; 1.0 keeps it fixed.
    pub backoff_factor: f64,
    /// Give up after this many status checks.
    pub max_attempts: Option<u32>,
    /// Give up once this much time has passed since the first check.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::fixed(MIN_POLL_INTERVAL)
    }
}

impl PollPolicy {
    /// Fixed interval, no attempt or time ceiling.
    pub fn fixed(interval: Duration) -> Self {
        let interval = interval.max(MIN_POLL_INTERVAL);
        Self {
            interval,
            max_interval: interval,
            backoff_factor: 1.0,
            max_attempts: None,
            timeout: None,
        }
    }

    /// Capped exponential backoff starting at `initial`.
    pub fn exponential(initial: Duration, factor: f64, max_interval: Duration) -> Self {
        let interval = initial.max(MIN_POLL_INTERVAL);
        Self {
            interval,
            max_interval: max_interval.max(interval),
            backoff_factor: if factor.is_finite() { factor.max(1.0) } else { 1.0 },
            max_attempts: None,
            timeout: None,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn from_config(cfg: &PollConfig) -> Self {
        let mut policy = Self::exponential(
            Duration::from_millis(cfg.interval_ms),
            cfg.backoff_factor,
            Duration::from_millis(cfg.max_interval_ms),
        );
        if cfg.max_attempts > 0 {
            policy = policy.with_max_attempts(cfg.max_attempts);
        }
        if cfg.timeout_secs > 0 {
            policy = policy.with_timeout(Duration::from_secs(cfg.timeout_secs));
        }
        policy
    }

    /// Delay to use after `current`, capped at `max_interval`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        if self.backoff_factor <= 1.0 {
            return current.max(MIN_POLL_INTERVAL);
        }
        current
            .mul_f64(self.backoff_factor)
            .min(self.max_interval)
            .max(MIN_POLL_INTERVAL)
    }
}

/// Drives a statement from submission to a terminal status.
#[derive(Clone)]
pub struct Poller {
    service: Arc<dyn StatementService>,
    policy: PollPolicy,
}

impl Poller {
    pub fn new(service: Arc<dyn StatementService>, policy: PollPolicy) -> Self {
        Self { service, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// One status check. FAILED / ABORTED become [`RedshiftError::QueryExecution`].
    pub async fn poll_once(
        &self,
        handle: &StatementHandle,
    ) -> Result<StatementDescription, RedshiftError> {
        let desc = self.service.describe_statement(handle).await?;

        match desc.status {
            StatementStatus::Failed | StatementStatus::Aborted => {
                let detail = desc.error_detail();
                error!(
                    statement_id = %handle,
                    status = %desc.status,
                    detail = %detail,
                    "Statement did not complete"
                );
                Err(RedshiftError::QueryExecution {
                    statement_id: handle.id().to_string(),
                    status: desc.status,
                    detail,
                })
            }
            _ => Ok(desc),
        }
    }

    /// Poll until FINISHED, a failure status, the policy ceiling, or `cancel`.
    pub async fn wait(
        &self,
        handle: &StatementHandle,
        cancel: &CancellationToken,
    ) -> Result<StatementDescription, RedshiftError> {
        let start = Instant::now();
        let mut delay = self.policy.interval;
        let mut attempts: u32 = 0;

        loop {
            let desc = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.interrupted(handle, attempts)),
                res = self.poll_once(handle) => res?,
            };
            attempts += 1;

            if desc.status == StatementStatus::Finished {
                info!(
                    statement_id = %handle,
                    attempts,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    result_rows = desc.result_rows,
                    "Statement finished"
                );
                return Ok(desc);
            }

            debug!(
                statement_id = %handle,
                status = %desc.status,
                attempts,
                next_delay_ms = delay.as_millis() as u64,
                "Statement pending"
            );

            let out_of_attempts = self.policy.max_attempts.is_some_and(|max| attempts >= max);
            let out_of_time = self.policy.timeout.is_some_and(|t| start.elapsed() >= t);
            if out_of_attempts || out_of_time {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                warn!(
                    statement_id = %handle,
                    attempts,
                    elapsed_ms,
                    "Poll ceiling reached, statement left running"
                );
                return Err(RedshiftError::PollTimeout {
                    statement_id: handle.id().to_string(),
                    attempts,
                    elapsed_ms,
                });
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.interrupted(handle, attempts)),
                _ = tokio::time::sleep(delay) => {}
            }

            delay = self.policy.next_delay(delay);
        }
    }

    fn interrupted(&self, handle: &StatementHandle, attempts: u32) -> RedshiftError {
        warn!(statement_id = %handle, attempts, "Stopped waiting for statement");
        RedshiftError::Interrupted {
            statement_id: handle.id().to_string(),
        }
    }
}
