//! Wait for an external condition at a fixed interval.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::stage_client::StageClientError;

use super::state::Stage;
use super::types::PipelineError;

/// How often, and how many times, to check a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Give up after this many checks (`None` = wait forever).
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Call `check` until it reports `true`, sleeping `policy.interval` between calls.
///
/// A check error aborts immediately as a `Stage` error for `stage`.
pub async fn poll_until<F, Fut>(
    policy: &PollPolicy,
    stage: Stage,
    what: &str,
    mut check: F,
) -> Result<(), PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, StageClientError>>,
{
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        if check().await.map_err(PipelineError::stage(stage))? {
            return Ok(());
        }

        if let Some(max) = policy.max_attempts {
            if attempts >= max {
                return Err(PipelineError::PollExhausted {
                    what: what.to_string(),
                    attempts,
                });
            }
        }

        debug!(stage = %stage, what = what, attempt = attempts, "Not ready yet");
        if policy.interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(policy.interval).await;
        }
    }
}
