use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::BackendError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(50);

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self { max_attempts, backoff }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF)
    }
}

/// Run `op` until it succeeds, fails permanently, or the attempts run out.
///
/// Transient failures ([`BackendError::Busy`]) are retried after
/// `policy.backoff`. Exhausting the attempts yields `Ok(None)`; any other error
/// is returned on the spot.
pub fn with_retry<T, F>(policy: &RetryPolicy, mut op: F) -> Result<Option<T>, BackendError>
where
    F: FnMut() -> Result<T, BackendError>,
{
    for attempt in 1..=policy.max_attempts {
        match op() {
            Ok(value) => return Ok(Some(value)),
            Err(err) if err.is_transient() => {
                if attempt < policy.max_attempts {
                    debug!(attempt, max_attempts = policy.max_attempts, "clipboard busy, retrying");
                    thread::sleep(policy.backoff);
                }
            }
            Err(err) => return Err(err),
        }
    }

    warn!(
        attempts = policy.max_attempts,
        "gave up on clipboard access after repeated transient failures"
    );
    Ok(None)
}
