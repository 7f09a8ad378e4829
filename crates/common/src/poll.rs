//! Bounded polling
//!
//! Passive scan, spider, active scan and daemon startup all wait the same
//! way: probe, report progress, stop as soon as the predicate holds, otherwise
//! sleep for a fixed interval until the ceiling is reached.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{Error, Result};

/// Interval and ceiling for one bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSpec {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSpec {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Probe until `done` holds or `spec.timeout` has elapsed.
///
/// Returns the value that satisfied the predicate. Probe errors abort the wait
/// immediately. Once the ceiling has passed and the predicate is still false,
/// fails with [`Error::Timeout`] naming `operation`.
pub async fn poll_until<T, F, Fut, P>(
    operation: &str,
    spec: PollSpec,
    mut probe: F,
    done: P,
    mut on_progress: Option<&mut (dyn FnMut(&T) + Send)>,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let value = probe().await?;

        if let Some(callback) = on_progress.as_mut() {
            callback(&value);
        }

        if done(&value) {
            debug!("{} complete after {} poll(s)", operation, attempts);
            return Ok(value);
        }

        if start.elapsed() >= spec.timeout {
            return Err(Error::Timeout {
                operation: operation.to_string(),
                timeout: spec.timeout,
            });
        }

        sleep(spec.interval).await;
    }
}
