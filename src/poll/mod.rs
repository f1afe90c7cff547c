//! Timed polling until a build leaves `IN_PROGRESS`.
//!
//! A single-flight blocking wait: query, sleep, query again, bounded by a
//! wall-clock timeout. Nothing is persisted across runs; a killed process
//! starts over from its external trigger.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::codebuild::{BuildStatus, BuildStatusSource, StatusError};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Delay between status checks.
    pub interval: Duration,
    /// Wall-clock budget before the wait is abandoned.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// How the wait ended. A status-fetch failure is surfaced as the `Err`
/// side of [`wait_for_terminal`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The build reached a terminal status.
    Done(BuildStatus),
    /// Still `IN_PROGRESS` when the timeout elapsed.
    TimedOut,
}

/// Poll `source` until the build leaves `IN_PROGRESS` or the timeout
/// elapses. The first query happens immediately; the loop returns no later
/// than timeout + one interval after entry.
pub async fn wait_for_terminal(
    source: &dyn BuildStatusSource,
    build_id: &str,
    config: PollConfig,
) -> Result<PollOutcome, StatusError> {
    let started = Instant::now();

    loop {
        let status = source.build_status(build_id).await?;

        if status.is_terminal() {
            info!(%status, build_id, "Build finished");
            return Ok(PollOutcome::Done(status));
        }

        if started.elapsed() >= config.timeout {
            warn!(
                build_id,
                timeout_secs = config.timeout.as_secs(),
                "Build still in progress after timeout, giving up"
            );
            return Ok(PollOutcome::TimedOut);
        }

        debug!(
            build_id,
            interval_secs = config.interval.as_secs(),
            "Build in progress, checking again later"
        );
        sleep(config.interval).await;
    }
}
