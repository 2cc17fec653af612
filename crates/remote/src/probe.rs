//! Liveness probing and the poll-until-online waiter.
use std::time::Duration;

use {
    async_trait::async_trait,
    tracing::{debug, info},
};

/// A single liveness check against the remote host.
///
/// Implementations collapse every failure mode (refused, timed out, wrong
/// status) into `false`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self) -> bool;
}

/// Deadline and cadence for [`wait_until_online`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(60_000),
            interval: Duration::from_millis(1000),
        }
    }
}

/// Probe once per interval until the host answers or the timeout is used up.
///
/// The deadline is tracked as accumulated sleep time, so a slow probe does
/// not shorten the window. At most `ceil(timeout / interval)` probes are made.
pub async fn wait_until_online(prober: &dyn Prober, opts: WaitOptions) -> bool {
    let mut elapsed = Duration::ZERO;
    let mut attempts: u32 = 0;

    while elapsed < opts.timeout {
        attempts += 1;
        if prober.probe().await {
            info!(attempts, elapsed_ms = elapsed.as_millis() as u64, "client is online");
            return true;
        }
        debug!(attempts, "client not reachable yet");
        tokio::time::sleep(opts.interval).await;
        elapsed += opts.interval;
    }

    info!(attempts, timeout_ms = opts.timeout.as_millis() as u64, "client still offline");
    false
}
