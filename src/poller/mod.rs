//! Polling of analysis status: a cancellable loop that reconciles the
//! backend's answers with the local mirror and publishes snapshots over a
//! watch channel.

mod controller;
mod loop_worker;
mod reconcile;
mod refresh;
mod session;

pub use controller::PollController;
pub use reconcile::reconcile_once;
pub use refresh::{refresh_wait, RefreshOutcome};
pub use session::PollSession;

use std::time::Duration;

const POLL_INTERVAL_MS: u64 = 2000;
const MAX_POLL_ATTEMPTS: u32 = 150;
const MAX_RETRIES: u32 = 3;
const FETCH_TIMEOUT_SECS: u64 = 10;

const REFRESH_POLL_INTERVAL_MS: u64 = 10_000;
const REFRESH_MAX_ATTEMPTS: u32 = 30;

/// Cadence and ceilings for one polling run.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
    pub max_retries: u32,
    pub fetch_timeout: Duration,
}

impl PollConfig {
    /// Watching a fresh analysis: fast ticks, about five minutes total.
    pub fn status_watch() -> Self {
        Self {
            interval: Duration::from_millis(POLL_INTERVAL_MS),
            max_attempts: MAX_POLL_ATTEMPTS,
            max_retries: MAX_RETRIES,
            fetch_timeout: Duration::from_secs(FETCH_TIMEOUT_SECS),
        }
    }

    /// Waiting for a refresh to land: slow ticks, same five minute ceiling.
    pub fn refresh_watch() -> Self {
        Self {
            interval: Duration::from_millis(REFRESH_POLL_INTERVAL_MS),
            max_attempts: REFRESH_MAX_ATTEMPTS,
            max_retries: MAX_RETRIES,
            fetch_timeout: Duration::from_secs(FETCH_TIMEOUT_SECS),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::status_watch()
    }
}
