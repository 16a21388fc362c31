//! Time and cancellation limits shared by every phase of a scan.

use std::time::Duration;

use quietmap_common::scanning::StopSignal;
use tokio::time::{Instant, sleep_until};

/// How often blocked waits re-check the stop signal.
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// An optional overall deadline plus a cooperative stop flag.
#[derive(Debug, Clone, Default)]
pub struct ScanBudget {
    deadline: Option<Instant>,
    stop: StopSignal,
}

impl ScanBudget {
    pub fn new(deadline: Option<Instant>, stop: StopSignal) -> Self {
        Self { deadline, stop }
    }

    /// No deadline and a stop signal nobody else holds.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Starts the clock now. `None` means no deadline.
    pub fn starting_now(limit: Option<Duration>, stop: StopSignal) -> Self {
        Self::new(limit.map(|limit| Instant::now() + limit), stop)
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_exhausted(&self) -> bool {
        self.stop.is_stopped() || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Time left before the deadline, `None` if there is none.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Shortens `limit` so it never runs past the deadline.
    pub fn cap(&self, limit: Duration) -> Duration {
        match self.remaining() {
            Some(remaining) => limit.min(remaining),
            None => limit,
        }
    }

    /// Sleeps for `duration` unless the budget runs out first.
    ///
    /// Returns `true` when the whole pause elapsed.
    pub async fn pause(&self, duration: Duration) -> bool {
        let until = Instant::now() + duration;
        loop {
            if self.is_exhausted() {
                return false;
            }
            let now = Instant::now();
            if now >= until {
                return true;
            }
            let mut wake = until.min(now + STOP_POLL_INTERVAL);
            if let Some(deadline) = self.deadline {
                wake = wake.min(deadline);
            }
            sleep_until(wake).await;
        }
    }

    /// Resolves once the budget is exhausted. Never resolves for an
    /// unlimited budget that is never stopped.
    pub async fn exhausted(&self) {
        loop {
            if self.is_exhausted() {
                return;
            }
            let mut wake = Instant::now() + STOP_POLL_INTERVAL;
            if let Some(deadline) = self.deadline {
                wake = wake.min(deadline);
            }
            sleep_until(wake).await;
        }
    }
}
