use std::time::Duration;
use tokio::time::Instant;

/// Throttle for a periodic sub-poll. Opens on the first check and then at
/// most once per interval.
#[derive(Debug, Clone)]
pub struct IntervalGate {
    interval: Duration,
    last_run: Option<Instant>,
}

impl IntervalGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
        }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_run {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Returns whether the gated work should run now, recording the run if so.
    pub fn try_open(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.last_run = Some(now);
            true
        } else {
            false
        }
    }

    /// Forget the last run so the next check opens.
    pub fn reset(&mut self) {
        self.last_run = None;
    }
}
