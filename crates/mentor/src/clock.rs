use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Wall-clock timestamps derived from `tokio::time::Instant`.
///
/// Message times and idle checks both read this clock, so they stay consistent
/// when the runtime clock is paused and advanced in tests.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin: Instant,
    origin_wall: DateTime<Utc>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            origin_wall: Utc::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.origin_wall + elapsed
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_clock_follows_virtual_time() {
        let clock = SessionClock::new();
        let start = clock.now();
        tokio::time::advance(Duration::from_secs(21)).await;
        let elapsed = clock.now() - start;
        assert_eq!(elapsed.num_seconds(), 21);
    }
}
