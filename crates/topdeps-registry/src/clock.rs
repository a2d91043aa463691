//! Clock abstraction for backoff and stagger delays
//!
//! Every timed suspension in the pipeline goes through a [`Clock`], so tests
//! can substitute [`RecordingClock`] and assert on the exact delays requested
//! without waiting for them.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Source of timed suspension
#[async_trait]
pub trait Clock: Send + Sync {
    /// Suspend the calling task for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fake clock that records requested delays and returns immediately
#[derive(Debug, Default)]
pub struct RecordingClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delay requested so far, in request order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Sum of every delay requested so far
    pub fn total(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_clock() {
        let clock = RecordingClock::new();
        clock.sleep(Duration::from_millis(100)).await;
        clock.sleep(Duration::from_millis(250)).await;

        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(100), Duration::from_millis(250)]
        );
        assert_eq!(clock.total(), Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_advances_time() {
        let start = tokio::time::Instant::now();
        TokioClock.sleep(Duration::from_secs(3)).await;
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
