//! Randomized pause between uploads to the same host.

use std::time::Duration;

use futures_util::future::BoxFuture;
use rand::Rng;

use crate::config::UploadConfig;

/// Async pause between uploads. Injectable so tests don't sleep.
pub type PauseFn = Box<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

/// Waits a uniformly random time in `[min_ms, max_ms]` after each upload attempt.
pub struct Pacing {
    min_ms: u64,
    max_ms: u64,
    pause: PauseFn,
}

impl Pacing {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms,
            max_ms,
            pause: Box::new(|d| Box::pin(tokio::time::sleep(d))),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.pause_min_ms, config.pause_max_ms)
    }

    /// No waiting at all.
    pub fn disabled() -> Self {
        Self::new(0, 0).with_pause(Box::new(|_| Box::pin(async {})))
    }

    /// Replace how the pause is carried out.
    pub fn with_pause(mut self, pause: PauseFn) -> Self {
        self.pause = pause;
        self
    }

    /// Length of the next pause.
    pub fn next_delay(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..=self.max_ms))
    }

    pub async fn wait(&self) {
        (self.pause)(self.next_delay()).await;
    }
}

impl std::fmt::Debug for Pacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacing")
            .field("min_ms", &self.min_ms)
            .field("max_ms", &self.max_ms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_delay_within_range() {
        let pacing = Pacing::new(600, 1200);
        for _ in 0..50 {
            let d = pacing.next_delay();
            assert!(d >= Duration::from_millis(600) && d <= Duration::from_millis(1200));
        }
    }

    #[test]
    fn test_inverted_range_uses_min() {
        assert_eq!(Pacing::new(500, 100).next_delay(), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_wait_goes_through_injected_pause() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let pacing = Pacing::new(250, 250).with_pause(Box::new(move |d| {
            recorder.lock().unwrap().push(d);
            Box::pin(async {})
        }));

        pacing.wait().await;
        pacing.wait().await;
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            [Duration::from_millis(250), Duration::from_millis(250)]
        );
    }
}
