//! Global probe admission pacing

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Admits at most one caller per `interval`, across all tasks sharing it
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next admission slot
    ///
    /// The lock is held while sleeping, so waiters are admitted one at a time
    /// in arrival order. Cancelling the future gives up the slot.
    pub async fn acquire(&self) {
        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        let admit_at = match *next_slot {
            Some(slot) if slot > now => {
                tokio::time::sleep_until(slot).await;
                slot
            }
            _ => now,
        };
        *next_slot = Some(admit_at + self.interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_admissions_are_spaced() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(20)));
        let times = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = limiter.clone();
            let times = times.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..10 {
                    limiter.acquire().await;
                    times.lock().await.push(Instant::now());
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let mut times = times.lock().await.clone();
        times.sort();
        assert_eq!(times.len(), 50);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(20));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_limiter_admits_immediately() {
        let limiter = RateLimiter::new(Duration::from_millis(20));
        limiter.acquire().await;
        tokio::time::advance(Duration::from_millis(100)).await;
        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(Instant::now(), before);
    }
}
