//! Bounded, throttled runner for application package preparation.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

pub const MAX_CONCURRENT_SUBMISSIONS: usize = 3;
pub const MIN_SUBMISSION_INTERVAL: Duration = Duration::from_secs(2);

/// Cloneable handle. At most `max_concurrent` submissions run at once and starts are
/// at least `min_interval` apart.
#[derive(Clone)]
pub struct SubmissionQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    permits: Semaphore,
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
    waiting: AtomicUsize,
    active: AtomicUsize,
}

/// Holds one unit of a gauge and gives it back on drop, so a cancelled run leaves the
/// counts as they were.
struct GaugeGuard<'a>(&'a AtomicUsize);

impl<'a> GaugeGuard<'a> {
    fn enter(gauge: &'a AtomicUsize) -> Self {
        gauge.fetch_add(1, Ordering::SeqCst);
        Self(gauge)
    }
}

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub queue_size: usize,
    pub active_submissions: usize,
}

impl Default for SubmissionQueue {
    fn default() -> Self {
        Self::new(MAX_CONCURRENT_SUBMISSIONS, MIN_SUBMISSION_INTERVAL)
    }
}

impl SubmissionQueue {
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                permits: Semaphore::new(max_concurrent.max(1)),
                min_interval,
                last_start: Mutex::new(None),
                waiting: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
            }),
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            queue_size: self.inner.waiting.load(Ordering::SeqCst),
            active_submissions: self.inner.active.load(Ordering::SeqCst),
        }
    }

    /// Waits for a slot and the throttle, then runs `work`.
    pub async fn run<F, T>(&self, work: F) -> T
    where
        F: Future<Output = T>,
    {
        let waiting = GaugeGuard::enter(&self.inner.waiting);
        let permit = self.inner.permits.acquire().await;
        self.throttle().await;
        drop(waiting);

        let _active = GaugeGuard::enter(&self.inner.active);
        let output = work.await;
        drop(permit);
        output
    }

    /// Runs `work` in the background through the queue.
    pub fn spawn<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let queue = self.clone();
        tokio::spawn(async move { queue.run(work).await });
    }

    async fn throttle(&self) {
        let mut last = self.inner.last_start.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.inner.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_starts_are_spaced() {
        let queue = SubmissionQueue::default();
        let starts = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            let starts = Arc::clone(&starts);
            handles.push(tokio::spawn(async move {
                queue
                    .run(async {
                        starts.lock().await.push(Instant::now());
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let starts = starts.lock().await;
        assert_eq!(starts.len(), 4);
        for pair in starts.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= MIN_SUBMISSION_INTERVAL, "Expected gap >= 2s, got {gap:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let queue = SubmissionQueue::new(3, Duration::from_millis(1));
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let queue = queue.clone();
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                queue
                    .run(async {
                        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        current.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 3, "Expected peak of 3 concurrent runs");
        assert_eq!(queue.snapshot(), QueueSnapshot { queue_size: 0, active_submissions: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_runs_release_their_counts() {
        let queue = SubmissionQueue::new(1, Duration::from_millis(1));

        let busy = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .run(tokio::time::sleep(Duration::from_secs(60)))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let queued = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.run(async {}).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(queue.snapshot(), QueueSnapshot { queue_size: 1, active_submissions: 1 });

        queued.abort();
        busy.abort();
        assert!(queued.await.unwrap_err().is_cancelled());
        assert!(busy.await.unwrap_err().is_cancelled());

        let snapshot = queue.snapshot();
        assert_eq!(
            snapshot,
            QueueSnapshot { queue_size: 0, active_submissions: 0 },
            "Expected cancelled runs to give back their counts, got {snapshot:?}"
        );
    }
}
