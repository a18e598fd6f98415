//! Call serializer for the upstream provider
//!
//! Dispatches outbound provider calls one at a time with a minimum spacing
//! between dispatch timestamps, so the gateway never exceeds the provider's
//! published rate limit regardless of how many callers pile up.
//!
//! ## Key design: fair gate held across the call
//!
//! Callers queue on a fair async mutex, so they dispatch in strict
//! submission order. The gate is held for the duration of the task itself,
//! which makes calls single-flight: no two provider calls are ever in
//! flight at once. The next dispatch slot is reserved at dispatch time,
//! before the task runs, so a caller cancelled mid-call still counts
//! against the spacing (its request already went on the wire).

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Minimum spacing between provider dispatches (10 calls/second ceiling)
pub const DEFAULT_MIN_CALL_INTERVAL: Duration = Duration::from_millis(100);

/// Serializes provider calls with a minimum inter-dispatch interval
#[derive(Debug)]
pub struct CallSerializer {
    /// The next permitted dispatch time, as milliseconds since `epoch`.
    /// The mutex doubles as the FIFO queue: tokio wakes waiters in
    /// acquisition order.
    next_slot_ms: Mutex<u64>,
    /// Arbitrary epoch fixed at construction
    epoch: Instant,
    /// Minimum interval between dispatches
    min_interval: Duration,
    /// Name for logging purposes
    name: String,
    /// Total calls dispatched
    total_calls: AtomicU64,
    /// Calls that had to wait for a slot
    delayed_calls: AtomicU64,
}

impl CallSerializer {
    /// Create a serializer with the given minimum dispatch interval
    pub fn new(min_interval: Duration, name: &str) -> Self {
        Self {
            next_slot_ms: Mutex::new(0), // First call can go immediately
            epoch: Instant::now(),
            min_interval,
            name: name.to_string(),
            total_calls: AtomicU64::new(0),
            delayed_calls: AtomicU64::new(0),
        }
    }

    /// Serializer configured for the brokerage API (100 ms spacing)
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MIN_CALL_INTERVAL, "angelone")
    }

    fn instant_to_ms(&self, instant: Instant) -> u64 {
        instant.duration_since(self.epoch).as_millis() as u64
    }

    fn ms_to_instant(&self, ms: u64) -> Instant {
        self.epoch + Duration::from_millis(ms)
    }

    /// Run `task` through the serializer
    ///
    /// Waits for this caller's dispatch slot, runs the task to completion,
    /// and reserves the next slot. The task's output (success or failure)
    /// is returned to this caller only; a failing task has no effect on
    /// later queued tasks.
    pub async fn run<F, Fut, T>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let call_num = self.total_calls.fetch_add(1, Ordering::Relaxed) + 1;

        let mut next_slot = self.next_slot_ms.lock().await;

        let now_ms = self.instant_to_ms(Instant::now());
        if now_ms < *next_slot {
            self.delayed_calls.fetch_add(1, Ordering::Relaxed);
            debug!(
                "[SERIALIZER:{}] #{} waiting {}ms for its dispatch slot",
                self.name,
                call_num,
                *next_slot - now_ms
            );
            tokio::time::sleep_until(self.ms_to_instant(*next_slot)).await;
        }

        let dispatched = Instant::now();
        debug!(
            "[SERIALIZER:{}] #{} dispatched at {}ms",
            self.name,
            call_num,
            self.instant_to_ms(dispatched)
        );

        // Reserve the next slot before running the task. Spacing is
        // measured between dispatch timestamps, so a slow call does not
        // push the slot out, and a caller dropped mid-task (subscription
        // abort) has already paid for its dispatch.
        *next_slot = self.instant_to_ms(dispatched) + self.min_interval.as_millis() as u64;

        task().await
    }

    /// Check whether a call would dispatch without waiting
    pub async fn can_dispatch_immediately(&self) -> bool {
        let next_slot = self.next_slot_ms.lock().await;
        self.instant_to_ms(Instant::now()) >= *next_slot
    }

    /// Get the minimum interval between dispatches
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Get dispatch statistics
    pub fn stats(&self) -> CallSerializerStats {
        CallSerializerStats {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            delayed_calls: self.delayed_calls.load(Ordering::Relaxed),
            min_interval_ms: self.min_interval.as_millis() as u64,
            name: self.name.clone(),
        }
    }
}

/// Statistics about serializer usage
#[derive(Debug, Clone, serde::Serialize)]
pub struct CallSerializerStats {
    pub total_calls: u64,
    pub delayed_calls: u64,
    pub min_interval_ms: u64,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use parking_lot::Mutex as SyncMutex;

    #[tokio::test(start_paused = true)]
    async fn first_call_dispatches_immediately() {
        let serializer = CallSerializer::new(Duration::from_millis(100), "test");

        let start = Instant::now();
        serializer.run(|| async {}).await;

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_waits_min_interval() {
        let serializer = CallSerializer::new(Duration::from_millis(100), "test");

        let start = Instant::now();
        serializer.run(|| async {}).await;
        serializer.run(|| async {}).await;

        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn call_after_interval_is_immediate() {
        let serializer = CallSerializer::new(Duration::from_millis(100), "test");

        serializer.run(|| async {}).await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(serializer.can_dispatch_immediately().await);

        let before = Instant::now();
        serializer.run(|| async {}).await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_task_does_not_push_the_next_slot() {
        let serializer = CallSerializer::new(Duration::from_millis(100), "test");

        // Task takes longer than the interval
        serializer
            .run(|| async {
                tokio::time::sleep(Duration::from_millis(250)).await;
            })
            .await;

        // Next dispatch is already past its slot
        assert!(serializer.can_dispatch_immediately().await);
    }

    /// Queued tasks dispatch in submission order with at least the
    /// configured interval between dispatch timestamps.
    #[tokio::test(start_paused = true)]
    async fn concurrent_calls_dispatch_fifo_with_spacing() {
        let serializer = Arc::new(CallSerializer::new(Duration::from_millis(100), "test"));
        let dispatches: Arc<SyncMutex<Vec<(usize, Instant)>>> =
            Arc::new(SyncMutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..5 {
            let serializer = Arc::clone(&serializer);
            let dispatches = Arc::clone(&dispatches);
            handles.push(tokio::spawn(async move {
                // Stagger submissions so queueing order is deterministic
                tokio::time::sleep(Duration::from_millis(i as u64)).await;
                serializer
                    .run(|| async {
                        dispatches.lock().push((i, Instant::now()));
                    })
                    .await;
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        let dispatches = dispatches.lock();
        assert_eq!(dispatches.len(), 5);

        // Submission order preserved
        let order: Vec<usize> = dispatches.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);

        // Consecutive dispatch timestamps at least min_interval apart
        for pair in dispatches.windows(2) {
            let gap = pair[1].1.duration_since(pair[0].1);
            assert!(
                gap >= Duration::from_millis(100),
                "gap between dispatches was {:?}",
                gap
            );
        }

        let stats = serializer.stats();
        assert_eq!(stats.total_calls, 5);
        assert_eq!(stats.delayed_calls, 4);
    }

    /// A caller aborted while its task is in flight has already dispatched
    /// upstream; the next call must still honor the minimum spacing.
    #[tokio::test(start_paused = true)]
    async fn aborted_call_still_reserves_its_slot() {
        let serializer = Arc::new(CallSerializer::new(Duration::from_millis(100), "test"));
        let dispatches: Arc<SyncMutex<Vec<Instant>>> = Arc::new(SyncMutex::new(Vec::new()));

        let first = Arc::clone(&serializer);
        let first_dispatches = Arc::clone(&dispatches);
        let handle = tokio::spawn(async move {
            first
                .run(|| async move {
                    first_dispatches.lock().push(Instant::now());
                    // Hangs until the caller is aborted
                    std::future::pending::<()>().await;
                })
                .await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        serializer
            .run(|| async {
                dispatches.lock().push(Instant::now());
            })
            .await;

        let dispatches = dispatches.lock();
        assert_eq!(dispatches.len(), 2);
        let gap = dispatches[1].duration_since(dispatches[0]);
        assert!(
            gap >= Duration::from_millis(100),
            "second dispatch only {:?} after the first",
            gap
        );
    }

    #[tokio::test(start_paused = true)]
    async fn task_failure_reports_only_to_its_caller() {
        let serializer = CallSerializer::new(Duration::from_millis(100), "test");

        let first: Result<u32, &str> = serializer.run(|| async { Err("boom") }).await;
        assert_eq!(first, Err("boom"));

        let second: Result<u32, &str> = serializer.run(|| async { Ok(7) }).await;
        assert_eq!(second, Ok(7));
    }
}
