//! Clock abstraction for visibility deadlines, backoff timers and timestamps.
//!
//! The broker never reads the system clock directly. Deadlines, reaper
//! intervals and retry delays all go through a [`Clock`], so tests can drive
//! expirations deterministically with [`TestClock`] while production uses
//! [`RealClock`].

use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use chrono::{DateTime, Utc};

/// Source of time for the broker.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns a monotonic instant for measuring elapsed time.
    fn now(&self) -> Instant;

    /// Returns wall-clock time, used for deadlines and persisted timestamps.
    fn now_system(&self) -> SystemTime;

    /// Waits for `duration`.
    ///
    /// [`RealClock`] maps this to `tokio::time::sleep`. [`TestClock`]
    /// advances its virtual time and yields once, so timers fire without
    /// real waiting.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// Wall-clock time as a UTC timestamp.
    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.now_system())
    }

    /// Wall-clock time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64 {
        self.now_utc().timestamp_millis()
    }
}

/// Production clock backed by the operating system and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl RealClock {
    /// Creates a new real clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_system(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Manually driven clock for tests.
///
/// Cloning shares the underlying time, so a clone handed to the broker moves
/// forward whenever the test calls [`TestClock::advance`].
#[derive(Debug, Clone)]
pub struct TestClock {
    elapsed_ns: Arc<AtomicU64>,
    epoch_ns: Arc<AtomicU64>,
    base_instant: Instant,
}

impl TestClock {
    /// Creates a test clock starting at the current wall-clock time.
    pub fn new() -> Self {
        Self::with_start_time(SystemTime::now())
    }

    /// Creates a test clock whose wall clock starts at `start`.
    pub fn with_start_time(start: SystemTime) -> Self {
        let since_epoch = start.duration_since(UNIX_EPOCH).unwrap_or_default();

        Self {
            elapsed_ns: Arc::new(AtomicU64::new(0)),
            epoch_ns: Arc::new(AtomicU64::new(saturating_nanos(since_epoch))),
            base_instant: Instant::now(),
        }
    }

    /// Moves both the monotonic and the wall clock forward.
    pub fn advance(&self, duration: Duration) {
        let nanos = saturating_nanos(duration);
        self.elapsed_ns.fetch_add(nanos, Ordering::AcqRel);
        self.epoch_ns.fetch_add(nanos, Ordering::AcqRel);
    }

    /// Virtual time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns.load(Ordering::Acquire))
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.base_instant + self.elapsed()
    }

    fn now_system(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(self.epoch_ns.load(Ordering::Acquire))
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.advance(duration);
        Box::pin(tokio::task::yield_now())
    }
}

fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_both_clocks() {
        let clock = TestClock::with_start_time(UNIX_EPOCH + Duration::from_secs(1_000));
        let before = clock.now();

        clock.advance(Duration::from_millis(1_500));

        assert_eq!(clock.now() - before, Duration::from_millis(1_500));
        assert_eq!(clock.now_millis(), 1_001_500);
    }

    #[test]
    fn clones_share_time() {
        let clock = TestClock::new();
        let shared = clock.clone();

        clock.advance(Duration::from_secs(10));

        assert_eq!(shared.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_clock_sleep_advances_without_waiting() {
        let clock = TestClock::new();
        let started = Instant::now();

        clock.sleep(Duration::from_secs(3600)).await;

        assert_eq!(clock.elapsed(), Duration::from_secs(3600));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
