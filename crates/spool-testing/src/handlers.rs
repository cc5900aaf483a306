//! Event handlers for exercising the worker pool.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use spool_broker::{EventHandler, HandlerError};
use spool_core::EventRecord;

/// Handler that succeeds and remembers every record it saw.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    seen: Arc<Mutex<Vec<EventRecord>>>,
}

impl RecordingHandler {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records handled so far, in order.
    pub fn handled(&self) -> Vec<EventRecord> {
        self.seen.lock().clone()
    }

    /// Ids handled so far, in order.
    pub fn handled_ids(&self) -> Vec<String> {
        self.seen.lock().iter().map(|r| r.id.to_string()).collect()
    }

    /// Polls until at least `count` records were handled or `timeout`
    /// passes. Returns whether the count was reached.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.seen.lock().len() >= count).await
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, record: &EventRecord) -> Result<(), HandlerError> {
        self.seen.lock().push(record.clone());
        Ok(())
    }
}

/// Handler that takes `delay` to succeed, recording each record once done.
#[derive(Debug, Clone)]
pub struct SlowHandler {
    delay: Duration,
    done: RecordingHandler,
}

impl SlowHandler {
    /// Creates a handler that sleeps `delay` on the system clock per event.
    pub fn new(delay: Duration) -> Self {
        Self { delay, done: RecordingHandler::new() }
    }

    /// Records whose handling finished.
    pub fn finished(&self) -> &RecordingHandler {
        &self.done
    }
}

#[async_trait]
impl EventHandler for SlowHandler {
    async fn handle(&self, record: &EventRecord) -> Result<(), HandlerError> {
        tokio::time::sleep(self.delay).await;
        self.done.handle(record).await
    }
}

/// How a [`ScriptedHandler`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Return an error
    Error,
    /// Panic inside the handler
    Panic,
}

/// Handler that fails its first `failures` calls, then succeeds.
#[derive(Debug, Clone)]
pub struct ScriptedHandler {
    failures: usize,
    mode: Failure,
    attempts: Arc<AtomicUsize>,
    succeeded: RecordingHandler,
}

impl ScriptedHandler {
    /// Fails the first `failures` calls with an error.
    pub fn failing(failures: usize) -> Self {
        Self {
            failures,
            mode: Failure::Error,
            attempts: Arc::default(),
            succeeded: RecordingHandler::new(),
        }
    }

    /// Fails every call with an error.
    pub fn always_failing() -> Self {
        Self::failing(usize::MAX)
    }

    /// Panics on the first `failures` calls.
    pub fn panicking(failures: usize) -> Self {
        Self { mode: Failure::Panic, ..Self::failing(failures) }
    }

    /// Calls made so far, failed or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Records handled successfully.
    pub fn succeeded(&self) -> &RecordingHandler {
        &self.succeeded
    }

    /// Polls until at least `count` calls were made or `timeout` passes.
    pub async fn wait_for_attempts(&self, count: usize, timeout: Duration) -> bool {
        wait_until(timeout, || self.attempts() >= count).await
    }
}

#[async_trait]
impl EventHandler for ScriptedHandler {
    async fn handle(&self, record: &EventRecord) -> Result<(), HandlerError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.failures {
            return self.succeeded.handle(record).await;
        }

        match self.mode {
            Failure::Error => {
                Err(HandlerError::failed(format!("scripted failure {}", attempt + 1)))
            },
            Failure::Panic => panic!("scripted panic {}", attempt + 1),
        }
    }
}

/// Polls `condition` every 5ms until it holds or `timeout` passes.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
