//! Lifetime counters and processing latency.

use std::{collections::VecDeque, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of recent processing times kept for the latency figures.
pub const LATENCY_WINDOW: usize = 1000;

/// Mutable broker counters. Lives inside the broker's state lock.
#[derive(Debug)]
pub struct BrokerMetrics {
    counters: EventCounters,
    processing_ms: VecDeque<f64>,
    start_time: DateTime<Utc>,
    last_event_time: Option<DateTime<Utc>>,
}

/// Lifetime event counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCounters {
    /// Events accepted by enqueue
    pub enqueued: u64,
    /// Deliveries handed to consumers or workers
    pub consumed: u64,
    /// Deliveries completed successfully
    pub acknowledged: u64,
    /// Failed delivery cycles
    pub failed: u64,
    /// Events moved to the dead-letter store
    pub dlq: u64,
    /// Events re-admitted from the log at startup
    pub replayed: u64,
    /// Events the log replay could not re-admit
    pub replay_rejected: u64,
}

/// Latency over the most recent successful deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencySnapshot {
    /// Mean processing time
    pub avg_processing_ms: f64,
    /// Longest processing time
    pub max_processing_ms: f64,
    /// Number of samples in the window
    pub samples: usize,
}

/// Start and last-activity times, epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timestamps {
    /// Broker start
    pub start_time: i64,
    /// Last enqueue or delivery outcome
    pub last_event_time: Option<i64>,
}

/// Point-in-time copy of the metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Lifetime counters
    pub events: EventCounters,
    /// Processing latency
    pub latency: LatencySnapshot,
    /// Activity timestamps
    pub timestamps: Timestamps,
}

impl BrokerMetrics {
    /// Starts counting from `start_time`.
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            counters: EventCounters::default(),
            processing_ms: VecDeque::with_capacity(LATENCY_WINDOW),
            start_time,
            last_event_time: None,
        }
    }

    /// Broker start time.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub(crate) fn record_enqueued(&mut self, at: DateTime<Utc>) {
        self.counters.enqueued += 1;
        self.last_event_time = Some(at);
    }

    pub(crate) fn record_consumed(&mut self) {
        self.counters.consumed += 1;
    }

    pub(crate) fn record_acknowledged(&mut self, at: DateTime<Utc>, processing: Option<Duration>) {
        self.counters.acknowledged += 1;
        self.last_event_time = Some(at);
        if let Some(processing) = processing {
            if self.processing_ms.len() == LATENCY_WINDOW {
                self.processing_ms.pop_front();
            }
            self.processing_ms.push_back(processing.as_secs_f64() * 1000.0);
        }
    }

    pub(crate) fn record_failed(&mut self, at: DateTime<Utc>) {
        self.counters.failed += 1;
        self.last_event_time = Some(at);
    }

    pub(crate) fn record_dead_lettered(&mut self) {
        self.counters.dlq += 1;
    }

    pub(crate) fn record_replay(&mut self, admitted: usize, rejected: usize) {
        self.counters.replayed += admitted as u64;
        self.counters.replay_rejected += rejected as u64;
    }

    /// Copies the current figures.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let samples = self.processing_ms.len();
        let (sum, max) = self
            .processing_ms
            .iter()
            .fold((0.0_f64, 0.0_f64), |(sum, max), &ms| (sum + ms, max.max(ms)));
        let avg = if samples == 0 { 0.0 } else { sum / samples as f64 };

        MetricsSnapshot {
            events: self.counters,
            latency: LatencySnapshot { avg_processing_ms: avg, max_processing_ms: max, samples },
            timestamps: Timestamps {
                start_time: self.start_time.timestamp_millis(),
                last_event_time: self.last_event_time.map(|t| t.timestamp_millis()),
            },
        }
    }
}
