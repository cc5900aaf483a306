//! Broker facade behavior: enqueue, consume, acknowledge, nack, reaping,
//! dead letters and snapshots.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use spool_core::DeadLetterReason;
use spool_testing::{payload, wait_until, TestEnv};

const NOW: Option<Duration> = Some(Duration::ZERO);
const SOON: Option<Duration> = Some(Duration::from_secs(2));

#[tokio::test]
async fn enqueued_event_is_consumed_with_fresh_receipt() -> Result<()> {
    let env = TestEnv::new()?;
    let broker = env.open_broker().await?;

    let receipt = broker.enqueue(json!({"id": "a", "n": 1}), None).await?;
    assert_eq!(receipt.id.as_str(), "a");
    assert_eq!(receipt.status, "queued");

    let events = broker.consume(10, NOW, None).await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id.as_str(), "a");
    assert_eq!(events[0].payload, payload(json!({"id": "a", "n": 1})));
    assert_eq!(events[0].retries, 0);
    assert_eq!(events[0].timestamp, receipt.timestamp);
    assert!(!events[0].receipt_id.as_str().is_empty());
    Ok(())
}

#[tokio::test]
async fn generated_ids_when_payload_has_none() -> Result<()> {
    let env = TestEnv::new()?;
    let broker = env.open_broker().await?;

    let first = broker.enqueue(json!({"n": 1}), None).await?;
    let second = broker.enqueue(json!({"n": 2}), None).await?;

    assert_ne!(first.id, second.id);
    Ok(())
}

#[tokio::test]
async fn non_object_payload_is_rejected_before_logging() -> Result<()> {
    let env = TestEnv::new()?;
    let broker = env.open_broker().await?;

    let err = broker.enqueue(json!([1, 2, 3]), None).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_EVENT");

    let err = broker.enqueue(json!({"id": {"nested": true}}), None).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_EVENT");

    assert!(env.read_lines("events.log")?.is_empty());
    Ok(())
}

#[tokio::test]
async fn full_queue_dead_letters_the_overflow() -> Result<()> {
    let env = TestEnv::builder().queue_max_size(1).build()?;
    let broker = env.open_broker().await?;

    broker.enqueue(json!({"id": "a"}), None).await?;
    let err = broker.enqueue(json!({"id": "b"}), None).await.unwrap_err();

    assert_eq!(err.code(), "QUEUE_FULL");
    assert_eq!(broker.dead_letter_count().await, 1);

    let dead = broker.dead_letters(10, 0).await;
    assert_eq!(dead[0].record.id.as_str(), "b");
    assert_eq!(dead[0].reason, DeadLetterReason::QueueFullOnEnqueue);

    let events = broker.consume(10, NOW, None).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id.as_str(), "a");
    Ok(())
}

#[tokio::test]
async fn acknowledge_commits_once_and_reports_per_receipt_failures() -> Result<()> {
    let env = TestEnv::new()?;
    let broker = env.open_broker().await?;
    broker.enqueue(json!({"id": "a"}), None).await?;
    let receipt = broker.consume(1, NOW, None).await.remove(0).receipt_id;

    let outcome = broker.acknowledge(&[receipt.as_str(), "never-issued"]).await?;

    assert_eq!(outcome.acknowledged, vec![receipt.to_string()]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].receipt_id, "never-issued");
    assert_eq!(outcome.failed[0].code, "EVENT_NOT_FOUND");

    let again = broker.acknowledge(&[receipt.as_str()]).await?;
    assert!(again.acknowledged.is_empty());
    assert_eq!(again.failed[0].code, "EVENT_NOT_INFLIGHT");

    assert_eq!(env.read_lines("committed.log")?, vec![r#""a""#.to_string()]);
    assert_eq!(broker.status().await.committed.count, 1);
    assert!(broker.status().await.inflight.events.is_empty());
    Ok(())
}

#[tokio::test]
async fn nack_past_retry_limit_dead_letters_immediately() -> Result<()> {
    let env = TestEnv::builder().max_retries(0).base_backoff(Duration::from_millis(10)).build()?;
    let broker = env.open_broker().await?;
    broker.enqueue(json!({"id": "x"}), None).await?;
    let receipt = broker.consume(1, NOW, None).await.remove(0).receipt_id;

    broker.nack(receipt.as_str(), true).await?;

    let dead = broker.dead_letters(10, 0).await;
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].reason, DeadLetterReason::MaxRetriesExceeded);
    assert_eq!(dead[0].record.retries, 1);
    assert!(broker.consume(1, Some(Duration::from_millis(50)), None).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn nacked_event_returns_with_incremented_retries() -> Result<()> {
    let env = TestEnv::new()?;
    let broker = env.open_broker().await?;
    broker.enqueue(json!({"id": "a"}), None).await?;
    let first = broker.consume(1, NOW, None).await.remove(0);

    broker.nack(first.receipt_id.as_str(), true).await?;
    let second = broker.consume(1, SOON, None).await;

    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id.as_str(), "a");
    assert_eq!(second[0].retries, 1);
    assert_ne!(second[0].receipt_id, first.receipt_id);
    assert_eq!(broker.metrics().events.failed, 1);
    Ok(())
}

#[tokio::test]
async fn requeue_into_full_queue_dead_letters() -> Result<()> {
    let env = TestEnv::builder().queue_max_size(1).base_backoff(Duration::from_millis(10)).build()?;
    let broker = env.open_broker().await?;
    broker.enqueue(json!({"id": "a"}), None).await?;
    let receipt = broker.consume(1, NOW, None).await.remove(0).receipt_id;
    broker.enqueue(json!({"id": "b"}), None).await?;

    broker.nack(receipt.as_str(), true).await?;

    assert!(
        wait_until(Duration::from_secs(2), || {
            env.read_lines("dlq.log").map(|l| l.len()).unwrap_or(0) == 1
        })
        .await
    );
    let dead = broker.dead_letters(10, 0).await;
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].record.id.as_str(), "a");
    assert_eq!(dead[0].reason, DeadLetterReason::QueueFullOnRequeue);
    assert_eq!(dead[0].record.retries, 1);

    let rest: Vec<_> = broker
        .consume(10, Some(Duration::from_millis(50)), None)
        .await
        .iter()
        .map(|e| e.id.to_string())
        .collect();
    assert_eq!(rest, vec!["b"]);
    Ok(())
}

#[tokio::test]
async fn nack_without_requeue_dead_letters_as_rejected() -> Result<()> {
    let env = TestEnv::new()?;
    let broker = env.open_broker().await?;
    broker.enqueue(json!({"id": "a"}), None).await?;
    let receipt = broker.consume(1, NOW, None).await.remove(0).receipt_id;

    broker.nack(receipt.as_str(), false).await?;

    let dead = broker.dead_letters(10, 0).await;
    assert_eq!(dead[0].reason, DeadLetterReason::RejectedByConsumer);
    assert_eq!(dead[0].record.retries, 0);
    assert_eq!(broker.status().await.inflight.count, 0);
    Ok(())
}

#[tokio::test]
async fn nack_rejects_unknown_and_spent_receipts() -> Result<()> {
    let env = TestEnv::new()?;
    let broker = env.open_broker().await?;
    broker.enqueue(json!({"id": "a"}), None).await?;
    let receipt = broker.consume(1, NOW, None).await.remove(0).receipt_id;

    assert_eq!(broker.nack("bogus", true).await.unwrap_err().code(), "EVENT_NOT_FOUND");

    broker.acknowledge(&[receipt.as_str()]).await?;
    assert_eq!(broker.nack(receipt.as_str(), true).await.unwrap_err().code(), "EVENT_NOT_INFLIGHT");
    Ok(())
}

#[tokio::test]
async fn topic_filter_skips_without_dropping() -> Result<()> {
    let env = TestEnv::new()?;
    let broker = env.open_broker().await?;
    broker.enqueue(json!({"id": "a"}), Some("billing".into())).await?;
    broker.enqueue(json!({"id": "b"}), None).await?;
    broker.enqueue(json!({"id": "c"}), Some("billing".into())).await?;
    broker.enqueue(json!({"id": "d"}), Some("shipping".into())).await?;

    let billing: Vec<_> =
        broker.consume(10, NOW, Some("billing")).await.iter().map(|e| e.id.to_string()).collect();
    assert_eq!(billing, vec!["a", "c"]);

    let rest: Vec<_> =
        broker.consume(10, NOW, None).await.iter().map(|e| e.id.to_string()).collect();
    assert_eq!(rest, vec!["b", "d"]);
    Ok(())
}

#[tokio::test]
async fn empty_topic_is_treated_as_none() -> Result<()> {
    let env = TestEnv::new()?;
    let broker = env.open_broker().await?;

    broker.enqueue(json!({"id": "a"}), Some(String::new())).await?;

    let events = broker.consume(1, NOW, None).await;
    assert_eq!(events[0].topic, None);
    Ok(())
}

#[tokio::test]
async fn consume_waits_for_a_late_producer() -> Result<()> {
    let env = TestEnv::new()?;
    let broker = env.open_broker().await?;

    let (events, enqueued) = tokio::join!(broker.consume(1, SOON, None), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        broker.enqueue(json!({"id": "late"}), None).await
    });

    enqueued?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id.as_str(), "late");
    Ok(())
}

#[tokio::test]
async fn consume_batch_size_is_clamped() -> Result<()> {
    let env = TestEnv::new()?;
    let broker = env.open_broker().await?;
    for i in 0..3 {
        broker.enqueue(json!({"id": format!("e{i}")}), None).await?;
    }

    assert_eq!(broker.consume(0, NOW, None).await.len(), 1);
    assert_eq!(broker.consume(1_000, NOW, None).await.len(), 2);
    Ok(())
}

#[tokio::test]
async fn expired_lease_is_reclaimed_and_redelivered() -> Result<()> {
    let env = TestEnv::builder().visibility_timeout(Duration::from_secs(10)).build()?;
    let broker = env.open_broker().await?;
    broker.enqueue(json!({"id": "a"}), None).await?;
    let first = broker.consume(1, NOW, None).await.remove(0);

    assert_eq!(broker.reap_expired().await, 0);
    env.clock.advance(Duration::from_secs(11));
    assert_eq!(broker.reap_expired().await, 1);

    let second = broker.consume(1, SOON, None).await;
    assert_eq!(second[0].id.as_str(), "a");
    assert_eq!(second[0].retries, 1);

    let stale = broker.acknowledge(&[first.receipt_id.as_str()]).await?;
    assert_eq!(stale.failed[0].code, "EVENT_NOT_INFLIGHT");
    Ok(())
}

#[tokio::test]
async fn expired_lease_past_retry_limit_is_dead_lettered() -> Result<()> {
    let env = TestEnv::builder().max_retries(0).visibility_timeout(Duration::from_secs(1)).build()?;
    let broker = env.open_broker().await?;
    broker.enqueue(json!({"id": "a"}), None).await?;
    broker.consume(1, NOW, None).await;

    env.clock.advance(Duration::from_secs(2));
    broker.reap_expired().await;

    let dead = broker.dead_letters(10, 0).await;
    assert_eq!(dead[0].reason, DeadLetterReason::VisibilityTimeoutMaxRetries);
    assert_eq!(dead[0].record.retries, 1);
    Ok(())
}

#[tokio::test]
async fn status_reports_queue_leases_and_workers() -> Result<()> {
    let env = TestEnv::new()?;
    let broker = env.open_broker().await?;
    broker.enqueue(json!({"id": "a"}), None).await?;
    broker.enqueue(json!({"id": "b"}), None).await?;
    broker.consume(1, NOW, None).await;

    let status = broker.status().await;

    assert_eq!(status.queue.size, 1);
    assert_eq!(status.queue.max_size, 100);
    assert!((status.queue.utilization_percent - 1.0).abs() < f64::EPSILON);
    assert_eq!(status.inflight.count, 1);
    assert_eq!(status.inflight.events[0].id.as_str(), "a");
    assert_eq!(status.dlq.count, 0);
    assert_eq!(status.workers.total, 0);
    assert_eq!(status.workers.active, 0);

    let body = serde_json::to_value(&status)?;
    assert!(body["queue"]["utilizationPercent"].is_number());
    assert!(body["inflight"]["events"][0]["deadline"].is_number());
    Ok(())
}

#[tokio::test]
async fn metrics_count_the_lifecycle() -> Result<()> {
    let env = TestEnv::new()?;
    let broker = env.open_broker().await?;
    broker.enqueue(json!({"id": "a"}), None).await?;
    broker.enqueue(json!({"id": "b"}), None).await?;
    let receipt = broker.consume(1, NOW, None).await.remove(0).receipt_id;
    broker.acknowledge(&[receipt]).await?;

    let metrics = broker.metrics();

    assert_eq!(metrics.events.enqueued, 2);
    assert_eq!(metrics.events.consumed, 1);
    assert_eq!(metrics.events.acknowledged, 1);
    assert_eq!(metrics.events.failed, 0);
    assert_eq!(metrics.latency.samples, 1);
    assert!(metrics.timestamps.last_event_time.is_some());
    Ok(())
}

#[tokio::test]
async fn dead_letter_reprocess_enqueues_a_new_event() -> Result<()> {
    let env = TestEnv::builder().queue_max_size(1).build()?;
    let broker = env.open_broker().await?;
    broker.enqueue(json!({"id": "a"}), None).await?;
    broker.enqueue(json!({"id": "b", "n": 2}), Some("billing".into())).await.unwrap_err();
    let receipt = broker.consume(1, NOW, None).await.remove(0).receipt_id;
    broker.acknowledge(&[receipt]).await?;

    let entry = broker.dead_letters(1, 0).await.remove(0);
    let requeued = broker.reprocess_dead_letter(entry.receipt_id.as_str()).await?;

    assert_eq!(requeued.id.as_str(), "b");
    let events = broker.consume(1, NOW, Some("billing")).await;
    assert_eq!(events[0].payload, payload(json!({"id": "b", "n": 2})));
    assert_eq!(broker.dead_letter_count().await, 1);

    let err = broker.reprocess_dead_letter("missing").await.unwrap_err();
    assert_eq!(err.code(), "EVENT_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn dead_letters_page_in_write_order() -> Result<()> {
    let env = TestEnv::builder().queue_max_size(0).build()?;
    let broker = env.open_broker().await?;
    for i in 0..5 {
        broker.enqueue(json!({"id": format!("e{i}")}), None).await.unwrap_err();
    }

    let page: Vec<_> =
        broker.dead_letters(2, 1).await.into_iter().map(|e| e.record.id.to_string()).collect();

    assert_eq!(page, vec!["e1", "e2"]);
    assert!(broker.dead_letters(10, 5).await.is_empty());
    assert_eq!(broker.dead_letter_count().await, 5);
    Ok(())
}

#[tokio::test]
async fn shutdown_gives_up_on_unacknowledged_leases() -> Result<()> {
    let env = TestEnv::builder().shutdown_timeout(Duration::from_millis(300)).build()?;
    let broker = env.open_broker().await?;
    broker.enqueue(json!({"id": "a"}), None).await?;
    broker.consume(1, NOW, None).await;

    broker.shutdown().await;

    assert_eq!(broker.status().await.inflight.count, 1);
    Ok(())
}
