//! Restart behavior: replay of the event log against the commit ledger and
//! the dead-letter store.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use spool_core::DeadLetterReason;
use spool_testing::{event_log, record, TestEnv};

const NOW: Option<Duration> = Some(Duration::ZERO);

fn ids(events: &[spool_broker::ConsumedEvent]) -> Vec<String> {
    events.iter().map(|e| e.id.to_string()).collect()
}

#[tokio::test]
async fn replay_skips_committed_events_and_keeps_order() -> Result<()> {
    let env = TestEnv::new()?;
    env.write_file("events.log", &event_log(&[record("A"), record("B"), record("C")]))?;
    env.write_file("committed.log", "\"B\"\n")?;

    let broker = env.open_broker().await?;

    assert_eq!(ids(&broker.consume(10, NOW, None).await), vec!["A", "C"]);
    assert_eq!(broker.metrics().events.replayed, 2);
    assert_eq!(broker.status().await.committed.count, 1);
    Ok(())
}

#[tokio::test]
async fn unacknowledged_work_survives_restart() -> Result<()> {
    let env = TestEnv::new()?;
    {
        let broker = env.open_broker().await?;
        broker.enqueue(json!({"id": "done"}), None).await?;
        broker.enqueue(json!({"id": "leased"}), None).await?;
        broker.enqueue(json!({"id": "queued"}), None).await?;

        let receipt = broker.consume(1, NOW, None).await.remove(0).receipt_id;
        broker.acknowledge(&[receipt]).await?;
        broker.consume(1, NOW, None).await;
    }

    let broker = env.open_broker().await?;

    assert_eq!(ids(&broker.consume(10, NOW, None).await), vec!["leased", "queued"]);
    Ok(())
}

#[tokio::test]
async fn dead_lettered_events_stay_dead_after_restart() -> Result<()> {
    let env = TestEnv::builder().max_retries(0).build()?;
    {
        let broker = env.open_broker().await?;
        broker.enqueue(json!({"id": "poison"}), None).await?;
        broker.enqueue(json!({"id": "fine"}), None).await?;
        let receipt = broker.consume(1, NOW, None).await.remove(0).receipt_id;
        broker.nack(receipt.as_str(), true).await?;
    }

    let broker = env.open_broker().await?;

    assert_eq!(ids(&broker.consume(10, NOW, None).await), vec!["fine"]);
    assert_eq!(broker.dead_letter_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn reprocessed_dead_letter_replays_after_restart() -> Result<()> {
    let env = TestEnv::builder().max_retries(0).build()?;
    {
        let broker = env.open_broker().await?;
        broker.enqueue(json!({"id": "retry-me"}), None).await?;
        let receipt = broker.consume(1, NOW, None).await.remove(0).receipt_id;
        broker.nack(receipt.as_str(), false).await?;

        env.clock.advance(Duration::from_millis(5));
        let entry = broker.dead_letters(1, 0).await.remove(0);
        broker.reprocess_dead_letter(entry.receipt_id.as_str()).await?;
    }

    let broker = env.open_broker().await?;

    assert_eq!(ids(&broker.consume(10, NOW, None).await), vec!["retry-me"]);
    Ok(())
}

#[tokio::test]
async fn replay_overflow_is_dead_lettered() -> Result<()> {
    let env = TestEnv::builder().queue_max_size(2).build()?;
    env.write_file("events.log", &event_log(&[record("a"), record("b"), record("c")]))?;

    let broker = env.open_broker().await?;

    assert_eq!(ids(&broker.consume(10, NOW, None).await), vec!["a", "b"]);
    let dead = broker.dead_letters(10, 0).await;
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].record.id.as_str(), "c");
    assert_eq!(dead[0].reason, DeadLetterReason::StartupQueueFull);

    let metrics = broker.metrics();
    assert_eq!(metrics.events.replayed, 2);
    assert_eq!(metrics.events.replay_rejected, 1);
    assert_eq!(metrics.events.dlq, 1);
    Ok(())
}

#[tokio::test]
async fn malformed_and_torn_lines_are_skipped() -> Result<()> {
    let env = TestEnv::new()?;
    let mut contents = event_log(&[record("a")]);
    contents.push_str("this is not json\n");
    contents.push_str(&event_log(&[record("b")]));
    contents.push_str(r#"{"id":"torn","ts":1,"pay"#);
    env.write_file("events.log", &contents)?;

    let broker = env.open_broker().await?;
    assert_eq!(ids(&broker.consume(10, NOW, None).await), vec!["a", "b"]);

    broker.enqueue(json!({"id": "after-crash"}), None).await?;
    let lines = env.read_lines("events.log")?;
    assert!(lines.last().unwrap().contains("after-crash"));
    assert!(lines.iter().any(|l| l.ends_with(r#""pay"#)));
    Ok(())
}

#[tokio::test]
async fn plain_and_quoted_commit_lines_are_both_honored() -> Result<()> {
    let env = TestEnv::new()?;
    env.write_file("events.log", &event_log(&[record("a"), record("b")]))?;
    env.write_file("committed.log", "a\n\n\"b\"\n")?;

    let broker = env.open_broker().await?;

    assert!(broker.consume(10, NOW, None).await.is_empty());
    Ok(())
}
