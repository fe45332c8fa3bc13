use std::path::PathBuf;
use std::time::Duration;

use courier_core::config::PipelineConfig;
use courier_core::event::EventCategory;
use courier_worker::{spawn, Command, Reply, ReplyKind, WorkerHandle};
use test_fixtures::{init_test_logging, sample_event, MockCollector};

fn config(collector_url: &str, db_path: Option<PathBuf>) -> PipelineConfig {
    let mut config = PipelineConfig::new(collector_url, "worker-app");
    config.db_path = db_path;
    // Long cadences so only explicit triggers fire during a test.
    config.flush_interval_secs = 3_600;
    config.cleanup_interval_secs = 3_600;
    config.backoff_base_ms = 10;
    config.backoff_cap_ms = 50;
    config
}

async fn next_reply(handle: &mut WorkerHandle) -> Reply {
    tokio::time::timeout(Duration::from_secs(5), handle.replies.recv())
        .await
        .expect("timed out waiting for a reply")
        .expect("reply channel closed")
}

async fn init_worker(collector: &MockCollector, db_path: Option<PathBuf>) -> WorkerHandle {
    let mut handle = spawn();
    handle
        .commands
        .send(Command::Init(Box::new(config(&collector.url(), db_path))))
        .unwrap();
    let reply = next_reply(&mut handle).await;
    assert!(reply.success, "init failed: {:?}", reply.error);
    handle
}

// ── Lifecycle ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn init_acknowledges_and_double_init_is_rejected() {
    init_test_logging();
    let collector = MockCollector::accepting().await;
    let mut handle = init_worker(&collector, None).await;

    handle
        .commands
        .send(Command::Init(Box::new(config(&collector.url(), None))))
        .unwrap();
    let reply = next_reply(&mut handle).await;
    assert_eq!(reply.kind, ReplyKind::Init);
    assert!(!reply.success);
    assert!(reply.error.unwrap().contains("already initialized"));
}

#[tokio::test]
async fn commands_before_init_are_errors() {
    let mut handle = spawn();
    handle
        .commands
        .send(Command::Event(sample_event(EventCategory::Performance, 1)))
        .unwrap();
    handle.commands.send(Command::Flush).unwrap();

    for expected in [ReplyKind::Event, ReplyKind::Flush] {
        let reply = next_reply(&mut handle).await;
        assert_eq!(reply.kind, expected);
        assert!(!reply.success);
        assert!(reply.error.unwrap().contains("not initialized"));
    }
}

#[tokio::test]
async fn destroy_acknowledges_and_ends_the_task() {
    let collector = MockCollector::accepting().await;
    let mut handle = init_worker(&collector, None).await;

    handle.commands.send(Command::Destroy).unwrap();
    let reply = next_reply(&mut handle).await;
    assert_eq!(reply.kind, ReplyKind::Destroy);
    assert!(reply.success);

    tokio::time::timeout(Duration::from_secs(5), handle.task)
        .await
        .expect("worker task did not end")
        .unwrap();
    // The command channel is closed once the task is gone.
    assert!(handle.commands.send(Command::Flush).is_err());
}

// ── Event handling ────────────────────────────────────────────────────────

#[tokio::test]
async fn events_are_stored_with_monotonic_ids() {
    let collector = MockCollector::accepting().await;
    let mut handle = init_worker(&collector, None).await;

    let mut last_id = 0i64;
    for marker in 0..3 {
        handle
            .commands
            .send(Command::Event(sample_event(EventCategory::Behavior, marker)))
            .unwrap();
        let reply = next_reply(&mut handle).await;
        assert_eq!(reply.kind, ReplyKind::Event);
        assert!(reply.success);
        let id = reply.id.expect("event reply carries the stored id");
        assert!(id > last_id);
        last_id = id;
    }
}

#[tokio::test]
async fn critical_event_flushes_without_waiting_for_the_timer() {
    init_test_logging();
    let collector = MockCollector::accepting().await;
    let mut handle = init_worker(&collector, None).await;

    handle
        .commands
        .send(Command::Event(sample_event(EventCategory::Error, 7)))
        .unwrap();
    let reply = next_reply(&mut handle).await;
    assert!(reply.success);

    assert!(
        collector.wait_for_requests(1, Duration::from_secs(5)).await,
        "critical events must be flushed immediately"
    );
    let requests = collector.requests();
    assert_eq!(requests[0].body["events"][0]["category"], "error");
    assert_eq!(requests[0].body["events"][0]["data"]["marker"], 7);
}

#[tokio::test]
async fn explicit_flush_delivers_pending_events() {
    let collector = MockCollector::accepting().await;
    let mut handle = init_worker(&collector, None).await;

    for marker in 0..2 {
        handle
            .commands
            .send(Command::Event(sample_event(EventCategory::Network, marker)))
            .unwrap();
        assert!(next_reply(&mut handle).await.success);
    }
    assert_eq!(collector.request_count(), 0, "nothing flushed yet");

    handle.commands.send(Command::Flush).unwrap();
    let reply = next_reply(&mut handle).await;
    assert_eq!(reply.kind, ReplyKind::Flush);
    assert!(reply.success);

    let requests = collector.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body["events"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn cleanup_reports_the_number_of_expired_events() {
    let collector = MockCollector::accepting().await;
    let mut handle = spawn();

    let mut cfg = config(&collector.url(), None);
    // Behavioral events expire instantly; network events live on.
    cfg.retention_overrides.insert("behavior".to_string(), 0);
    handle.commands.send(Command::Init(Box::new(cfg))).unwrap();
    assert!(next_reply(&mut handle).await.success);

    handle
        .commands
        .send(Command::Event(sample_event(EventCategory::Behavior, 1)))
        .unwrap();
    assert!(next_reply(&mut handle).await.success);
    handle
        .commands
        .send(Command::Event(sample_event(EventCategory::Network, 2)))
        .unwrap();
    assert!(next_reply(&mut handle).await.success);

    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.commands.send(Command::Cleanup).unwrap();
    let reply = next_reply(&mut handle).await;
    assert_eq!(reply.kind, ReplyKind::Cleanup);
    assert!(reply.success);
    assert_eq!(reply.id, Some(1), "exactly the expired event is swept");
}

// ── Failure semantics ─────────────────────────────────────────────────────

#[tokio::test]
async fn init_failure_is_reported_not_thrown() {
    let collector = MockCollector::accepting().await;
    let mut handle = spawn();

    let mut cfg = config(&collector.url(), None);
    cfg.db_path = Some(PathBuf::from("/nonexistent-dir/deeper/events.db"));
    handle.commands.send(Command::Init(Box::new(cfg))).unwrap();

    let reply = next_reply(&mut handle).await;
    assert_eq!(reply.kind, ReplyKind::Init);
    assert!(!reply.success);
    assert!(reply.error.is_some());

    // The worker survives and can be initialized properly afterwards.
    handle
        .commands
        .send(Command::Init(Box::new(config(&collector.url(), None))))
        .unwrap();
    assert!(next_reply(&mut handle).await.success);
}

#[tokio::test]
async fn failed_flush_keeps_events_for_the_next_cycle() {
    let collector = MockCollector::start(vec![500]).await;
    let mut handle = init_worker(&collector, None).await;

    handle
        .commands
        .send(Command::Event(sample_event(EventCategory::Network, 1)))
        .unwrap();
    assert!(next_reply(&mut handle).await.success);

    handle.commands.send(Command::Flush).unwrap();
    let reply = next_reply(&mut handle).await;
    assert_eq!(reply.kind, ReplyKind::Flush);
    assert!(!reply.success, "exhausted retries surface in the reply");

    // The event is still there: a later flush against a healthy collector
    // would deliver it. Verified end-to-end in the restart test below.
    handle.commands.send(Command::Flush).unwrap();
    assert!(!next_reply(&mut handle).await.success);
}

// ── Durability across sessions ────────────────────────────────────────────

#[tokio::test]
async fn undelivered_events_survive_a_worker_restart() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("events.db");

    // First session: collector is down, nothing gets delivered.
    {
        let collector = MockCollector::start(vec![500]).await;
        let mut handle = init_worker(&collector, Some(db_path.clone())).await;
        handle
            .commands
            .send(Command::Event(sample_event(EventCategory::Performance, 42)))
            .unwrap();
        assert!(next_reply(&mut handle).await.success);
        handle.commands.send(Command::Destroy).unwrap();
        assert!(next_reply(&mut handle).await.success);
    }

    // Second session: a short flush cadence delivers the leftovers.
    let collector = MockCollector::accepting().await;
    let mut cfg = config(&collector.url(), Some(db_path));
    cfg.flush_interval_secs = 1;
    let mut handle = spawn();
    handle.commands.send(Command::Init(Box::new(cfg))).unwrap();
    assert!(next_reply(&mut handle).await.success);

    assert!(
        collector.wait_for_requests(1, Duration::from_secs(10)).await,
        "events from the previous session must be delivered"
    );
    let requests = collector.requests();
    assert_eq!(requests[0].body["events"][0]["data"]["marker"], 42);
}
