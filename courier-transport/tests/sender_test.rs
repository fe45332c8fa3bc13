use std::sync::Arc;
use std::time::Duration;

use courier_core::event::EventCategory;
use courier_transport::{
    Backoff, BatchSender, BeaconSender, EventEnvelope, HttpClient, HttpClientConfig, SenderConfig,
    SenderState,
};
use test_fixtures::{init_test_logging, sample_event, stored_event, MockCollector, RecordingSource};

fn sender_config(batch_size: usize, max_retries: u32) -> SenderConfig {
    SenderConfig {
        app_id: "test-app".to_string(),
        batch_size,
        max_retries,
        // Tight backoff so failure tests stay fast.
        backoff: Backoff::new(10, 50),
        max_pull: 1_000,
    }
}

fn sender_for(
    collector: &MockCollector,
    source: Arc<RecordingSource>,
    batch_size: usize,
    max_retries: u32,
) -> BatchSender {
    let client = HttpClient::new(HttpClientConfig::new(collector.url())).unwrap();
    BatchSender::new(client, source, sender_config(batch_size, max_retries))
}

// ── Happy path ────────────────────────────────────────────────────────────

#[tokio::test]
async fn flush_delivers_and_acknowledges_once() {
    init_test_logging();
    let collector = MockCollector::accepting().await;
    let source = RecordingSource::with_events(vec![
        stored_event(1, EventCategory::Performance, 1),
        stored_event(2, EventCategory::Network, 2),
    ]);
    let sender = sender_for(&collector, Arc::clone(&source), 10, 3);

    assert!(sender.flush_now().await.unwrap());

    assert_eq!(source.acks(), vec![vec![1, 2]]);
    assert_eq!(source.remaining(), 0);
    let requests = collector.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body["appId"], "test-app");
    assert_eq!(requests[0].body["events"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn flush_with_empty_source_sends_nothing() {
    let collector = MockCollector::accepting().await;
    let source = RecordingSource::with_events(Vec::new());
    let sender = sender_for(&collector, Arc::clone(&source), 10, 3);

    assert!(sender.flush_now().await.unwrap());
    assert_eq!(collector.request_count(), 0);
    assert!(source.acks().is_empty());
}

#[tokio::test]
async fn flush_chunks_sequentially_and_acknowledges_the_whole_pull() {
    let collector = MockCollector::accepting().await;
    let source = RecordingSource::with_events(
        (1..=5)
            .map(|i| stored_event(i, EventCategory::Behavior, i as u64))
            .collect(),
    );
    let sender = sender_for(&collector, Arc::clone(&source), 2, 3);

    assert!(sender.flush_now().await.unwrap());

    let requests = collector.requests();
    assert_eq!(requests.len(), 3, "5 events at batch_size 2 -> 3 chunks");
    let sizes: Vec<usize> = requests
        .iter()
        .map(|r| r.body["events"].as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    // One acknowledgment covering everything that was pulled.
    assert_eq!(source.acks(), vec![vec![1, 2, 3, 4, 5]]);
}

// ── Retry & failure ───────────────────────────────────────────────────────

#[tokio::test]
async fn retry_twice_then_succeed_acknowledges_exactly_once() {
    init_test_logging();
    let collector = MockCollector::start(vec![500, 500, 200]).await;
    let source = RecordingSource::with_events(vec![
        stored_event(1, EventCategory::Error, 1),
        stored_event(2, EventCategory::Error, 2),
    ]);
    let sender = sender_for(&collector, Arc::clone(&source), 10, 3);

    assert!(sender.flush_now().await.unwrap());

    assert_eq!(collector.request_count(), 3);
    assert_eq!(source.acks(), vec![vec![1, 2]], "one ack with all pulled ids");
    assert_eq!(source.remaining(), 0);
}

#[tokio::test]
async fn exhausted_retries_leave_the_source_untouched() {
    let collector = MockCollector::start(vec![500]).await;
    let source = RecordingSource::with_events(vec![stored_event(1, EventCategory::Error, 1)]);
    let sender = sender_for(&collector, Arc::clone(&source), 10, 2);

    let err = sender.flush_now().await.unwrap_err();
    assert!(err.to_string().contains("retries exhausted"), "{err}");

    assert!(source.acks().is_empty(), "no partial acknowledgment");
    assert_eq!(source.remaining(), 1, "failed send leaves the store unchanged");
    // The sender recovers: a later cycle may run again.
    assert_eq!(sender.state(), SenderState::Idle);
}

#[tokio::test]
async fn chunk_failure_fails_the_whole_attempt() {
    // First chunk accepted, second rejected: nothing may be acknowledged.
    let collector = MockCollector::start(vec![200, 500, 200, 500]).await;
    let source = RecordingSource::with_events(vec![
        stored_event(1, EventCategory::Network, 1),
        stored_event(2, EventCategory::Network, 2),
        stored_event(3, EventCategory::Network, 3),
    ]);
    let sender = sender_for(&collector, Arc::clone(&source), 2, 2);

    assert!(sender.flush_now().await.is_err());
    assert!(source.acks().is_empty());
    assert_eq!(source.remaining(), 3);
}

// ── State machine ─────────────────────────────────────────────────────────

#[tokio::test]
async fn stopped_sender_refuses_new_cycles() {
    let collector = MockCollector::accepting().await;
    let source = RecordingSource::with_events(vec![stored_event(1, EventCategory::Error, 1)]);
    let sender = sender_for(&collector, Arc::clone(&source), 10, 3);

    sender.stop();
    assert_eq!(sender.state(), SenderState::Stopped);
    assert!(!sender.try_flush());
    assert!(!sender.flush_now().await.unwrap());
    assert_eq!(source.remaining(), 1);
    assert_eq!(collector.request_count(), 0);
}

#[tokio::test]
async fn background_flush_runs_to_completion() {
    let collector = MockCollector::accepting().await;
    let source = RecordingSource::with_events(vec![stored_event(1, EventCategory::Replay, 1)]);
    let sender = sender_for(&collector, Arc::clone(&source), 10, 3);

    assert!(sender.try_flush());
    assert!(collector.wait_for_requests(1, Duration::from_secs(5)).await);
    // Poll until the background task acknowledged.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while source.remaining() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(source.remaining(), 0);
}

// ── Compression ───────────────────────────────────────────────────────────

#[tokio::test]
async fn compressed_bodies_arrive_gzipped() {
    let collector = MockCollector::accepting().await;
    let source = RecordingSource::with_events(vec![stored_event(1, EventCategory::Snapshot, 1)]);
    let client =
        HttpClient::new(HttpClientConfig::new(collector.url()).with_compression(true)).unwrap();
    let sender = BatchSender::new(client, source, sender_config(10, 3));

    assert!(sender.flush_now().await.unwrap());

    let requests = collector.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].gzip, "body must be gzip-encoded");
    assert_eq!(requests[0].body["appId"], "test-app");
}

// ── Unload beacon ─────────────────────────────────────────────────────────

#[tokio::test]
async fn beacon_hands_off_and_marks_the_envelope() {
    let collector = MockCollector::accepting().await;
    let beacon = BeaconSender::new(collector.url(), "test-app");

    let handed_off = beacon.send(vec![
        sample_event(EventCategory::Error, 1),
        sample_event(EventCategory::Behavior, 2),
    ]);
    assert!(handed_off);

    assert!(collector.wait_for_requests(1, Duration::from_secs(5)).await);
    let requests = collector.requests();
    assert_eq!(requests[0].body["sentBy"], "beacon");
    assert_eq!(requests[0].body["events"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn beacon_with_nothing_pending_is_a_noop() {
    let collector = MockCollector::accepting().await;
    let beacon = BeaconSender::new(collector.url(), "test-app");
    assert!(beacon.send(Vec::<courier_core::event::Event>::new()));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(collector.request_count(), 0);
}

// ── Direct blocking path ──────────────────────────────────────────────────

#[tokio::test]
async fn direct_blocking_send_reports_rejection() {
    let collector = MockCollector::start(vec![503]).await;
    let url = collector.url();

    let result = tokio::task::spawn_blocking(move || {
        let envelope = EventEnvelope::batch("test-app", vec![sample_event(EventCategory::Error, 1)]);
        courier_transport::direct::post_envelope_blocking(
            &url,
            &envelope,
            Duration::from_secs(2),
        )
    })
    .await
    .unwrap();

    assert!(result.is_err());
}
