//! Shared test helpers for the Courier workspace: a scripted mock
//! collector endpoint, an in-memory recording batch source, and event
//! builders used by integration tests across crates.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use courier_core::errors::CourierResult;
use courier_core::event::{Event, EventCategory, StoredEvent};
use courier_core::traits::BatchSource;

/// Install a fmt subscriber for a test run. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build an event with a numeric marker for later identification.
pub fn sample_event(category: EventCategory, marker: u64) -> Event {
    Event::new(category, serde_json::json!({ "marker": marker }))
}

/// Build a stored event expiring one hour from now.
pub fn stored_event(id: i64, category: EventCategory, marker: u64) -> StoredEvent {
    StoredEvent::from_event(
        id,
        sample_event(category, marker),
        Utc::now() + ChronoDuration::hours(1),
    )
}

// ── Recording batch source ───────────────────────────────────────────────

/// In-memory [`BatchSource`] that records every acknowledgment.
#[derive(Default)]
pub struct RecordingSource {
    events: Mutex<Vec<StoredEvent>>,
    acks: Mutex<Vec<Vec<i64>>>,
}

impl RecordingSource {
    pub fn with_events(events: Vec<StoredEvent>) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(events),
            acks: Mutex::new(Vec::new()),
        })
    }

    /// Every `ack_delivered` call, in order, with the ids it carried.
    pub fn acks(&self) -> Vec<Vec<i64>> {
        self.acks.lock().unwrap().clone()
    }

    /// Events not yet acknowledged.
    pub fn remaining(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl BatchSource for RecordingSource {
    fn fetch_batch(&self, limit: usize) -> CourierResult<Vec<StoredEvent>> {
        let events = self.events.lock().unwrap();
        Ok(events.iter().take(limit).cloned().collect())
    }

    fn ack_delivered(&self, ids: &[i64]) -> CourierResult<usize> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| !ids.contains(&e.id));
        self.acks.lock().unwrap().push(ids.to_vec());
        Ok(before - events.len())
    }
}

// ── Mock collector endpoint ──────────────────────────────────────────────

/// One request as the collector saw it.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    /// Decoded JSON body (after gzip, when present).
    pub body: serde_json::Value,
    /// Whether the request arrived with `Content-Encoding: gzip`.
    pub gzip: bool,
}

/// Minimal scripted HTTP collector. Answers each request with the next
/// status in the script, repeating the last one when the script runs out.
pub struct MockCollector {
    addr: std::net::SocketAddr,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl MockCollector {
    pub async fn start(statuses: Vec<u16>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock collector");
        let addr = listener.local_addr().expect("mock collector addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(accept_loop(listener, statuses, Arc::clone(&requests)));
        Self {
            addr,
            requests,
            task,
        }
    }

    /// Collector that accepts everything.
    pub async fn accepting() -> Self {
        Self::start(vec![200]).await
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Poll until at least `n` requests arrived. Returns false on timeout.
    pub async fn wait_for_requests(&self, n: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.request_count() >= n {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        self.request_count() >= n
    }
}

impl Drop for MockCollector {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    statuses: Vec<u16>,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
) {
    let mut served = 0usize;
    loop {
        let Ok((mut socket, _)) = listener.accept().await else {
            break;
        };
        let status = statuses
            .get(served)
            .or(statuses.last())
            .copied()
            .unwrap_or(200);
        served += 1;

        if let Some((headers, body)) = read_request(&mut socket).await {
            let gzip = headers
                .to_ascii_lowercase()
                .contains("content-encoding: gzip");
            let decoded = if gzip { gunzip(&body) } else { body };
            if let Ok(value) = serde_json::from_slice(&decoded) {
                requests.lock().unwrap().push(ReceivedRequest { body: value, gzip });
            }
        }

        let response = format!(
            "HTTP/1.1 {status} MOCK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<(String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }

    let end = (header_end + content_length).min(buf.len());
    Some((headers, buf[header_end..end].to_vec()))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn gunzip(body: &[u8]) -> Vec<u8> {
    use std::io::Read;
    let mut decoder = flate2::read::GzDecoder::new(body);
    let mut out = Vec::new();
    if decoder.read_to_end(&mut out).is_err() {
        return body.to_vec();
    }
    out
}
