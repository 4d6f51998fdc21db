//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit and integration tests.
//! Counters are shared through `Arc`s so a test can keep a clone of the mock
//! and assert on what the code under test did with it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use url::Url;

use crate::error::AppError;
use crate::traits::{ChunkStream, Clock, KeyValueStore, Transport};

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Scripted transport: every `open` serves the same chunk list.
#[derive(Clone, Default)]
pub struct MockTransport {
    chunks: Arc<Vec<Vec<u8>>>,
    status: Option<u16>,
    stall_on_open: bool,
    stall_after: Option<usize>,
    read_error_at: Option<usize>,
    chunk_delay: Duration,
    opens: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub fn new(chunks: Vec<String>) -> Self {
        Self::from_bytes(chunks.into_iter().map(String::into_bytes).collect())
    }

    pub fn from_bytes(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks: Arc::new(chunks),
            ..Self::default()
        }
    }

    /// Every `open` fails as if the server answered with `status`.
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// `open` never resolves.
    pub fn stall_on_open(mut self) -> Self {
        self.stall_on_open = true;
        self
    }

    /// Reads after the first `n` chunks never resolve.
    pub fn stall_after(mut self, n: usize) -> Self {
        self.stall_after = Some(n);
        self
    }

    /// The read with index `n` (zero-based) fails.
    pub fn read_error_at(mut self, n: usize) -> Self {
        self.read_error_at = Some(n);
        self
    }

    /// Sleep before delivering each chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of `next_chunk` calls across all streams.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn dropped_streams(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    type Stream = MockStream;

    async fn open(&self, url: &Url) -> Result<MockStream, AppError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());

        if self.stall_on_open {
            std::future::pending::<()>().await;
        }
        if let Some(status) = self.status {
            return Err(AppError::HttpError(format!("HTTP {status} for {url}")));
        }

        Ok(MockStream {
            transport: self.clone(),
            position: 0,
        })
    }
}

/// Stream handed out by [`MockTransport`].
pub struct MockStream {
    transport: MockTransport,
    position: usize,
}

impl ChunkStream for MockStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, AppError> {
        self.transport.reads.fetch_add(1, Ordering::SeqCst);

        if self.transport.read_error_at == Some(self.position) {
            return Err(AppError::NetworkError("connection reset".into()));
        }
        if self.transport.stall_after.is_some_and(|n| self.position >= n) {
            std::future::pending::<()>().await;
        }
        if !self.transport.chunk_delay.is_zero() {
            tokio::time::sleep(self.transport.chunk_delay).await;
        }

        let chunk = self.transport.chunks.get(self.position).cloned();
        self.position += 1;
        Ok(chunk)
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.transport.drops.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// FailingStore
// ---------------------------------------------------------------------------

/// Store whose every operation fails.
#[derive(Clone, Default)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    async fn get(&self, _keys: &[String]) -> Result<HashMap<String, serde_json::Value>, AppError> {
        Err(AppError::StoreError("store unavailable".into()))
    }

    async fn set(&self, _entries: HashMap<String, serde_json::Value>) -> Result<(), AppError> {
        Err(AppError::StoreError("store unavailable".into()))
    }

    async fn remove(&self, _keys: &[String]) -> Result<(), AppError> {
        Err(AppError::StoreError("store unavailable".into()))
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

/// Clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Payload chunks for a page whose summary becomes extractable on the third chunk.
pub fn article_chunks(title: &str, paragraph: &str) -> Vec<String> {
    vec![
        "<html><head><script>self.__next_f.push([1,\"".to_string(),
        format!(r"# {title}\n\n"),
        format!(r"{paragraph}\n\n"),
        r"## Background\n\nMore text follows.".to_string(),
        "\"])</script></html>".to_string(),
    ]
}
