use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::AppError;

/// Opens streaming GET requests.
///
/// Implementations must fail with [`AppError::HttpError`] on a non-success
/// status without reading the body.
pub trait Transport: Send + Sync + Clone {
    type Stream: ChunkStream;

    fn open(&self, url: &Url) -> impl Future<Output = Result<Self::Stream, AppError>> + Send;
}

/// A response body delivered chunk by chunk.
///
/// Dropping the stream cancels the transfer.
pub trait ChunkStream: Send {
    /// Next chunk of raw bytes, or `None` once the body is complete.
    fn next_chunk(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>, AppError>> + Send;
}

/// Generic key-value persistence with batch semantics and no cross-key transactions.
pub trait KeyValueStore: Send + Sync + Clone {
    /// Values for the requested keys; missing keys are simply absent from the map.
    fn get(
        &self,
        keys: &[String],
    ) -> impl Future<Output = Result<HashMap<String, serde_json::Value>, AppError>> + Send;

    fn set(
        &self,
        entries: HashMap<String, serde_json::Value>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn remove(&self, keys: &[String]) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Source of the current time for cache freshness.
pub trait Clock: Send + Sync + Clone {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
