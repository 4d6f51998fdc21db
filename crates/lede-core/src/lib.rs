pub mod cache;
pub mod config;
pub mod coordinator;
pub mod decode;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod models;
pub mod sanitize;
pub mod store;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use cache::ResultCache;
pub use config::{FetcherConfig, LedeConfig};
pub use coordinator::Coordinator;
pub use error::AppError;
pub use extract::{Extractor, HeadingLocator, Located, Locator};
pub use fetcher::StreamingFetcher;
pub use models::{
    CacheEntry, DocumentId, ExtractionResult, FailureReason, FetchOutcome, StopReason,
};
pub use store::MemoryStore;
pub use traits::{ChunkStream, Clock, KeyValueStore, SystemClock, Transport};
