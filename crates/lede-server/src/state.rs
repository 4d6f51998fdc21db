use lede_client::ReqwestTransport;
use lede_core::{AppError, Coordinator, LedeConfig, MemoryStore, ResultCache, StreamingFetcher};

pub type SummaryCoordinator = Coordinator<ReqwestTransport, MemoryStore>;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
///
/// One coordinator serves every request, so concurrent lookups of the same
/// document share a single upstream fetch and the in-memory cache.
pub struct AppState {
    pub coordinator: SummaryCoordinator,
}

impl AppState {
    pub fn new(config: &LedeConfig) -> Result<Self, AppError> {
        let fetcher = StreamingFetcher::new(ReqwestTransport::new()?, config.fetcher.clone());
        let cache = ResultCache::new(MemoryStore::new(), config.cache_ttl);

        Ok(Self {
            coordinator: Coordinator::new(fetcher, cache),
        })
    }
}
