use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::cache::ResultCache;
use crate::extract::{HeadingLocator, Locator};
use crate::fetcher::StreamingFetcher;
use crate::models::{DocumentId, FailureReason, FetchOutcome};
use crate::traits::{Clock, KeyValueStore, SystemClock, Transport};

/// Shared slot for one in-flight fetch.
type InFlight = Arc<OnceCell<FetchOutcome>>;

type InFlightMap = HashMap<DocumentId, InFlight>;

fn lock_map(map: &Mutex<InFlightMap>) -> MutexGuard<'_, InFlightMap> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One caller's hold on an in-flight slot.
///
/// Dropping it (on completion or when the caller's future is dropped)
/// removes the slot once it has settled or nobody else is waiting on it.
struct SlotGuard<'a> {
    in_flight: &'a Mutex<InFlightMap>,
    id: &'a DocumentId,
    cell: InFlight,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let cell = std::mem::take(&mut self.cell);
        let mut in_flight = lock_map(self.in_flight);
        let Some(slot) = in_flight.get(self.id) else {
            return;
        };
        if !Arc::ptr_eq(slot, &cell) {
            return;
        }
        // Release our reference under the lock so concurrent drops see a consistent count.
        drop(cell);
        if slot.initialized() || Arc::strong_count(slot) == 1 {
            in_flight.remove(self.id);
        }
    }
}

/// Caller-facing entry point: cache first, then at most one concurrent
/// fetch per document, writing successes through to the cache.
///
/// One coordinator is one session: its request-state map lives exactly as
/// long as it does.
pub struct Coordinator<T, S, C = SystemClock, L = HeadingLocator> {
    fetcher: StreamingFetcher<T, L>,
    cache: ResultCache<S, C>,
    in_flight: Mutex<InFlightMap>,
}

impl<T, S, C, L> Coordinator<T, S, C, L>
where
    T: Transport,
    S: KeyValueStore,
    C: Clock,
    L: Locator,
{
    pub fn new(fetcher: StreamingFetcher<T, L>, cache: ResultCache<S, C>) -> Self {
        Self {
            fetcher,
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &ResultCache<S, C> {
        &self.cache
    }

    /// Number of documents currently being fetched.
    pub fn pending_requests(&self) -> usize {
        lock_map(&self.in_flight).len()
    }

    /// Resolve `id` to a title + summary.
    ///
    /// 1. Serve a fresh cache entry without touching the network
    /// 2. Otherwise join (or start) the single fetch for this id
    /// 3. Cache successes; failures are not cached so a later call retries
    pub async fn resolve(&self, id: &DocumentId) -> FetchOutcome {
        if let Some(entry) = self.cache.get(id).await {
            tracing::debug!(%id, fetched_at = %entry.fetched_at, "Cache hit");
            return FetchOutcome::Success(entry.result);
        }

        let guard = {
            let mut in_flight = lock_map(&self.in_flight);
            let slot = in_flight.entry(id.clone()).or_default();
            // A settled failure not yet removed by its last holder must not be replayed.
            if matches!(slot.get(), Some(FetchOutcome::Failure(_))) {
                *slot = InFlight::default();
            }
            SlotGuard {
                in_flight: &self.in_flight,
                id,
                cell: Arc::clone(slot),
            }
        };

        let outcome = guard
            .cell
            .get_or_init(|| self.fetch_and_store(id))
            .await
            .clone();

        drop(guard);
        outcome
    }

    /// Like [`resolve`](Self::resolve), but gives up with
    /// [`FailureReason::Aborted`] as soon as `cancel` fires.
    ///
    /// Abandoning a fetch other callers are waiting on hands it to one of them.
    pub async fn resolve_with_cancel(
        &self,
        id: &DocumentId,
        cancel: &CancellationToken,
    ) -> FetchOutcome {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(%id, "Request aborted by caller");
                FetchOutcome::Failure(FailureReason::Aborted)
            }
            outcome = self.resolve(id) => outcome,
        }
    }

    async fn fetch_and_store(&self, id: &DocumentId) -> FetchOutcome {
        let outcome = self.fetcher.fetch(id).await;
        match &outcome {
            FetchOutcome::Success(result) => self.cache.put(id, result).await,
            FetchOutcome::Failure(reason) => {
                tracing::info!(%id, %reason, "No summary available");
            }
        }
        outcome
    }
}
