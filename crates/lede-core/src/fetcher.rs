//! Bounded streaming fetch: read a document chunk by chunk and stop the
//! moment a title + summary can be extracted.
//!
//! ```text
//! INIT → STREAMING ─┬─ found ───────────→ cancel → Success
//!                   ├─ timed out ───────→ final attempt → Success | Failure
//!                   ├─ size capped ─────→ final attempt → Success | Failure
//!                   ├─ body complete ───→ final attempt → Success | Failure
//!                   └─ transport error ─→ Failure
//! ```
//!
//! One [`CancellationToken`] drives both early exits: the extractor cancels
//! it on success and the watchdog cancels it when the time budget runs out.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::FetcherConfig;
use crate::decode::Utf8Decoder;
use crate::error::AppError;
use crate::extract::{Extractor, HeadingLocator, Locator};
use crate::models::{DocumentId, FailureReason, FetchOutcome, StopReason};
use crate::traits::{ChunkStream, Transport};

/// Streams documents through an [`Extractor`] under time and size limits.
///
/// Never returns an error: every failure path resolves to
/// [`FetchOutcome::Failure`]. No retries happen here.
#[derive(Clone)]
pub struct StreamingFetcher<T, L = HeadingLocator> {
    transport: T,
    extractor: Extractor<L>,
    config: FetcherConfig,
}

impl<T: Transport> StreamingFetcher<T> {
    pub fn new(transport: T, config: FetcherConfig) -> Self {
        Self::with_extractor(transport, Extractor::new(), config)
    }
}

impl<T: Transport, L: Locator> StreamingFetcher<T, L> {
    pub fn with_extractor(transport: T, extractor: Extractor<L>, config: FetcherConfig) -> Self {
        Self {
            transport,
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch `id` and extract its title + summary.
    pub async fn fetch(&self, id: &DocumentId) -> FetchOutcome {
        let url = match document_url(&self.config.base_url, id) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(%id, error = %e, "Cannot build document URL");
                return FetchOutcome::Failure(FailureReason::Transport(e.to_string()));
            }
        };

        let cancel = CancellationToken::new();
        let _watchdog = Watchdog::arm(cancel.clone(), self.config.timeout);

        tracing::debug!(%id, %url, "Fetching document");
        self.stream(id, &url, &cancel).await
    }

    async fn stream(&self, id: &DocumentId, url: &Url, cancel: &CancellationToken) -> FetchOutcome {
        let mut state = StreamState::default();

        // Only the watchdog can cancel before extraction succeeds.
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            opened = self.transport.open(url) => Some(opened),
        };
        let mut stream = match opened {
            None => return self.final_attempt(id, state, StopReason::TimedOut),
            Some(Ok(stream)) => stream,
            Some(Err(e)) => return transport_failure(id, e, &state),
        };

        let stop = loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => break StopReason::TimedOut,
                next = stream.next_chunk() => next,
            };

            match next {
                Ok(Some(chunk)) => {
                    state.push(&chunk);
                    tracing::debug!(
                        %id,
                        chunk = state.chunks,
                        bytes = state.bytes,
                        chars = state.chars,
                        "Received chunk"
                    );

                    if let Some(result) = self.extractor.try_extract(&state.buffer, id) {
                        cancel.cancel();
                        drop(stream);
                        tracing::info!(
                            %id,
                            chunks = state.chunks,
                            bytes = state.bytes,
                            "Summary found, transfer cancelled"
                        );
                        return FetchOutcome::Success(result);
                    }

                    if state.chars > self.config.max_buffer_chars {
                        break StopReason::SizeCapped;
                    }
                }
                Ok(None) => break StopReason::Completed,
                Err(e) => return transport_failure(id, e, &state),
            }
        };

        drop(stream);
        self.final_attempt(id, state, stop)
    }

    fn final_attempt(&self, id: &DocumentId, mut state: StreamState, stop: StopReason) -> FetchOutcome {
        state.finish();
        match self.extractor.try_extract(&state.buffer, id) {
            Some(result) => {
                tracing::info!(%id, %stop, bytes = state.bytes, "Summary found on final attempt");
                FetchOutcome::Success(result)
            }
            None => {
                tracing::warn!(%id, %stop, bytes = state.bytes, "No summary in payload");
                FetchOutcome::Failure(FailureReason::Unextractable { stop })
            }
        }
    }
}

/// Request URL for a document: `<base>/page/<id>`, with the id as one
/// percent-encoded path segment.
pub fn document_url(base: &Url, id: &DocumentId) -> Result<Url, AppError> {
    let mut url = base.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|()| {
            AppError::ConfigError(format!("base URL '{base}' cannot carry a path"))
        })?;
        segments.pop_if_empty().push("page").push(&id.decoded());
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn transport_failure(id: &DocumentId, error: AppError, state: &StreamState) -> FetchOutcome {
    tracing::warn!(%id, error = %error, bytes = state.bytes, "Fetch failed");
    FetchOutcome::Failure(FailureReason::Transport(error.to_string()))
}

/// Everything received so far by one fetch.
#[derive(Default)]
struct StreamState {
    buffer: String,
    decoder: Utf8Decoder,
    chars: usize,
    bytes: usize,
    chunks: usize,
}

impl StreamState {
    fn push(&mut self, chunk: &[u8]) {
        let start = self.buffer.len();
        self.decoder.decode_into(chunk, &mut self.buffer);
        self.chars += self.buffer[start..].chars().count();
        self.bytes += chunk.len();
        self.chunks += 1;
    }

    fn finish(&mut self) {
        self.decoder.finish(&mut self.buffer);
    }
}

/// Cancels a token once a deadline passes. Disarmed when dropped.
struct Watchdog {
    handle: JoinHandle<()>,
}

impl Watchdog {
    fn arm(token: CancellationToken, timeout: Duration) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::debug!(timeout_secs = timeout.as_secs(), "Fetch deadline reached");
            token.cancel();
        });
        Self { handle }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
