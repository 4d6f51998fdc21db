use std::time::Duration;

use lede_core::error::AppError;
use lede_core::traits::{ChunkStream, Transport};
use reqwest::{Client, Response};
use url::Url;

const USER_AGENT: &str = concat!("lede/", env!("CARGO_PKG_VERSION"));
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Streaming HTTP transport using reqwest.
///
/// No overall request timeout is set on the client: the fetcher owns the
/// deadline and cancels by dropping the body stream. Only connection setup
/// is bounded here.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    connect_timeout_secs: u64,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, AppError> {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            connect_timeout_secs: timeout.as_secs(),
        })
    }

    fn map_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.connect_timeout_secs)
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {e}"))
        } else {
            AppError::HttpError(e.to_string())
        }
    }
}

impl Transport for ReqwestTransport {
    type Stream = ResponseChunks;

    async fn open(&self, url: &Url) -> Result<ResponseChunks, AppError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        // The body of an error response is never read; dropping it closes the connection.
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        tracing::debug!(%url, status = status.as_u16(), "Response headers received");
        Ok(ResponseChunks { response })
    }
}

/// Body of a successful response, read chunk by chunk as it arrives.
pub struct ResponseChunks {
    response: Response,
}

impl ChunkStream for ResponseChunks {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, AppError> {
        self.response
            .chunk()
            .await
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .map_err(|e| AppError::NetworkError(format!("Failed to read response body: {e}")))
    }
}
