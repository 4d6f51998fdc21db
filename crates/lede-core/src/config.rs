use std::time::Duration;

use url::Url;

use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://grokipedia.com";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_BUFFER_CHARS: usize = 1_000_000;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Limits and endpoint for the streaming fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Documents are requested from `<base_url>/page/<id>`.
    pub base_url: Url,
    /// Wall-clock budget for one fetch, connection included.
    pub timeout: Duration,
    /// Stop reading once the decoded buffer holds more characters than this.
    pub max_buffer_chars: usize,
}

impl FetcherConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_FETCH_TIMEOUT,
            max_buffer_chars: DEFAULT_MAX_BUFFER_CHARS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_buffer_chars(mut self, max_buffer_chars: usize) -> Self {
        self.max_buffer_chars = max_buffer_chars;
        self
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self::new(Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"))
    }
}

/// Top-level configuration shared by the binaries.
#[derive(Debug, Clone)]
pub struct LedeConfig {
    pub fetcher: FetcherConfig,
    pub cache_ttl: Duration,
}

impl LedeConfig {
    /// Read configuration from environment variables.
    ///
    /// - `LEDE_BASE_URL` (optional, defaults to `https://grokipedia.com`)
    /// - `LEDE_FETCH_TIMEOUT_SECS` (optional, defaults to 10)
    /// - `LEDE_MAX_BUFFER_CHARS` (optional, defaults to 1000000)
    /// - `LEDE_CACHE_TTL_SECS` (optional, defaults to 3600)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let base_url = match lookup("LEDE_BASE_URL") {
            None => Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            Some(raw) => Url::parse(&raw).map_err(|e| {
                AppError::ConfigError(format!("Invalid LEDE_BASE_URL '{raw}': {e}"))
            })?,
        };
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(AppError::ConfigError(format!(
                "LEDE_BASE_URL must be http or https, got '{}'",
                base_url.scheme()
            )));
        }

        let timeout_secs = positive(&lookup, "LEDE_FETCH_TIMEOUT_SECS", 10)?;
        let max_buffer_chars = positive(&lookup, "LEDE_MAX_BUFFER_CHARS", DEFAULT_MAX_BUFFER_CHARS as u64)?;
        let ttl_secs = positive(&lookup, "LEDE_CACHE_TTL_SECS", 3600)?;

        Ok(Self {
            fetcher: FetcherConfig::new(base_url)
                .with_timeout(Duration::from_secs(timeout_secs))
                .with_max_buffer_chars(max_buffer_chars as usize),
            cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

impl Default for LedeConfig {
    fn default() -> Self {
        Self {
            fetcher: FetcherConfig::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<u64, AppError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let parsed: u64 = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {key} '{raw}': must be a positive integer"))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{key} must be at least 1")));
    }
    Ok(parsed)
}
