use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lede_core::error::AppError;
use lede_core::traits::KeyValueStore;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

/// [`KeyValueStore`] persisted as a single JSON object on disk.
///
/// Every operation reads the whole file; writes go to a sibling temp file
/// that is renamed over the original. Clones share one lock, so writers in
/// the same process never interleave.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, ordered by key.
    pub async fn entries(&self) -> Result<BTreeMap<String, Value>, AppError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_iter().collect())
    }

    /// Delete the backing file. Returns how many entries it held.
    pub async fn clear(&self) -> Result<usize, AppError> {
        let _guard = self.lock.lock().await;
        let count = self.load().await.map(|entries| entries.len()).unwrap_or(0);

        match tokio::fs::remove_file(self.path.as_path()).await {
            Ok(()) => Ok(count),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(self.io_error("remove", e)),
        }
    }

    async fn load(&self) -> Result<Map<String, Value>, AppError> {
        let contents = match tokio::fs::read_to_string(self.path.as_path()).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.io_error("read", e)),
        };
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        Ok(serde_json::from_str(&contents)?)
    }

    /// Load for a write. A malformed file is replaced rather than blocking every write.
    async fn load_for_write(&self) -> Result<Map<String, Value>, AppError> {
        match self.load().await {
            Err(AppError::SerializationError(e)) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Discarding malformed cache file");
                Ok(Map::new())
            }
            other => other,
        }
    }

    async fn save(&self, entries: &Map<String, Value>) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error("create directory for", e))?;
        }

        let mut tmp: OsString = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let body = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| self.io_error("write", e))?;
        tokio::fs::rename(&tmp, self.path.as_path())
            .await
            .map_err(|e| self.io_error("replace", e))
    }

    fn io_error(&self, action: &str, e: std::io::Error) -> AppError {
        AppError::StoreError(format!("Failed to {action} {}: {e}", self.path.display()))
    }
}

impl KeyValueStore for JsonFileStore {
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>, AppError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        Ok(keys
            .iter()
            .filter_map(|key| entries.remove(key).map(|value| (key.clone(), value)))
            .collect())
    }

    async fn set(&self, new_entries: HashMap<String, Value>) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load_for_write().await?;
        entries.extend(new_entries);
        self.save(&entries).await
    }

    async fn remove(&self, keys: &[String]) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load_for_write().await?;
        let before = entries.len();
        for key in keys {
            entries.remove(key);
        }
        if entries.len() == before {
            return Ok(());
        }
        self.save(&entries).await
    }
}
