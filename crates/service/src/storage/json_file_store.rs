use std::{collections::BTreeMap, io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::{fs, sync::Mutex};
use tracing::debug;

use super::{KvStore, StoreError};

/// JSON file-backed key-value store.
///
/// Every key lives in one JSON object on disk. Reads always go to the file so
/// edits made by other processes are visible; writes replace the file through
/// a temp file and rename, so a reader never sees a half-written document.
/// A corrupt file is reported as an error rather than reset.
pub struct JsonFileKvStore {
    file_path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileKvStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { file_path: path.into(), write_lock: Mutex::new(()) }
    }

    async fn load(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        match fs::read(&self.file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::Serialization(format!("{}: {e}", self.file_path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StoreError::Io(format!("{}: {e}", self.file_path.display()))),
        }
    }

    async fn save(&self, map: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(map).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut tmp = self.file_path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, data).await.map_err(|e| StoreError::Io(format!("{}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.file_path)
            .await
            .map_err(|e| StoreError::Io(format!("{}: {e}", self.file_path.display())))?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for JsonFileKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut map = self.load().await?;
        Ok(map.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        map.insert(key.to_string(), value);
        self.save(&map).await?;
        debug!(path = %self.file_path.display(), %key, "persisted key");
        Ok(())
    }
}
