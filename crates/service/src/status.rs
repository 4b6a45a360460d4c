use std::sync::Arc;

use models::timestamp::now_millis;
use models::{Source, StatusDocument, UpdateResult};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::errors::StatusError;
use crate::storage::{KvStore, StoreError};

/// Read / update contract over the single status record.
///
/// Holds no state of its own beyond the injected store and the record key.
/// Updates are read-modify-write against the store; two concurrent updates
/// may race and the later write wins for the whole document.
#[derive(Clone)]
pub struct StatusStore {
    kv: Arc<dyn KvStore>,
    key: String,
}

impl StatusStore {
    pub fn new(kv: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self { kv, key: key.into() }
    }

    /// Current document, creating and persisting the default on first access.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn read(&self) -> Result<StatusDocument, StatusError> {
        self.load_or_init().await
    }

    /// Replace one source's payload and stamp `last_updated`.
    ///
    /// Unknown sources fail with [`StatusError::InvalidSource`] before anything
    /// is written.
    #[instrument(skip(self, data), fields(key = %self.key))]
    pub async fn update_source(&self, source: &str, data: Value) -> Result<UpdateResult, StatusError> {
        let mut doc = self.load_or_init().await?;
        let source: Source = source
            .parse()
            .map_err(|_| StatusError::InvalidSource(source.to_string()))?;

        let now = now_millis();
        doc.apply(source, data, now);
        self.persist(&doc).await?;

        info!(%source, last_updated = %now, "source updated");
        Ok(UpdateResult { source, last_updated: now })
    }

    async fn load_or_init(&self) -> Result<StatusDocument, StatusError> {
        match self.kv.get(&self.key).await.map_err(StatusError::StoreRead)? {
            Some(Value::Null) | None => {
                let doc = StatusDocument::default();
                self.persist(&doc).await?;
                info!("initialized default status document");
                Ok(doc)
            }
            Some(raw) => {
                debug!("loaded status document");
                serde_json::from_value(raw)
                    .map_err(|e| StatusError::StoreRead(StoreError::Serialization(format!("malformed status document: {e}"))))
            }
        }
    }

    async fn persist(&self, doc: &StatusDocument) -> Result<(), StatusError> {
        let value = serde_json::to_value(doc)
            .map_err(|e| StatusError::StoreWrite(StoreError::Serialization(e.to_string())))?;
        self.kv.set(&self.key, value).await.map_err(StatusError::StoreWrite)
    }
}
