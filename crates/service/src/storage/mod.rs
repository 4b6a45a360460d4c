//! Storage abstractions for the service layer
//!
//! The status document lives in an external key-value store. The store is
//! injected as an `Arc<dyn KvStore>` so tests and local runs can swap the
//! hosted backend for an in-memory or file-backed one.

pub mod json_file_store;
pub mod memory;
pub mod rest_store;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use configs::{StoreBackend, StoreConfig};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

pub use json_file_store::JsonFileKvStore;
pub use memory::MemoryKvStore;
pub use rest_store::RestKvStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Minimal key-value capability: whole-value reads and overwrites.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns `None` when the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Build the backend selected in config.
pub fn build_kv_store(cfg: &StoreConfig) -> Result<Arc<dyn KvStore>, StoreError> {
    let store: Arc<dyn KvStore> = match cfg.backend {
        StoreBackend::Memory => Arc::new(MemoryKvStore::new()),
        StoreBackend::File => Arc::new(JsonFileKvStore::new(&cfg.file_path)),
        StoreBackend::Rest => Arc::new(RestKvStore::new(
            &cfg.rest_url,
            &cfg.rest_token,
            Duration::from_secs(cfg.timeout_secs),
        )?),
    };
    info!(backend = ?cfg.backend, key = %cfg.status_key, "kv store ready");
    Ok(store)
}
