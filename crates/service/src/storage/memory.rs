use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{KvStore, StoreError};

/// In-process store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryKvStore {
    inner: RwLock<HashMap<String, Value>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let map = self.inner.read().await;
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut map = self.inner.write().await;
        map.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_overwrites_whole_value() -> Result<(), anyhow::Error> {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("k").await?, None);

        store.set("k", json!({"a": 1, "b": 2})).await?;
        store.set("k", json!({"c": 3})).await?;
        assert_eq!(store.get("k").await?, Some(json!({"c": 3})));
        assert_eq!(store.get("other").await?, None);
        Ok(())
    }
}
