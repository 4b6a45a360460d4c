use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{KvStore, StoreError};

/// Hosted key-value store spoken to over its Redis-over-REST API
/// (`GET /get/{key}`, `POST /set/{key}`, bearer token auth).
///
/// Values are stored as JSON strings and decoded on read, which matches what
/// the hosted KV client libraries do.
pub struct RestKvStore {
    client: Client,
    base_url: Url,
    token: String,
}

/// Every response is wrapped as `{"result": ...}` or `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl RestKvStore {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Backend(format!("invalid kv url `{base_url}`: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Backend(format!("kv url `{base_url}` cannot be a base")));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;
        Ok(Self { client, base_url, token: token.to_string() })
    }

    fn command_url(&self, command: &str, key: &str) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Backend(format!("kv url `{}` cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend([command, key]);
        Ok(url)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Option<Value>, StoreError> {
        let resp = req
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| StoreError::Http(e.to_string()))?;

        let envelope = serde_json::from_str::<Envelope>(&body);
        if !status.is_success() {
            let msg = match envelope {
                Ok(Envelope { error: Some(err), .. }) => err,
                _ => body,
            };
            warn!(%status, error = %msg, "kv request rejected");
            return Err(StoreError::Backend(format!("{status}: {msg}")));
        }

        let envelope = envelope.map_err(|e| StoreError::Serialization(format!("kv response: {e}")))?;
        if let Some(err) = envelope.error {
            return Err(StoreError::Backend(err));
        }
        Ok(envelope.result)
    }
}

#[async_trait]
impl KvStore for RestKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let url = self.command_url("get", key)?;
        debug!(%url, "kv get");
        match self.send(self.client.get(url)).await? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(raw)) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("value at `{key}`: {e}"))),
            // some deployments return already-decoded JSON
            Some(other) => Ok(Some(other)),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let url = self.command_url("set", key)?;
        let body = serde_json::to_string(&value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        debug!(%url, bytes = body.len(), "kv set");
        self.send(self.client.post(url).body(body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashMap, net::SocketAddr, sync::Arc};

    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use tokio::{net::TcpListener, sync::Mutex};

    const TOKEN: &str = "test-token";

    type Db = Arc<Mutex<HashMap<String, String>>>;

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {TOKEN}"))
            .unwrap_or(false)
    }

    async fn mock_get(State(db): State<Db>, headers: HeaderMap, Path(key): Path<String>) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"})));
        }
        let map = db.lock().await;
        (StatusCode::OK, Json(json!({"result": map.get(&key)})))
    }

    async fn mock_set(
        State(db): State<Db>,
        headers: HeaderMap,
        Path(key): Path<String>,
        body: String,
    ) -> (StatusCode, Json<Value>) {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"})));
        }
        db.lock().await.insert(key, body);
        (StatusCode::OK, Json(json!({"result": "OK"})))
    }

    /// Spawn a minimal stand-in for the hosted KV REST API on an ephemeral port.
    async fn spawn_mock() -> anyhow::Result<(String, Db)> {
        let db: Db = Arc::default();
        let app = Router::new()
            .route("/get/:key", get(mock_get))
            .route("/set/:key", post(mock_set))
            .with_state(db.clone());
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
        let addr: SocketAddr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await { eprintln!("mock kv error: {}", e); }
        });
        Ok((format!("http://{}:{}", addr.ip(), addr.port()), db))
    }

    #[tokio::test]
    async fn get_missing_key_is_none() -> anyhow::Result<()> {
        let (url, _db) = spawn_mock().await?;
        let store = RestKvStore::new(&url, TOKEN, Duration::from_secs(5))?;
        assert_eq!(store.get("fmaa-enterprise-status").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn set_stores_json_string_and_get_decodes_it() -> anyhow::Result<()> {
        let (url, db) = spawn_mock().await?;
        let store = RestKvStore::new(&format!("{url}/"), TOKEN, Duration::from_secs(5))?;

        let value = json!({"last_updated": null, "nested": {"runs": 3}});
        store.set("status", value.clone()).await?;

        let raw = db.lock().await.get("status").cloned().expect("stored");
        assert_eq!(serde_json::from_str::<Value>(&raw)?, value);
        assert_eq!(store.get("status").await?, Some(value));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_token_surfaces_backend_error() -> anyhow::Result<()> {
        let (url, _db) = spawn_mock().await?;
        let store = RestKvStore::new(&url, "wrong", Duration::from_secs(5))?;

        let err = store.get("status").await.unwrap_err();
        match err {
            StoreError::Backend(msg) => assert!(msg.contains("Unauthorized"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.set("status", json!(1)).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_stored_value_is_serialization_error() -> anyhow::Result<()> {
        let (url, db) = spawn_mock().await?;
        db.lock().await.insert("status".into(), "{broken".into());
        let store = RestKvStore::new(&url, TOKEN, Duration::from_secs(5))?;
        assert!(matches!(store.get("status").await, Err(StoreError::Serialization(_))));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_host_is_http_error() -> anyhow::Result<()> {
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        drop(listener);
        let store = RestKvStore::new(&format!("http://{addr}"), TOKEN, Duration::from_secs(2))?;
        assert!(matches!(store.get("status").await, Err(StoreError::Http(_))));
        Ok(())
    }

    #[test]
    fn command_url_keeps_base_path_and_encodes_key() -> anyhow::Result<()> {
        let store = RestKvStore::new("https://kv.example.com/v1/", TOKEN, Duration::from_secs(1))?;
        let url = store.command_url("get", "a key/with slash")?;
        assert_eq!(url.as_str(), "https://kv.example.com/v1/get/a%20key%2Fwith%20slash");
        Ok(())
    }
}
