use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

pub const DEFAULT_STATUS_KEY: &str = "fmaa-enterprise-status";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

/// Which `KvStore` implementation backs the status document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
    Rest,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "rest" => Ok(Self::Rest),
            other => Err(anyhow!("unknown store backend `{other}` (expected memory, file or rest)")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_status_key")]
    pub status_key: String,
    #[serde(default = "default_file_path")]
    pub file_path: String,
    #[serde(default)]
    pub rest_url: String,
    #[serde(default)]
    pub rest_token: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_status_key() -> String { DEFAULT_STATUS_KEY.to_string() }
fn default_file_path() -> String { "data/status.json".to_string() }
fn default_timeout() -> u64 { 10 }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            status_key: default_status_key(),
            file_path: default_file_path(),
            rest_url: String::new(),
            rest_token: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

/// `CONFIG_PATH`, defaulting to `config.toml`.
pub fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_default() -> Result<AppConfig> {
    load_from_file(&config_path())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
}

impl AppConfig {
    /// Config file if present, otherwise environment variables; then validated.
    pub fn load_and_validate() -> Result<Self> {
        Self::load_and_validate_from(&config_path())
    }

    /// Only a missing file falls back to the environment; unreadable or
    /// unparseable files are errors.
    pub fn load_and_validate_from(path: &str) -> Result<Self> {
        let mut cfg = match load_from_file(path) {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => Self::from_env()?,
            Err(e) => return Err(e.context(format!("failed to load config file {path}"))),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = AppConfig::default();
        if let Ok(host) = std::env::var("SERVER_HOST") {
            cfg.server.host = host;
        }
        if let Ok(port) = std::env::var("SERVER_PORT") {
            cfg.server.port = port.parse().map_err(|_| anyhow!("SERVER_PORT is not a valid port: {port}"))?;
        }
        cfg.server.worker_threads = std::env::var("TOKIO_WORKER_THREADS").ok().and_then(|v| v.parse().ok());
        if let Ok(backend) = std::env::var("STATUS_BACKEND") {
            cfg.store.backend = backend.parse()?;
        }
        if let Ok(key) = std::env::var("STATUS_KEY") {
            cfg.store.status_key = key;
        }
        if let Ok(path) = std::env::var("STATUS_FILE") {
            cfg.store.file_path = path;
        }
        if let Ok(secs) = std::env::var("KV_TIMEOUT_SECS") {
            cfg.store.timeout_secs = secs.parse().map_err(|_| anyhow!("KV_TIMEOUT_SECS must be an integer: {secs}"))?;
        }
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        // REST 凭据允许只放在环境变量里
        self.store.normalize_from_env();
        self.store.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StoreConfig {
    pub fn normalize_from_env(&mut self) {
        if self.rest_url.trim().is_empty() {
            if let Ok(url) = std::env::var("KV_REST_API_URL") {
                self.rest_url = url;
            }
        }
        if self.rest_token.trim().is_empty() {
            if let Ok(token) = std::env::var("KV_REST_API_TOKEN") {
                self.rest_token = token;
            }
        }
        self.rest_url = self.rest_url.trim().trim_end_matches('/').to_string();
    }

    pub fn validate(&self) -> Result<()> {
        if self.status_key.trim().is_empty() {
            return Err(anyhow!("store.status_key must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("store.timeout_secs must be a positive number of seconds"));
        }
        match self.backend {
            StoreBackend::Memory => {}
            StoreBackend::File => {
                if self.file_path.trim().is_empty() {
                    return Err(anyhow!("store.file_path is required for the file backend"));
                }
            }
            StoreBackend::Rest => {
                if self.rest_url.is_empty() {
                    return Err(anyhow!("store.rest_url is empty; set it in config.toml or KV_REST_API_URL"));
                }
                let lower = self.rest_url.to_lowercase();
                if !(lower.starts_with("https://") || lower.starts_with("http://")) {
                    return Err(anyhow!("store.rest_url must start with http:// or https://"));
                }
                if self.rest_token.trim().is_empty() {
                    return Err(anyhow!("store.rest_token is empty; set it in config.toml or KV_REST_API_TOKEN"));
                }
            }
        }
        Ok(())
    }
}
