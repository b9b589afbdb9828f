use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Top-level API configuration shared across services.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfigInner {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub loader: LoaderConfig,
    pub subscriptions: SubscriptionConfig,
    pub pagination: PaginationConfig,
    pub logging: LoggingConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(flatten, default)]
    inner: Arc<ApiConfigInner>,
}

impl Deref for ApiConfig {
    type Target = ApiConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ApiConfig {
    fn deref_mut(&mut self) -> &mut ApiConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
}

/// Which storage engine backs the repositories.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Memory,
    Surreal,
}

/// Storage configuration. `url`, `namespace`, `database` and `credentials`
/// only apply to the `surreal` backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub credentials: Option<DatabaseCredentials>,
}

/// `SurrealDB` root credentials (optional for unauthenticated engines like mem://).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
}

/// Coalescing window of the request-scoped comment loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Dispatch as soon as the window holds this many distinct keys.
    pub max_batch: usize,
    /// Dispatch this many milliseconds after the window opened.
    pub wait_ms: u64,
}

impl LoaderConfig {
    #[must_use]
    pub const fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Per-subscriber channel capacity. Notifications beyond it are dropped.
    pub buffer: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_first: u32,
    pub max_first: u32,
}

/// Logger settings consumed by `parley-logger`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Extra `EnvFilter` directives, e.g. `parley_loader=debug`.
    pub filter: Option<String>,
    /// Directory for rolling log files; console only when unset.
    pub path: Option<PathBuf>,
    pub json: bool,
    pub max_files: usize,
}

// --- Default ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 4583 }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            url: "mem://".to_owned(),
            namespace: "parley".to_owned(),
            database: "core".to_owned(),
            credentials: None,
        }
    }
}

impl Default for DatabaseCredentials {
    fn default() -> Self {
        Self { username: "root".to_owned(), password: "root".to_owned() }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { max_batch: 100, wait_ms: 5 }
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self { buffer: 1 }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { default_first: 10, max_first: 100 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), filter: None, path: None, json: false, max_files: 10 }
    }
}
