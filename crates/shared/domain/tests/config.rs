use parley_domain::config::{
    ApiConfig, DatabaseConfig, LoaderConfig, PaginationConfig, ServerConfig, StorageBackend,
    SubscriptionConfig,
};
use serde_json::json;
use std::time::Duration;

#[test]
fn config_defaults_are_sane() {
    assert_eq!(ServerConfig::default().port, 4583);

    let db = DatabaseConfig::default();
    assert_eq!(db.backend, StorageBackend::Memory);
    assert_eq!(db.url, "mem://");
    assert_eq!(db.namespace, "parley");
    assert!(db.credentials.is_none());

    let loader = LoaderConfig::default();
    assert_eq!(loader.max_batch, 100);
    assert_eq!(loader.wait(), Duration::from_millis(5));

    assert_eq!(SubscriptionConfig::default().buffer, 1);
    assert_eq!(PaginationConfig::default().default_first, 10);
    assert_eq!(PaginationConfig::default().max_first, 100);
}

#[test]
fn api_config_deserializes() {
    let raw = json!({
        "server": { "address": "::", "port": 8080 },
        "database": { "backend": "surreal", "url": "ws://db:8000", "credentials": null },
        "loader": { "max_batch": 16, "wait_ms": 2 },
        "logging": { "level": "debug", "json": true }
    });

    let cfg: ApiConfig = serde_json::from_value(raw).expect("config deserialize");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.database.backend, StorageBackend::Surreal);
    assert_eq!(cfg.database.namespace, "parley");
    assert_eq!(cfg.loader.max_batch, 16);
    assert_eq!(cfg.subscriptions.buffer, 1);
    assert_eq!(cfg.logging.level, "debug");
    assert!(cfg.logging.json);
    assert_eq!(cfg.logging.max_files, 10);
}

#[test]
fn api_config_clones_on_write() {
    let base = ApiConfig::default();
    let mut tuned = base.clone();
    tuned.pagination.max_first = 5;

    assert_eq!(base.pagination.max_first, 100);
    assert_eq!(tuned.pagination.max_first, 5);
}
