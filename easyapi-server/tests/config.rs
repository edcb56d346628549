use std::path::Path;

use easyapi_cache::HashMethod;
use easyapi_server::config::{AuthenticatorConfig, CacheConfig, ConfigError, ServerConfig};

#[test]
fn full_config_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "server_name": "protein-server",
            "listen": "127.0.0.1:9000",
            "modules": ["arith", "proteins"],
            "authenticator": {"type": "json", "file": "credentials.json"},
            "iolib": {"file": "iolib.json"},
            "task_queue": {
                "layouts": [{"cpu": 1, "cuda": 0}, {"cpu": 7, "cuda": 0}],
                "timeout_secs": 600
            },
            "cache": {"type": "mongodb", "host": "mongodb://localhost", "database": "easyapi", "hash": "sha256"}
        }"#,
    )
    .unwrap();

    let config = ServerConfig::from_path(&path).unwrap();
    assert_eq!(config.server_name, "protein-server");
    assert_eq!(config.listen, "127.0.0.1:9000");
    assert_eq!(config.modules, vec!["arith", "proteins"]);
    assert!(matches!(
        config.authenticator,
        AuthenticatorConfig::Json { .. }
    ));
    assert_eq!(
        config.iolib.as_ref().unwrap().file,
        Path::new("iolib.json")
    );
    assert_eq!(config.task_queue.layouts.len(), 2);
    assert_eq!(config.task_queue.layouts[1].get("cpu"), Some(&7));
    assert_eq!(config.task_queue.timeout_secs, Some(600));
    match config.cache {
        CacheConfig::Mongodb { host, hash, .. } => {
            assert_eq!(host, "mongodb://localhost");
            assert_eq!(hash, HashMethod::Sha256);
        }
        other => panic!("expected a mongodb cache, got {other:?}"),
    }
}

#[test]
fn every_key_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{}").unwrap();

    let config = ServerConfig::from_path(&path).unwrap();
    assert_eq!(config.server_name, "EasyAPI");
    assert_eq!(config.modules, vec!["arith"]);
    assert!(config.iolib.is_none());
    assert!(config.task_queue.layouts.is_empty());
    assert!(matches!(
        config.authenticator,
        AuthenticatorConfig::Memory { .. }
    ));
    assert!(matches!(config.cache, CacheConfig::Memory { hash } if hash == HashMethod::Md5));
}

#[test]
fn missing_and_malformed_files_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ServerConfig::from_path(&dir.path().join("absent.json")),
        Err(ConfigError::Io(_))
    ));

    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ nope").unwrap();
    assert!(matches!(
        ServerConfig::from_path(&path),
        Err(ConfigError::Parse(_))
    ));
}
