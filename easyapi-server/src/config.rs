//! Server configuration.
//!
//! A single JSON file selected by the `easyapi_config` environment variable
//! (default `config.json`). Every key has a default, and a missing file
//! yields the default configuration with a warning rather than a failed
//! start.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use easyapi_cache::HashMethod;
use easyapi_core::ResourceVector;
use easyapi_security::Credential;
use serde::Deserialize;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "easyapi_config";

const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "config read error: {msg}"),
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server_name: String,
    /// Bind address, e.g. `0.0.0.0:8000`.
    pub listen: String,
    /// Names of built-in algorithm modules to register.
    pub modules: Vec<String>,
    pub authenticator: AuthenticatorConfig,
    pub iolib: Option<IolibConfig>,
    pub task_queue: TaskQueueConfig,
    pub cache: CacheConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            server_name: "EasyAPI".to_string(),
            listen: "0.0.0.0:8000".to_string(),
            modules: vec!["arith".to_string()],
            authenticator: AuthenticatorConfig::default(),
            iolib: None,
            task_queue: TaskQueueConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from the path named by `easyapi_config`, falling back to the
    /// defaults when the file is absent or unreadable.
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        match Self::from_path(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "using default configuration");
                Self::default()
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthenticatorConfig {
    /// Credentials held in process memory, seeded from the config itself.
    Memory {
        #[serde(default)]
        credentials: HashMap<String, Credential>,
    },
    /// Credentials in a JSON file, re-read before each check.
    Json { file: PathBuf },
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        AuthenticatorConfig::Memory {
            credentials: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IolibConfig {
    /// JSON file of `id -> schema` IOType definitions preloaded at startup.
    pub file: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskQueueConfig {
    /// Lane resource vectors. Empty means one lane with every host CPU.
    pub layouts: Vec<ResourceVector>,
    /// Optional per-execution deadline in seconds.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CacheConfig {
    Memory {
        #[serde(default)]
        hash: HashMethod,
    },
    Mongodb {
        host: String,
        database: String,
        #[serde(default)]
        hash: HashMethod,
    },
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::Memory {
            hash: HashMethod::default(),
        }
    }
}
