//! The server context: every shared component, assembled once at startup and
//! threaded into the handlers as axum state.

use std::sync::Arc;
use std::time::Duration;

use easyapi_cache::{CachePool, CacheStore, MemoryStore};
#[cfg(feature = "mongodb")]
use easyapi_cache::MongoStore;
use easyapi_core::{AlgorithmRegistry, IoTypeRegistry, TaskQueue, TaskRunner};
use easyapi_security::{AuthError, Authenticator};

use crate::config::{AuthenticatorConfig, CacheConfig, ServerConfig};
use crate::modules;

#[derive(Debug)]
pub enum BootError {
    Auth(AuthError),
    Iolib(String),
    Cache(String),
}

impl std::fmt::Display for BootError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootError::Auth(e) => write!(f, "authenticator: {e}"),
            BootError::Iolib(msg) => write!(f, "IO library: {msg}"),
            BootError::Cache(msg) => write!(f, "cache backend: {msg}"),
        }
    }
}

impl std::error::Error for BootError {}

#[derive(Clone)]
pub struct ServerContext {
    pub server_name: String,
    pub auth: Arc<Authenticator>,
    pub iotypes: Arc<IoTypeRegistry>,
    pub algorithms: Arc<AlgorithmRegistry>,
    pub runner: Arc<TaskRunner>,
}

impl ServerContext {
    pub async fn from_config(config: &ServerConfig) -> Result<Self, BootError> {
        let auth = match &config.authenticator {
            AuthenticatorConfig::Memory { credentials } => {
                Authenticator::in_memory(credentials.clone())
            }
            AuthenticatorConfig::Json { file } => {
                Authenticator::from_file(file.clone()).map_err(BootError::Auth)?
            }
        };

        let iotypes = Arc::new(IoTypeRegistry::new());
        if let Some(iolib) = &config.iolib {
            let text = std::fs::read_to_string(&iolib.file)
                .map_err(|e| BootError::Iolib(e.to_string()))?;
            let count = iotypes
                .load_str(&text)
                .map_err(|e| BootError::Iolib(e.to_string()))?;
            tracing::info!(count, file = %iolib.file.display(), "IO library loaded");
        }

        let algorithms = Arc::new(AlgorithmRegistry::new());
        modules::register(&config.modules, &algorithms, &iotypes);

        let (store, hash): (Arc<dyn CacheStore>, _) = match &config.cache {
            CacheConfig::Memory { hash } => (Arc::new(MemoryStore::new()), *hash),
            #[cfg(feature = "mongodb")]
            CacheConfig::Mongodb {
                host,
                database,
                hash,
            } => (
                Arc::new(
                    MongoStore::connect(host, database)
                        .await
                        .map_err(|e| BootError::Cache(e.to_string()))?,
                ),
                *hash,
            ),
            #[cfg(not(feature = "mongodb"))]
            CacheConfig::Mongodb { .. } => {
                return Err(BootError::Cache(
                    "server was built without the mongodb feature".to_string(),
                ))
            }
        };
        let cache = Arc::new(CachePool::new(store, hash));

        let queue = Arc::new(TaskQueue::new(config.task_queue.layouts.clone()));
        let runner = Arc::new(
            TaskRunner::new(queue, algorithms.clone(), iotypes.clone(), cache)
                .with_deadline(config.task_queue.timeout_secs.map(Duration::from_secs)),
        );

        Ok(ServerContext {
            server_name: config.server_name.clone(),
            auth: Arc::new(auth),
            iotypes,
            algorithms,
            runner,
        })
    }
}
