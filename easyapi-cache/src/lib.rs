//! Content-addressed result cache.
//!
//! Results are keyed by `(algorithm id, signature)` where the signature is a
//! hash of the canonical JSON form of the task's inputs: keys ordered
//! lexicographically, the reserved `resources` key excluded. The hash is for
//! keying only, not a security claim.
//!
//! Backends implement [`CacheStore`]; the default is an in-memory map, and a
//! MongoDB store is available behind the `mongodb` feature.

mod memory;
#[cfg(feature = "mongodb")]
mod mongo;

pub use memory::MemoryStore;
#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use md5::Md5;
use serde::Deserialize;
use serde_json::Value;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha512};

/// The key reserved for a lane's resource map; never part of a signature.
pub const RESOURCES_KEY: &str = "resources";

/// Hash algorithm used to derive cache signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashMethod {
    #[default]
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha512,
}

impl HashMethod {
    pub fn digest(&self, data: &[u8]) -> String {
        match self {
            HashMethod::Md5 => hex::encode(Md5::digest(data)),
            HashMethod::Sha1 => hex::encode(Sha1::digest(data)),
            HashMethod::Sha224 => hex::encode(Sha224::digest(data)),
            HashMethod::Sha256 => hex::encode(Sha256::digest(data)),
            HashMethod::Sha512 => hex::encode(Sha512::digest(data)),
        }
    }
}

/// Compute the signature of an input map: canonical JSON (lexicographic key
/// order, `resources` dropped) hashed with `method`.
pub fn signature(method: HashMethod, inputs: &serde_json::Map<String, Value>) -> String {
    let ordered: BTreeMap<&String, &Value> = inputs
        .iter()
        .filter(|(key, _)| key.as_str() != RESOURCES_KEY)
        .collect();
    let canonical = serde_json::to_string(&ordered).unwrap_or_default();
    method.digest(canonical.as_bytes())
}

/// Pluggable cache backend.
///
/// A collection corresponds to one algorithm id; within it, values are keyed
/// by input signature.
pub trait CacheStore: Send + Sync + 'static {
    fn fetch<'a>(
        &'a self,
        collection: &'a str,
        signature: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Value>> + Send + 'a>>;

    fn record<'a>(
        &'a self,
        collection: &'a str,
        signature: &'a str,
        value: Value,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// The cache facade used by the task runner: signature computation plus
/// fetch/record against the configured store.
pub struct CachePool {
    store: Arc<dyn CacheStore>,
    hash: HashMethod,
}

impl CachePool {
    pub fn new(store: Arc<dyn CacheStore>, hash: HashMethod) -> Self {
        CachePool { store, hash }
    }

    /// An in-memory pool with the default hash, handy for tests and the
    /// default configuration.
    pub fn in_memory() -> Self {
        CachePool::new(Arc::new(MemoryStore::new()), HashMethod::default())
    }

    pub fn signature(&self, inputs: &serde_json::Map<String, Value>) -> String {
        signature(self.hash, inputs)
    }

    pub async fn fetch(
        &self,
        algorithm_id: &str,
        inputs: &serde_json::Map<String, Value>,
    ) -> Option<Value> {
        let sig = self.signature(inputs);
        self.store.fetch(algorithm_id, &sig).await
    }

    pub async fn record(
        &self,
        algorithm_id: &str,
        inputs: &serde_json::Map<String, Value>,
        value: Value,
    ) {
        let sig = self.signature(inputs);
        self.store.record(algorithm_id, &sig, value).await;
    }
}
