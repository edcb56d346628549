use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use dashmap::DashMap;
use serde_json::Value;

use crate::CacheStore;

/// In-memory cache store: one map per algorithm id, keyed by signature.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn fetch<'a>(
        &'a self,
        collection: &'a str,
        signature: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Value>> + Send + 'a>> {
        Box::pin(async move {
            self.collections
                .get(collection)
                .and_then(|entries| entries.get(signature).cloned())
        })
    }

    fn record<'a>(
        &'a self,
        collection: &'a str,
        signature: &'a str,
        value: Value,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.collections
                .entry(collection.to_string())
                .or_default()
                .insert(signature.to_string(), value);
        })
    }
}
