use std::future::Future;
use std::pin::Pin;

use mongodb::bson::{doc, to_bson, Document};
use mongodb::{Client, Database};
use serde_json::Value;

use crate::CacheStore;

/// MongoDB-backed cache store. One collection per algorithm id; documents
/// are `{signature, value}` pairs.
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(host: &str, database: &str) -> Result<Self, mongodb::error::Error> {
        let client = Client::with_uri_str(host).await?;
        Ok(MongoStore {
            db: client.database(database),
        })
    }
}

impl CacheStore for MongoStore {
    fn fetch<'a>(
        &'a self,
        collection: &'a str,
        signature: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Value>> + Send + 'a>> {
        Box::pin(async move {
            let coll = self.db.collection::<Document>(collection);
            match coll.find_one(doc! { "signature": signature }).await {
                Ok(Some(document)) => document.get("value").cloned().map(Value::from),
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(collection, error = %e, "cache fetch failed");
                    None
                }
            }
        })
    }

    fn record<'a>(
        &'a self,
        collection: &'a str,
        signature: &'a str,
        value: Value,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let bson = match to_bson(&value) {
                Ok(bson) => bson,
                Err(e) => {
                    tracing::warn!(collection, error = %e, "cache value not representable as BSON");
                    return;
                }
            };
            let coll = self.db.collection::<Document>(collection);
            let result = coll
                .update_one(
                    doc! { "signature": signature },
                    doc! { "$set": { "value": bson } },
                )
                .upsert(true)
                .await;
            if let Err(e) = result {
                tracing::warn!(collection, error = %e, "cache record failed");
            }
        })
    }
}
