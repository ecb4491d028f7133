//! Document store seam.
//!
//! Documents are JSON objects addressed by `(collection, id)`. Besides point
//! reads and writes, the store answers single-field equality queries, which is
//! all the site builder needs (e.g. every profile with `role == "client"`).

mod dynamo;
mod memory;

pub use dynamo::DynamoStore;
pub use memory::{MemoryStore, StoreOp};

use crate::error::{Error, Result, VendorError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

pub const USERS: &str = "users";
pub const SITES: &str = "sites";

pub trait DocumentStore {
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Value>, VendorError>>;

    /// Create or fully replace a document.
    fn set(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> impl Future<Output = Result<(), VendorError>>;

    /// Every document in `collection` whose top-level `field` equals `value`,
    /// as `(id, document)` pairs.
    fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> impl Future<Output = Result<Vec<(String, Value)>, VendorError>>;
}

/// Read a document and deserialize it.
pub async fn read<T, S>(store: &S, collection: &str, id: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: DocumentStore,
{
    match store.get(collection, id).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| Error::Malformed {
                collection: collection.to_string(),
                id: id.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Serialize a document and write it.
pub async fn write<T, S>(store: &S, collection: &str, id: &str, document: &T) -> Result<()>
where
    T: Serialize,
    S: DocumentStore,
{
    let value = serde_json::to_value(document).map_err(|source| Error::Malformed {
        collection: collection.to_string(),
        id: id.to_string(),
        source,
    })?;
    store.set(collection, id, value).await?;
    Ok(())
}
