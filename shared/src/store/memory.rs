use super::DocumentStore;
use crate::error::{ErrorCode, VendorError};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Operations of [`MemoryStore`] that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Set,
    Query,
}

#[derive(Debug, Default)]
struct Inner {
    documents: BTreeMap<(String, String), Value>,
    faults: HashMap<StoreOp, VendorError>,
    queries: usize,
}

/// In-memory document store for tests and local runs.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_fault(&self, op: StoreOp) -> Result<(), VendorError> {
        match self.inner().faults.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Make the next call of `op` fail with `err`.
    pub fn fail_next(&self, op: StoreOp, err: VendorError) {
        self.inner().faults.insert(op, err);
    }

    /// Number of equality queries served so far.
    pub fn query_count(&self) -> usize {
        self.inner().queries
    }

    pub fn len(&self) -> usize {
        self.inner().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, VendorError> {
        self.take_fault(StoreOp::Get)?;
        let key = (collection.to_string(), id.to_string());
        Ok(self.inner().documents.get(&key).cloned())
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), VendorError> {
        self.take_fault(StoreOp::Set)?;
        if !document.is_object() {
            return Err(VendorError::new(
                ErrorCode::InvalidArgument,
                "Document must be a JSON object",
            ));
        }
        self.inner()
            .documents
            .insert((collection.to_string(), id.to_string()), document);
        Ok(())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<(String, Value)>, VendorError> {
        self.take_fault(StoreOp::Query)?;
        let mut inner = self.inner();
        inner.queries += 1;
        Ok(inner
            .documents
            .iter()
            .filter(|((doc_collection, _), document)| {
                doc_collection == collection
                    && document.get(field).and_then(Value::as_str) == Some(value)
            })
            .map(|((_, id), document)| (id.clone(), document.clone()))
            .collect())
    }
}
