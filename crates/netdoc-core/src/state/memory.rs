// # Memory Document Store
//
// In-memory implementation of DocumentStore.
//
// ## Purpose
//
// Keeps the document for the lifetime of the process only. Useful for
// tests and for daemons that re-sync everything on start.
//
// ## Crash Behavior
//
// - Manual records are lost on restart
// - Provider partitions come back on the next sync

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::document_store::{DocumentStore, InventoryDocument};

/// In-memory document store
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<RwLock<Option<InventoryDocument>>>,
}

impl MemoryDocumentStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `document`
    pub fn with_document(document: InventoryDocument) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(document))),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn load(&self) -> Result<Option<InventoryDocument>, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, document: &InventoryDocument) -> Result<(), Error> {
        *self.inner.write().await = Some(document.clone());
        Ok(())
    }
}
