// # Document Store Trait
//
// Defines the interface for persisting the host's inventory document.
//
// ## Purpose
//
// The core keeps the inventory in memory. A host that wants it to survive
// restarts serializes one JSON document holding every record plus the
// per-provider settings keyed by provider id.
//
// ## Implementations
//
// - File-based: JSON file with atomic writes and backup recovery
// - Memory: for tests and ephemeral deployments

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ProviderSettings;
use crate::model::{AddressEntry, Entities, Equipment, PortMapping, ProviderId, WanLink};

/// Document format version
pub const DOCUMENT_VERSION: &str = "1.0";

/// Everything the host persists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    #[serde(default)]
    pub addresses: Vec<AddressEntry>,
    #[serde(default)]
    pub port_mappings: Vec<PortMapping>,
    #[serde(default)]
    pub wan_links: Vec<WanLink>,
    #[serde(default)]
    pub providers: BTreeMap<ProviderId, ProviderSettings>,
}

impl Default for InventoryDocument {
    fn default() -> Self {
        Self {
            version: default_version(),
            equipment: Vec::new(),
            addresses: Vec::new(),
            port_mappings: Vec::new(),
            wan_links: Vec::new(),
            providers: BTreeMap::new(),
        }
    }
}

impl InventoryDocument {
    /// The inventory records as store input
    pub fn entities(&self) -> Entities {
        Entities {
            equipment: self.equipment.clone(),
            addresses: self.addresses.clone(),
        }
    }

    /// Replace the inventory records, keeping everything else
    pub fn set_entities(&mut self, entities: Entities) {
        self.equipment = entities.equipment;
        self.addresses = entities.addresses;
    }
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

/// Trait for document store implementations
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load the stored document
    ///
    /// # Returns
    ///
    /// - `Ok(Some(doc))`: a document was stored
    /// - `Ok(None)`: nothing stored yet (or nothing recoverable)
    /// - `Err(Error)`: the store could not be read
    async fn load(&self) -> Result<Option<InventoryDocument>, crate::Error>;

    /// Persist `document`, replacing what was stored
    async fn save(&self, document: &InventoryDocument) -> Result<(), crate::Error>;
}
