//! Plugin-based adapter registry
//!
//! The registry maps provider kinds ("unifi", "mikrotik", ...) to factories,
//! so adding a provider needs no change to the engine or the coordinator.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use netdoc_core::registry::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! netdoc_provider_unifi::register(&registry);
//!
//! let adapter = registry.create_adapter(&provider_id, &settings)?;
//! coordinator.register(adapter)?;
//! ```
//!
//! ## Registration
//!
//! Provider crates register themselves during initialization:
//!
//! ```rust,ignore
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_factory("unifi", Box::new(UnifiFactory));
//! }
//! ```

use crate::config::ProviderSettings;
use crate::error::{Error, Result};
use crate::model::ProviderId;
use crate::traits::{ProviderAdapter, ProviderAdapterFactory};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Registry of adapter factories keyed by provider kind
///
/// ## Thread Safety
///
/// Interior mutability through `RwLock`: concurrent reads, exclusive writes.
/// Factories never run while the lock is held for writing, so a poisoned
/// lock still guards a consistent map and is recovered.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: RwLock<HashMap<String, Arc<dyn ProviderAdapterFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter factory
    ///
    /// # Parameters
    ///
    /// - `kind`: Provider kind (e.g., "unifi", "mikrotik")
    /// - `factory`: Factory object for creating adapter instances
    ///
    /// Registering a kind twice replaces the earlier factory.
    pub fn register_factory(&self, kind: impl Into<String>, factory: Box<dyn ProviderAdapterFactory>) {
        let kind = kind.into();
        debug!("Registering adapter factory for kind {}", kind);
        let mut factories = self.factories.write().unwrap_or_else(PoisonError::into_inner);
        factories.insert(kind, Arc::from(factory));
    }

    /// Create an adapter for `provider` from its settings
    ///
    /// # Parameters
    ///
    /// - `provider`: Identifier the adapter will stamp on its records
    /// - `settings`: Kind, connection config and kind-specific options
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn ProviderAdapter>)`: Created adapter
    /// - `Err(Error::Config)`: Kind is not registered or the options are invalid
    pub fn create_adapter(
        &self,
        provider: &ProviderId,
        settings: &ProviderSettings,
    ) -> Result<Arc<dyn ProviderAdapter>> {
        let factory = {
            let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
            factories
                .get(&settings.kind)
                .cloned()
                .ok_or_else(|| Error::config(format!("Unknown provider kind: {}", settings.kind)))?
        };

        factory.create(provider, &settings.options)
    }

    /// List all registered provider kinds, sorted
    pub fn list_kinds(&self) -> Vec<String> {
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        let mut kinds: Vec<String> = factories.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Check if a provider kind is registered
    pub fn has_kind(&self, kind: &str) -> bool {
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        factories.contains_key(kind)
    }
}
