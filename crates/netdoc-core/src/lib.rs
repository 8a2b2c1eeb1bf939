// # netdoc-core
//
// Core library for the netdoc network documentation system.
//
// ## Architecture Overview
//
// This library holds the inventory and the multi-source sync machinery:
// - **EntityStore**: Equipment and address records, partitioned by source
// - **ProviderAdapter**: Trait for external controllers (connection test + snapshot)
// - **ConnectionValidator**: Runs connection tests and applies transport policy
// - **ReconciliationEngine**: Validate → fetch → partition replace for one provider
// - **SyncCoordinator**: Per-provider run state machine and mutual exclusion
// - **ProviderRegistry**: Plugin-based registry of adapter factories
// - **DocumentStore**: Trait for persisting the host document
//
// ## Design Principles
//
// 1. **Partition by source**: a sync only ever replaces its own provider's records
// 2. **All-or-nothing merge**: a failed run leaves the store untouched
// 3. **Plugin-based**: providers are registered dynamically, no hard-coded if-else
// 4. **Library-first**: the daemon is a thin wrapper over this crate
// 5. **Idempotency**: re-syncing an unchanged upstream changes nothing

pub mod traits;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;
pub mod state;
pub mod model;
pub mod identity;
pub mod store;
pub mod validator;
pub mod coordinator;
pub mod schedule;
pub mod topology;

// Re-export core types for convenience
pub use traits::{DocumentStore, InventoryDocument, ProviderAdapter, ProviderAdapterFactory};
pub use engine::{ReconciliationEngine, SyncEvent, SyncReport};
pub use registry::ProviderRegistry;
pub use config::{EngineConfig, ProviderConfig, ProviderSettings, SyncInterval};
pub use error::{Error, ErrorKind, Result, SyncError};
pub use state::{FileDocumentStore, MemoryDocumentStore};
pub use model::{AddressEntry, Entities, Equipment, ProviderId, Snapshot, Source};
pub use store::EntityStore;
pub use validator::{ConnectionResult, ConnectionValidator};
pub use coordinator::{ProviderStatus, SyncCoordinator, SyncRunState};
pub use schedule::{AutoSync, AutoSyncHandle, ScheduledProvider};
pub use topology::TopologyView;
