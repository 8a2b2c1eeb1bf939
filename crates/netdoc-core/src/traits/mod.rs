//! Core traits for netdoc
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ProviderAdapter`]: Test connectivity to and fetch snapshots from an external source
//! - [`DocumentStore`]: Persist the host's inventory document

pub mod adapter;
pub mod document_store;

pub use adapter::{ProviderAdapter, ProviderAdapterFactory, TransportPolicy, DEFAULT_REQUIRED_FIELDS};
pub use document_store::{DocumentStore, InventoryDocument, DOCUMENT_VERSION};
