// # Provider Adapter Trait
//
// Defines the interface every external inventory source implements.
//
// ## Implementations
//
// - UniFi-style controller: `netdoc-provider-unifi` crate
// - RouterOS-style router: `netdoc-provider-mikrotik` crate
//
// ## Usage
//
// ```rust,ignore
// use netdoc_core::ProviderAdapter;
//
// let adapter: Arc<dyn ProviderAdapter> = /* adapter implementation */;
// let greeting = adapter.test_connection(&config).await?;
// let snapshot = adapter.fetch_snapshot(&config).await?;
// ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{ConfigField, ProviderConfig};
use crate::model::{ProviderId, Snapshot};

/// Transport rules an adapter imposes on its connection config
///
/// Checked by the [`ConnectionValidator`] after the adapter accepts a
/// connection test.
///
/// [`ConnectionValidator`]: crate::validator::ConnectionValidator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportPolicy {
    /// Plain-text connections are refused
    pub require_tls: bool,
    /// Port a TLS connection must use
    pub tls_port: Option<u16>,
    /// Port a plain-text connection must use
    pub plain_port: Option<u16>,
}

impl TransportPolicy {
    /// No transport requirements
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Refuse plain-text connections
    pub fn tls_only() -> Self {
        Self {
            require_tls: true,
            ..Self::default()
        }
    }

    /// Fixed ports per security mode
    pub fn ports(plain_port: u16, tls_port: u16) -> Self {
        Self {
            require_tls: false,
            tls_port: Some(tls_port),
            plain_port: Some(plain_port),
        }
    }
}

/// Fields every adapter needs unless it says otherwise
pub const DEFAULT_REQUIRED_FIELDS: &[ConfigField] = &[
    ConfigField::Endpoint,
    ConfigField::Username,
    ConfigField::Password,
];

/// Trait for external inventory sources
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Contract
///
/// - `test_connection` and `fetch_snapshot` are read-only and must return
///   within the config's time budget, failing with [`Error::Timeout`]
///   otherwise.
/// - `fetch_snapshot` returns a complete snapshot or fails; never a partial one.
/// - Every record in a snapshot is stamped with [`provider_id`](Self::provider_id).
/// - Adapters never touch the entity store; merging is owned by the
///   `ReconciliationEngine`.
///
/// [`Error::Timeout`]: crate::Error::Timeout
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The provider id this adapter stamps on its records
    fn provider_id(&self) -> &ProviderId;

    /// Adapter kind (e.g. "unifi"), for logging
    fn kind(&self) -> &'static str;

    /// Transport rules for this provider kind
    fn transport_policy(&self) -> TransportPolicy {
        TransportPolicy::permissive()
    }

    /// Connection fields that must be non-blank
    fn required_fields(&self) -> &'static [ConfigField] {
        DEFAULT_REQUIRED_FIELDS
    }

    /// Try to reach and authenticate against the provider
    ///
    /// # Returns
    ///
    /// - `Ok(message)`: connection established, with a human-readable greeting
    /// - `Err(Error)`: classified failure (auth, unreachable, timeout, ...)
    async fn test_connection(&self, config: &ProviderConfig) -> Result<String, crate::Error>;

    /// Pull the provider's full inventory
    ///
    /// Fails with a descriptive error if connectivity is not established.
    async fn fetch_snapshot(&self, config: &ProviderConfig) -> Result<Snapshot, crate::Error>;
}

/// Helper trait for constructing adapters from host settings
pub trait ProviderAdapterFactory: Send + Sync {
    /// Create an adapter for `provider_id`
    ///
    /// # Parameters
    ///
    /// - `provider_id`: id the adapter will stamp on its records
    /// - `options`: adapter-specific options from [`ProviderSettings::options`]
    ///
    /// [`ProviderSettings::options`]: crate::config::ProviderSettings::options
    fn create(
        &self,
        provider_id: &ProviderId,
        options: &serde_json::Value,
    ) -> Result<Arc<dyn ProviderAdapter>, crate::Error>;
}
