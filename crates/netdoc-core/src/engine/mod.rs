//! Reconciliation engine
//!
//! The ReconciliationEngine is responsible for:
//! - Validating a provider connection before touching anything
//! - Fetching the provider's snapshot
//! - Replacing that provider's partition in the EntityStore
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │ ConnectionValidator │── ConnectionResult ──┐
//! └─────────────────────┘                      │
//!                                              ▼
//!                                  ┌──────────────────────┐
//!                                  │ ReconciliationEngine │
//!                                  └──────────────────────┘
//!                                              │
//!         ┌────────────────────────────────────┼──────────────────────┐
//!         │                                    │                      │
//!         ▼                                    ▼                      ▼
//! ┌─────────────────┐               ┌──────────────────┐      ┌─────────────┐
//! │ ProviderAdapter │               │   EntityStore    │      │   Events    │
//! │ (fetch)         │               │ (partition swap) │      │  (notify)   │
//! └─────────────────┘               └──────────────────┘      └─────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Validate connection; on failure return `SyncError`, store untouched
//! 2. Fetch snapshot; on failure return `SyncError`, store untouched
//! 3. Check every record carries the provider's own source tag
//! 4. Replace the provider's partition in one atomic swap
//! 5. Emit events for monitoring/logging
//!
//! Running `sync` twice against an unchanged upstream leaves the store
//! exactly as the first run did: the merge is a replace, not an accumulate.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, trace, warn};

use crate::config::{EngineConfig, ProviderConfig};
use crate::error::{ErrorKind, Result, SyncError};
use crate::model::ProviderId;
use crate::store::{EntityStore, MergeOutcome};
use crate::traits::ProviderAdapter;
use crate::validator::ConnectionValidator;

/// Result of a successful sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub provider: ProviderId,
    pub equipment_added: usize,
    pub addresses_added: usize,
    /// Stale equipment from an earlier run that is gone now
    pub equipment_dropped: usize,
    /// Stale addresses from an earlier run that are gone now
    pub addresses_dropped: usize,
}

impl SyncReport {
    fn new(provider: ProviderId, outcome: MergeOutcome) -> Self {
        Self {
            provider,
            equipment_added: outcome.equipment_added,
            addresses_added: outcome.addresses_added,
            equipment_dropped: outcome.equipment_dropped,
            addresses_dropped: outcome.addresses_dropped,
        }
    }

    /// One-line summary for run state
    pub fn summary(&self) -> String {
        format!(
            "Synchronized {} equipment and {} address records",
            self.equipment_added, self.addresses_added
        )
    }
}

/// Events emitted by the ReconciliationEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A run began
    RunStarted { provider: ProviderId },

    /// Connection test passed
    ConnectionVerified { provider: ProviderId, message: String },

    /// Connection test failed
    ConnectionRejected {
        provider: ProviderId,
        kind: ErrorKind,
        message: String,
    },

    /// Snapshot retrieved from the provider
    SnapshotFetched {
        provider: ProviderId,
        equipment: usize,
        addresses: usize,
    },

    /// Provider partition replaced in the store
    PartitionReplaced { report: SyncReport },

    /// Run ended without touching the store
    RunFailed { error: SyncError },
}

/// Sync orchestrator for a single provider run
///
/// Stateless apart from the shared [`EntityStore`] handle; one engine
/// serves every provider and may run several providers concurrently.
#[derive(Debug)]
pub struct ReconciliationEngine {
    store: EntityStore,
    validator: ConnectionValidator,
    event_tx: mpsc::Sender<SyncEvent>,
}

impl ReconciliationEngine {
    /// Create a new engine over `store`
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields sync events
    pub fn new(
        store: EntityStore,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            store,
            validator: ConnectionValidator::new(),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// The store this engine writes to
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Validate, fetch and merge one provider
    pub async fn sync(
        &self,
        adapter: &dyn ProviderAdapter,
        config: &ProviderConfig,
    ) -> std::result::Result<SyncReport, SyncError> {
        self.announce_start(adapter.provider_id());
        self.verify(adapter, config).await?;
        self.fetch_and_merge(adapter, config).await
    }

    /// Emit `RunStarted` for callers driving the steps themselves
    pub(crate) fn announce_start(&self, provider: &ProviderId) {
        debug!("Starting sync run for {}", provider);
        self.emit_event(SyncEvent::RunStarted {
            provider: provider.clone(),
        });
    }

    /// Step 1: connection validation
    ///
    /// Returns the adapter's greeting on success.
    pub async fn verify(
        &self,
        adapter: &dyn ProviderAdapter,
        config: &ProviderConfig,
    ) -> std::result::Result<String, SyncError> {
        let provider = adapter.provider_id().clone();

        match self.validator.validate(adapter, config).await {
            Err(e) => Err(self.fail(SyncError::from_error(provider, &e))),
            Ok(result) if result.success => {
                debug!("Connection to {} verified: {}", provider, result.message);
                self.emit_event(SyncEvent::ConnectionVerified {
                    provider,
                    message: result.message.clone(),
                });
                Ok(result.message)
            }
            Ok(result) => {
                let kind = result.failure.unwrap_or(ErrorKind::Other);
                self.emit_event(SyncEvent::ConnectionRejected {
                    provider: provider.clone(),
                    kind,
                    message: result.message.clone(),
                });
                Err(self.fail(SyncError::new(provider, kind, result.message)))
            }
        }
    }

    /// Steps 2-4: fetch, provenance check, partition replace
    ///
    /// All-or-nothing: any failure before the swap leaves the store as it was.
    /// Only reachable after [`verify`](Self::verify) has passed.
    pub(crate) async fn fetch_and_merge(
        &self,
        adapter: &dyn ProviderAdapter,
        config: &ProviderConfig,
    ) -> std::result::Result<SyncReport, SyncError> {
        let provider = adapter.provider_id().clone();

        let snapshot = match adapter.fetch_snapshot(config).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let kind = match e.kind() {
                    ErrorKind::Other => ErrorKind::Fetch,
                    kind => kind,
                };
                return Err(self.fail(SyncError::new(provider, kind, e.detail())));
            }
        };

        debug!(
            "Fetched {} equipment and {} addresses from {}",
            snapshot.equipment.len(),
            snapshot.addresses.len(),
            provider
        );
        self.emit_event(SyncEvent::SnapshotFetched {
            provider: provider.clone(),
            equipment: snapshot.equipment.len(),
            addresses: snapshot.addresses.len(),
        });

        if let Err(e) = snapshot.check_provenance(&provider) {
            error!("Adapter {} ({}) broke its contract: {}", provider, adapter.kind(), e);
            return Err(self.fail(SyncError::from_error(provider, &e)));
        }

        let outcome = self.store.replace_partition(&provider, snapshot).await;
        let report = SyncReport::new(provider, outcome);

        info!(
            "Synced {}: {} equipment, {} addresses ({} equipment, {} addresses dropped)",
            report.provider,
            report.equipment_added,
            report.addresses_added,
            report.equipment_dropped,
            report.addresses_dropped
        );
        self.emit_event(SyncEvent::PartitionReplaced {
            report: report.clone(),
        });

        Ok(report)
    }

    /// Log and announce a failed run
    fn fail(&self, error: SyncError) -> SyncError {
        warn!("Sync for {} failed ({}): {}", error.provider, error.kind, error.message);
        self.emit_event(SyncEvent::RunFailed {
            error: error.clone(),
        });
        error
    }

    /// Emit a sync event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                // Consumer is slower than the engine; drop rather than grow unbounded
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(TrySendError::Closed(_)) => {
                trace!("Event receiver dropped, event discarded");
            }
        }
    }
}
