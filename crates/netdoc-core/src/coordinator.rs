//! Sync coordinator
//!
//! Tracks per-provider run state and gates run requests.
//!
//! ## State machine
//!
//! ```text
//!            ┌──────── run start ────────┐
//!            │                           ▼
//!  Idle ─────┘      ┌──────────────── Testing ──── validation failed ──┐
//!                   │                    │                             │
//!  Succeeded ───────┤              validation ok                       ▼
//!  Failed ──────────┘                    ▼                          Failed
//!     (run start)                     Syncing ──── fetch/merge error ──┘
//!                                        │
//!                                        ▼
//!                                    Succeeded
//! ```
//!
//! At most one run per provider is in flight: a request while the provider
//! is `Testing` or `Syncing` is rejected with a `ConcurrentRun` error. Runs
//! for different providers share nothing but the store's partition swap and
//! proceed concurrently.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::engine::{ReconciliationEngine, SyncReport};
use crate::error::{Error, SyncError};
use crate::model::{Entities, ProviderId};
use crate::store::EntityStore;
use crate::traits::ProviderAdapter;

/// Run state of one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum SyncRunState {
    /// Registered, never run
    Idle,
    /// Connection test in progress
    Testing,
    /// Fetch and merge in progress
    Syncing,
    /// Last run completed
    Succeeded(String),
    /// Last run failed
    Failed(String),
}

impl SyncRunState {
    /// A run is in flight
    pub fn is_running(&self) -> bool {
        matches!(self, SyncRunState::Testing | SyncRunState::Syncing)
    }

    /// The last run has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncRunState::Succeeded(_) | SyncRunState::Failed(_))
    }

    /// Result message of the last finished run
    pub fn message(&self) -> Option<&str> {
        match self {
            SyncRunState::Succeeded(msg) | SyncRunState::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncRunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncRunState::Idle => write!(f, "idle"),
            SyncRunState::Testing => write!(f, "testing"),
            SyncRunState::Syncing => write!(f, "syncing"),
            SyncRunState::Succeeded(msg) => write!(f, "succeeded: {}", msg),
            SyncRunState::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

/// Everything the coordinator knows about one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub provider: ProviderId,
    pub kind: &'static str,
    pub state: SyncRunState,
    /// Report of the last successful run
    pub last_report: Option<SyncReport>,
    /// When the last run (of either outcome) finished
    pub last_finished: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
struct RunHistory {
    last_report: Option<SyncReport>,
    last_finished: Option<DateTime<Utc>>,
}

struct ProviderSlot {
    /// Only swapped while `state` is locked and not running
    adapter: watch::Sender<Arc<dyn ProviderAdapter>>,
    state: watch::Sender<SyncRunState>,
    history: watch::Sender<RunHistory>,
}

impl ProviderSlot {
    fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        let (adapter, _) = watch::channel(adapter);
        let (state, _) = watch::channel(SyncRunState::Idle);
        let (history, _) = watch::channel(RunHistory::default());
        Self {
            adapter,
            state,
            history,
        }
    }

    fn adapter(&self) -> Arc<dyn ProviderAdapter> {
        Arc::clone(&self.adapter.borrow())
    }

    /// Swap the adapter and reset to `Idle` unless a run is in flight
    fn replace_adapter(&self, adapter: Arc<dyn ProviderAdapter>) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_running() {
                return false;
            }
            self.adapter.send_replace(Arc::clone(&adapter));
            *state = SyncRunState::Idle;
            true
        })
    }
}

/// A claimed slot; marks the run failed if dropped mid-flight
///
/// Created by the claim itself, so a spawned run that is dropped before its
/// first poll (runtime shutdown, task abort) still leaves a terminal state.
struct RunGuard {
    slot: Arc<ProviderSlot>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.slot.state.send_if_modified(|state| {
            if state.is_running() {
                *state = SyncRunState::Failed("Sync run aborted".to_string());
                true
            } else {
                false
            }
        });
    }
}

struct CoordinatorInner {
    engine: ReconciliationEngine,
    slots: DashMap<ProviderId, Arc<ProviderSlot>>,
}

/// Per-provider run state machine over a shared engine
///
/// Cheap to clone; clones share providers and state.
///
/// ## Lifecycle
///
/// 1. Create with [`SyncCoordinator::new()`]
/// 2. [`register`](Self::register) one adapter per provider (state `Idle`)
/// 3. Trigger runs with [`request_sync`](Self::request_sync) (spawned) or
///    [`run_sync`](Self::run_sync) (awaited)
/// 4. Observe with [`state`](Self::state) / [`subscribe`](Self::subscribe)
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl SyncCoordinator {
    /// Create a coordinator driving `engine`
    pub fn new(engine: ReconciliationEngine) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                engine,
                slots: DashMap::new(),
            }),
        }
    }

    /// Register an adapter under its provider id
    ///
    /// The provider starts (or restarts) in `Idle`. Registering over an idle
    /// or finished provider replaces its adapter and keeps its history.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: registered
    /// - `Err(Error::ConcurrentRun)`: the provider has a run in flight
    pub fn register(&self, adapter: Arc<dyn ProviderAdapter>) -> Result<(), Error> {
        let provider = adapter.provider_id().clone();
        let kind = adapter.kind();

        match self.inner.slots.entry(provider.clone()) {
            Entry::Occupied(entry) => {
                if !entry.get().replace_adapter(adapter) {
                    return Err(Error::ConcurrentRun(provider));
                }
                info!("Replaced adapter for provider {} ({})", provider, kind);
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(ProviderSlot::new(adapter)));
                info!("Registered provider {} ({})", provider, kind);
            }
        }
        Ok(())
    }

    /// Start a run on its own task and return immediately
    ///
    /// # Returns
    ///
    /// - `Ok(SyncRunState::Testing)`: the run was claimed and spawned
    /// - `Err(SyncError)`: unknown provider, or a run is already in flight
    ///
    /// Must be called from within a Tokio runtime.
    pub fn request_sync(
        &self,
        provider: &ProviderId,
        config: ProviderConfig,
    ) -> Result<SyncRunState, SyncError> {
        let run = self.claim(provider)?;
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            // Outcome is published through the slot's state
            let _ = inner.drive(run, &config).await;
        });

        Ok(SyncRunState::Testing)
    }

    /// Run a sync to completion on the current task
    pub async fn run_sync(
        &self,
        provider: &ProviderId,
        config: ProviderConfig,
    ) -> Result<SyncReport, SyncError> {
        let run = self.claim(provider)?;
        self.inner.drive(run, &config).await
    }

    /// Current state of a provider
    pub fn state(&self, provider: &ProviderId) -> Option<SyncRunState> {
        self.inner
            .slots
            .get(provider)
            .map(|slot| slot.state.borrow().clone())
    }

    /// Full status of a provider
    pub fn status(&self, provider: &ProviderId) -> Option<ProviderStatus> {
        self.inner.slots.get(provider).map(|slot| {
            let history = slot.history.borrow().clone();
            ProviderStatus {
                provider: provider.clone(),
                kind: slot.adapter.borrow().kind(),
                state: slot.state.borrow().clone(),
                last_report: history.last_report,
                last_finished: history.last_finished,
            }
        })
    }

    /// Watch a provider's state transitions
    pub fn subscribe(&self, provider: &ProviderId) -> Option<watch::Receiver<SyncRunState>> {
        self.inner
            .slots
            .get(provider)
            .map(|slot| slot.state.subscribe())
    }

    /// Registered provider ids, sorted
    pub fn providers(&self) -> Vec<ProviderId> {
        let mut ids: Vec<ProviderId> = self
            .inner
            .slots
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Read-only copy of the whole store
    pub async fn entities(&self) -> Entities {
        self.inner.engine.store().entities().await
    }

    /// The shared store
    pub fn store(&self) -> &EntityStore {
        self.inner.engine.store()
    }

    /// Atomically move a provider into `Testing`
    fn claim(&self, provider: &ProviderId) -> Result<RunGuard, SyncError> {
        let slot = self
            .inner
            .slots
            .get(provider)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                SyncError::from_error(provider.clone(), &Error::UnknownProvider(provider.clone()))
            })?;

        let claimed = slot.state.send_if_modified(|state| {
            if state.is_running() {
                false
            } else {
                *state = SyncRunState::Testing;
                true
            }
        });

        if !claimed {
            debug!("Rejected sync request for {}: run already in progress", provider);
            return Err(SyncError::already_running(provider.clone()));
        }

        Ok(RunGuard { slot })
    }
}

impl CoordinatorInner {
    /// Drive a claimed slot from `Testing` to a terminal state
    async fn drive(
        &self,
        run: RunGuard,
        config: &ProviderConfig,
    ) -> Result<SyncReport, SyncError> {
        let slot = run.slot.as_ref();
        let adapter = slot.adapter();
        let adapter = adapter.as_ref();

        self.engine.announce_start(adapter.provider_id());

        let result = match self.engine.verify(adapter, config).await {
            Ok(_) => {
                slot.state.send_replace(SyncRunState::Syncing);
                self.engine.fetch_and_merge(adapter, config).await
            }
            Err(e) => Err(e),
        };

        let finished = Utc::now();
        match &result {
            Ok(report) => {
                slot.history.send_modify(|h| {
                    h.last_report = Some(report.clone());
                    h.last_finished = Some(finished);
                });
                slot.state.send_replace(SyncRunState::Succeeded(report.summary()));
            }
            Err(e) => {
                if e.is_rejection() {
                    warn!("Unexpected concurrent-run error inside run for {}", e.provider);
                }
                slot.history.send_modify(|h| h.last_finished = Some(finished));
                slot.state.send_replace(SyncRunState::Failed(e.message.clone()));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(SyncRunState::Testing.is_running());
        assert!(SyncRunState::Syncing.is_running());
        assert!(!SyncRunState::Idle.is_running());
        assert!(SyncRunState::Failed("x".into()).is_terminal());
        assert_eq!(SyncRunState::Succeeded("done".into()).message(), Some("done"));
        assert_eq!(SyncRunState::Idle.message(), None);
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&SyncRunState::Failed("401 Unauthorized".into())).unwrap();
        assert_eq!(json, r#"{"state":"failed","message":"401 Unauthorized"}"#);
        let idle = serde_json::to_string(&SyncRunState::Idle).unwrap();
        assert_eq!(idle, r#"{"state":"idle"}"#);
    }
}
