//! Test doubles and common utilities for sync contract tests
//!
//! The mock adapter returns scripted connection verdicts and snapshots and
//! counts how often it is called, so tests can check what the engine and
//! coordinator did without any real controller.

#![allow(dead_code)]

use netdoc_core::config::ProviderConfig;
use netdoc_core::error::{Error, Result};
use netdoc_core::model::{AddressEntry, DeviceType, Equipment, ProviderId, Snapshot, Source};
use netdoc_core::traits::{ProviderAdapter, TransportPolicy};
use netdoc_core::{EngineConfig, EntityStore, ReconciliationEngine, SyncCoordinator, SyncRunState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Scripted failure an adapter step should return
#[derive(Debug, Clone)]
pub enum Failure {
    Auth(String),
    Unreachable(String),
    Timeout,
    Fetch(String),
    Config(String),
}

impl Failure {
    fn to_error(&self) -> Error {
        match self {
            Failure::Auth(msg) => Error::auth(msg.clone()),
            Failure::Unreachable(msg) => Error::unreachable(msg.clone()),
            Failure::Timeout => Error::timeout("Connection timed out"),
            Failure::Fetch(msg) => Error::fetch(msg.clone()),
            Failure::Config(msg) => Error::config(msg.clone()),
        }
    }
}

/// A ProviderAdapter with scripted behavior that tracks calls
pub struct MockAdapter {
    id: ProviderId,
    policy: TransportPolicy,
    snapshot: Mutex<Snapshot>,
    connection_failure: Mutex<Option<Failure>>,
    fetch_failure: Mutex<Option<Failure>>,
    delay: Duration,
    /// Fetch waits on this before returning
    gate: Option<Arc<Notify>>,
    test_calls: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
}

impl MockAdapter {
    /// Adapter that accepts any connection and returns an empty snapshot
    pub fn new(id: &ProviderId) -> Self {
        Self {
            id: id.clone(),
            policy: TransportPolicy::permissive(),
            snapshot: Mutex::new(Snapshot::default()),
            connection_failure: Mutex::new(None),
            fetch_failure: Mutex::new(None),
            delay: Duration::ZERO,
            gate: None,
            test_calls: Arc::new(AtomicUsize::new(0)),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_snapshot(self, snapshot: Snapshot) -> Self {
        *self.snapshot.lock().unwrap() = snapshot;
        self
    }

    pub fn with_policy(mut self, policy: TransportPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sleep this long in each step
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Hold every fetch until `gate` is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn failing_connection(self, failure: Failure) -> Self {
        *self.connection_failure.lock().unwrap() = Some(failure);
        self
    }

    pub fn failing_fetch(self, failure: Failure) -> Self {
        *self.fetch_failure.lock().unwrap() = Some(failure);
        self
    }

    /// Change what the next fetch returns
    pub fn set_snapshot(&self, snapshot: Snapshot) {
        *self.snapshot.lock().unwrap() = snapshot;
    }

    pub fn set_fetch_failure(&self, failure: Option<Failure>) {
        *self.fetch_failure.lock().unwrap() = failure;
    }

    pub fn test_calls(&self) -> usize {
        self.test_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for MockAdapter {
    fn provider_id(&self) -> &ProviderId {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "mock"
    }

    fn transport_policy(&self) -> TransportPolicy {
        self.policy
    }

    async fn test_connection(&self, _config: &ProviderConfig) -> Result<String> {
        self.test_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failure = self.connection_failure.lock().unwrap().clone();
        match failure {
            Some(f) => Err(f.to_error()),
            None => Ok(format!("Connected to {}", self.id)),
        }
    }

    async fn fetch_snapshot(&self, _config: &ProviderConfig) -> Result<Snapshot> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let failure = self.fetch_failure.lock().unwrap().clone();
        match failure {
            Some(f) => Err(f.to_error()),
            None => Ok(self.snapshot.lock().unwrap().clone()),
        }
    }
}

pub fn pid(id: &str) -> ProviderId {
    ProviderId::new(id).expect("valid provider id")
}

/// Config with every required field set
pub fn config() -> ProviderConfig {
    ProviderConfig::new("https://controller.test", "admin", "secret")
}

pub fn device(id: &str, source: Source) -> Equipment {
    Equipment::new(id, format!("Device {}", id), DeviceType::Switch).with_source(source)
}

pub fn address(id: &str, ip: &str, source: Source) -> AddressEntry {
    AddressEntry::new(id, format!("Device {}", id), ip).with_source(source)
}

/// Snapshot of switches with the given ids, stamped with `provider`
pub fn snapshot_for(provider: &ProviderId, ids: &[&str]) -> Snapshot {
    let source = Source::provider(provider);
    Snapshot::new(
        ids.iter().map(|id| device(id, source.clone())).collect(),
        ids.iter()
            .enumerate()
            .map(|(i, id)| address(id, &format!("10.0.0.{}", i + 1), source.clone()))
            .collect(),
    )
}

pub fn engine(store: EntityStore) -> ReconciliationEngine {
    let (engine, _events) =
        ReconciliationEngine::new(store, EngineConfig::default()).expect("engine construction succeeds");
    engine
}

pub fn coordinator(store: EntityStore) -> SyncCoordinator {
    SyncCoordinator::new(engine(store))
}

/// Wait until `provider` reaches a state matching `done`
pub async fn wait_for_state(
    coordinator: &SyncCoordinator,
    provider: &ProviderId,
    done: impl FnMut(&SyncRunState) -> bool,
) -> SyncRunState {
    let mut rx = coordinator.subscribe(provider).expect("provider registered");
    let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(done))
        .await
        .expect("state reached in time")
        .expect("state channel open");
    state.clone()
}

/// Wait until `provider`'s run has finished
pub async fn wait_terminal(coordinator: &SyncCoordinator, provider: &ProviderId) -> SyncRunState {
    wait_for_state(coordinator, provider, |s| s.is_terminal()).await
}
