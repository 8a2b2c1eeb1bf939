//! Contract Test: Failure Atomicity and Classification
//!
//! A failed run leaves the store untouched and reports a typed error.
//!
//! Constraints verified:
//! - Fetch failure after a passed connection test changes nothing
//! - Rejected credentials surface the provider's message verbatim
//! - A missing required field fails before the adapter is contacted
//! - Transport policy violations fail before any fetch
//! - The engine only fetches after the connection test passed
//! - Adapter timeouts classify as unreachable
//!
//! If this test fails, someone has made the merge partial or let an
//! expected failure escape its classification.

mod common;

use common::*;
use netdoc_core::model::{Entities, Source};
use netdoc_core::traits::TransportPolicy;
use netdoc_core::{EngineConfig, EntityStore, ErrorKind, ReconciliationEngine, SyncEvent, SyncRunState};
use std::sync::Arc;

fn seeded(provider: &netdoc_core::ProviderId) -> EntityStore {
    let sp = Source::provider(provider);
    EntityStore::from_entities(Entities {
        equipment: vec![device("1", Source::Manual), device("p-1", sp.clone())],
        addresses: vec![address("p-1", "10.1.1.1", sp)],
    })
}

#[tokio::test]
async fn fetch_failure_leaves_partition_unchanged() {
    let p = pid("P");
    let store = seeded(&p);
    let before = store.partition(&Source::provider(&p)).await;

    let adapter = MockAdapter::new(&p)
        .with_snapshot(snapshot_for(&p, &["p-2"]))
        .failing_fetch(Failure::Fetch("connection reset mid-transfer".into()));

    let err = engine(store.clone()).sync(&adapter, &config()).await.unwrap_err();

    assert_eq!(adapter.test_calls(), 1);
    assert_eq!(adapter.fetch_calls(), 1);
    assert_eq!(err.kind, ErrorKind::Fetch);
    assert_eq!(store.partition(&Source::provider(&p)).await, before);
}

#[tokio::test]
async fn engine_never_fetches_without_passed_validation() {
    let p = pid("P");
    let store = seeded(&p);
    let before = store.entities().await;

    let adapter = MockAdapter::new(&p)
        .with_snapshot(snapshot_for(&p, &["p-2"]))
        .failing_connection(Failure::Unreachable("Host unreachable".into()));

    let err = engine(store.clone()).sync(&adapter, &config()).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Unreachable);
    assert_eq!(adapter.test_calls(), 1);
    assert_eq!(adapter.fetch_calls(), 0);
    assert_eq!(store.entities().await, before);
}

#[tokio::test]
async fn unauthorized_surfaces_message_and_fails_state() {
    let p = pid("P");
    let store = seeded(&p);
    let before = store.entities().await;

    let adapter = Arc::new(MockAdapter::new(&p).failing_connection(Failure::Auth("401 Unauthorized".into())));
    let coordinator = coordinator(store.clone());
    coordinator.register(adapter.clone()).unwrap();

    let err = coordinator.run_sync(&p, config()).await.unwrap_err();

    assert_eq!(err.to_string(), "401 Unauthorized");
    assert_eq!(err.kind, ErrorKind::Auth);
    assert_eq!(store.entities().await, before);
    assert_eq!(adapter.fetch_calls(), 0, "fetch must not run after a failed test");
    assert_eq!(
        coordinator.state(&p),
        Some(SyncRunState::Failed("401 Unauthorized".into()))
    );
}

#[tokio::test]
async fn missing_field_fails_before_adapter_called() {
    let p = pid("P");
    let adapter = MockAdapter::new(&p);
    let mut cfg = config();
    cfg.password = String::new();

    let err = engine(EntityStore::new()).sync(&adapter, &cfg).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Config);
    assert!(err.message.contains("password"), "message names the field: {}", err.message);
    assert_eq!(adapter.test_calls(), 0);
}

#[tokio::test]
async fn insecure_transport_rejected_before_fetch() {
    let p = pid("P");
    let adapter = MockAdapter::new(&p)
        .with_policy(TransportPolicy::tls_only())
        .with_snapshot(snapshot_for(&p, &["p-1"]));
    let store = EntityStore::new();
    let cfg = netdoc_core::ProviderConfig::new("http://controller.test", "admin", "secret");

    let err = engine(store.clone()).sync(&adapter, &cfg).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::TransportPolicy);
    assert_eq!(adapter.test_calls(), 1);
    assert_eq!(adapter.fetch_calls(), 0);
    assert!(store.entities().await.equipment.is_empty());
}

#[tokio::test]
async fn port_inconsistent_with_mode_rejected() {
    let p = pid("P");
    let adapter = MockAdapter::new(&p).with_policy(TransportPolicy::ports(8728, 8729));
    let cfg = netdoc_core::ProviderConfig::new("192.168.88.1", "admin", "secret")
        .with_tls(true)
        .with_port(8728);

    let err = engine(EntityStore::new()).sync(&adapter, &cfg).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TransportPolicy);
}

#[tokio::test]
async fn timeout_classified_as_unreachable() {
    let p = pid("P");
    let adapter = MockAdapter::new(&p).failing_connection(Failure::Timeout);

    let err = engine(EntityStore::new()).sync(&adapter, &config()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unreachable);

    let adapter = MockAdapter::new(&p).failing_connection(Failure::Unreachable("No route to host".into()));
    let err = engine(EntityStore::new()).sync(&adapter, &config()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unreachable);
    assert_eq!(err.message, "No route to host");
}

#[tokio::test]
async fn adapter_config_error_is_a_failed_result() {
    let p = pid("P");
    let adapter = MockAdapter::new(&p).failing_connection(Failure::Config("Invalid URL".into()));

    let err = engine(EntityStore::new()).sync(&adapter, &config()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Config);
    assert_eq!(err.message, "Invalid URL");
}

#[tokio::test]
async fn events_trace_run_in_order() {
    let p = pid("P");
    let adapter = MockAdapter::new(&p).with_snapshot(snapshot_for(&p, &["a"]));
    let (engine, mut events) =
        ReconciliationEngine::new(EntityStore::new(), EngineConfig::default()).expect("engine construction succeeds");

    engine.sync(&adapter, &config()).await.expect("sync succeeds");
    drop(engine);

    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        seen.push(event);
    }

    assert!(matches!(seen[0], SyncEvent::RunStarted { .. }));
    assert!(matches!(seen[1], SyncEvent::ConnectionVerified { .. }));
    assert!(matches!(
        seen[2],
        SyncEvent::SnapshotFetched { equipment: 1, addresses: 1, .. }
    ));
    match &seen[3] {
        SyncEvent::PartitionReplaced { report } => assert_eq!(report.equipment_added, 1),
        other => panic!("expected PartitionReplaced, got {:?}", other),
    }
    assert_eq!(seen.len(), 4);
}

#[tokio::test]
async fn failed_run_emits_rejection_then_failure() {
    let p = pid("P");
    let adapter = MockAdapter::new(&p).failing_connection(Failure::Auth("bad password".into()));
    let (engine, mut events) =
        ReconciliationEngine::new(EntityStore::new(), EngineConfig::default()).expect("engine construction succeeds");

    let _ = engine.sync(&adapter, &config()).await;
    drop(engine);

    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        seen.push(event);
    }

    assert!(matches!(
        seen[1],
        SyncEvent::ConnectionRejected { kind: ErrorKind::Auth, .. }
    ));
    match &seen[2] {
        SyncEvent::RunFailed { error } => assert_eq!(error.message, "bad password"),
        other => panic!("expected RunFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn full_event_channel_does_not_fail_runs() {
    let p = pid("P");
    let adapter = MockAdapter::new(&p).with_snapshot(snapshot_for(&p, &["a"]));
    let (engine, _events) = ReconciliationEngine::new(
        EntityStore::new(),
        EngineConfig { event_channel_capacity: 1 },
    )
    .expect("engine construction succeeds");

    // Events beyond the first are dropped, runs still succeed
    for _ in 0..3 {
        engine.sync(&adapter, &config()).await.expect("sync succeeds");
    }
}
