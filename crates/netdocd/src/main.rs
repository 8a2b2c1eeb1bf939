// # netdocd - netdoc Daemon
//
// Thin integration layer over netdoc-core. All sync, merge and state logic
// lives in the library; the daemon only wires it up.
//
// The netdocd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Loading the inventory document and seeding the store
// 3. Registering provider crates and the document's providers
// 4. Running the auto-sync schedule
// 5. Persisting the document after every successful sync and on shutdown
//
// ## Configuration
//
// All daemon configuration is done via environment variables. Provider
// connection settings live in the document itself, keyed by provider id.
//
// - `NETDOC_DOCUMENT_PATH`: Path to the JSON document (required for the file store)
// - `NETDOC_STORE_TYPE`: Type of document store (file, memory)
// - `NETDOC_SYNC_ON_START`: Sync every enabled provider at startup (true/false)
// - `NETDOC_LOG_LEVEL`: trace, debug, info, warn, error
// - `NETDOC_EVENT_CHANNEL_CAPACITY`: Sync event buffer size
//
// ## Example
//
// ```bash
// export NETDOC_STORE_TYPE=file
// export NETDOC_DOCUMENT_PATH=/var/lib/netdoc/inventory.json
// export NETDOC_SYNC_ON_START=true
//
// netdocd
// ```

use anyhow::{Context, Result};
use netdoc_core::{
    AutoSync, DocumentStore, EngineConfig, EntityStore, FileDocumentStore, InventoryDocument,
    MemoryDocumentStore, ProviderRegistry, ReconciliationEngine, ScheduledProvider,
    SyncCoordinator, SyncEvent,
};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Upper bound for the final document write at shutdown
const SHUTDOWN_SAVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum NetdocExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<NetdocExitCode> for ExitCode {
    fn from(code: NetdocExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    document_path: Option<String>,
    store_type: String,
    sync_on_start: bool,
    log_level: String,
    event_channel_capacity: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `var`
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let sync_on_start = match var("NETDOC_SYNC_ON_START") {
            Some(value) => parse_bool(&value).context("NETDOC_SYNC_ON_START")?,
            None => false,
        };

        let event_channel_capacity = var("NETDOC_EVENT_CHANNEL_CAPACITY")
            .map(|value| {
                value.trim().parse::<usize>().with_context(|| {
                    format!("NETDOC_EVENT_CHANNEL_CAPACITY must be a number. Got: {}", value)
                })
            })
            .transpose()?;

        Ok(Self {
            document_path: var("NETDOC_DOCUMENT_PATH").filter(|p| !p.trim().is_empty()),
            store_type: var("NETDOC_STORE_TYPE").unwrap_or_else(|| "file".to_string()),
            sync_on_start,
            log_level: var("NETDOC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            event_channel_capacity,
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "NETDOC_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.store_type
            ),
        }

        if self.store_type == "file" {
            let Some(path) = &self.document_path else {
                anyhow::bail!(
                    "NETDOC_DOCUMENT_PATH is required when NETDOC_STORE_TYPE=file. \
                    Set it via: export NETDOC_DOCUMENT_PATH=/var/lib/netdoc/inventory.json"
                );
            };

            if let Some(parent) = std::path::Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                anyhow::bail!(
                    "NETDOC_DOCUMENT_PATH parent directory does not exist: {}. \
                    Create it first: mkdir -p {}",
                    parent.display(),
                    parent.display()
                );
            }
        }

        self.engine_config()
            .validate()
            .context("NETDOC_EVENT_CHANNEL_CAPACITY")?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "NETDOC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn engine_config(&self) -> EngineConfig {
        let mut engine = EngineConfig::default();
        if let Some(capacity) = self.event_channel_capacity {
            engine.event_channel_capacity = capacity;
        }
        engine
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("expected true or false. Got: {}", other),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return NetdocExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return NetdocExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return NetdocExitCode::ConfigError.into();
    }

    info!("Starting netdocd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return NetdocExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            NetdocExitCode::RuntimeError
        } else {
            NetdocExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let documents = open_document_store(&config).await?;
    let document = match documents.load().await.context("Failed to load document")? {
        Some(document) => document,
        None => {
            info!("No stored document, starting with an empty inventory");
            InventoryDocument::default()
        }
    };
    info!(
        "Loaded {} equipment, {} address records, {} provider(s)",
        document.equipment.len(),
        document.addresses.len(),
        document.providers.len()
    );

    let registry = ProviderRegistry::new();
    register_builtin_providers(&registry);

    let store = EntityStore::from_entities(document.entities());
    let (engine, events) = ReconciliationEngine::new(store.clone(), config.engine_config())?;
    let coordinator = SyncCoordinator::new(engine);

    let scheduled = register_document_providers(&registry, &coordinator, &document);

    let persister = Persister::new(documents, document, store);
    let event_task = tokio::spawn(persist_on_events(events, persister.clone()));

    if config.sync_on_start {
        for provider in &scheduled {
            match coordinator.request_sync(&provider.provider, provider.config.clone()) {
                Ok(_) => info!("Initial sync started for {}", provider.provider),
                Err(e) => warn!("Initial sync for {} not started: {}", provider.provider, e),
            }
        }
    }

    let auto_sync = AutoSync::spawn(coordinator.clone(), scheduled);
    info!(
        "Daemon initialized: {} provider(s), {} on a schedule",
        coordinator.providers().len(),
        auto_sync.len()
    );

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);

    auto_sync.shutdown().await;
    event_task.abort();

    match tokio::time::timeout(SHUTDOWN_SAVE_TIMEOUT, persister.save()).await {
        Ok(Ok(())) => info!("Final document written"),
        Ok(Err(e)) => return Err(e).context("Failed to write final document"),
        Err(_) => anyhow::bail!("Final document write timed out after {:?}", SHUTDOWN_SAVE_TIMEOUT),
    }

    info!("Shutting down daemon");
    Ok(())
}

async fn open_document_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    if config.store_type == "memory" {
        info!("Using in-memory document store; nothing survives a restart");
        return Ok(Arc::new(MemoryDocumentStore::new()));
    }

    let path = config
        .document_path
        .as_deref()
        .context("NETDOC_DOCUMENT_PATH is required when NETDOC_STORE_TYPE=file")?;
    let store = FileDocumentStore::new(path)
        .await
        .with_context(|| format!("Failed to open document store at {}", path))?;
    info!("Using document file {}", path);
    Ok(Arc::new(store))
}

/// Register the provider crates compiled into this binary
fn register_builtin_providers(registry: &ProviderRegistry) {
    #[cfg(feature = "unifi")]
    {
        info!("Registering UniFi provider");
        netdoc_provider_unifi::register(registry);
    }

    #[cfg(feature = "mikrotik")]
    {
        info!("Registering MikroTik provider");
        netdoc_provider_mikrotik::register(registry);
    }

    if registry.list_kinds().is_empty() {
        warn!("No provider kinds compiled in; only manual records will be served");
    }
}

/// Create and register an adapter for every enabled provider in `document`
///
/// A provider that cannot be created is logged and skipped.
fn register_document_providers(
    registry: &ProviderRegistry,
    coordinator: &SyncCoordinator,
    document: &InventoryDocument,
) -> Vec<ScheduledProvider> {
    let mut scheduled = Vec::new();

    for (id, settings) in &document.providers {
        if !settings.config.enabled {
            info!("Provider {} is disabled, skipping", id);
            continue;
        }

        let adapter = match settings.validate().and_then(|_| registry.create_adapter(id, settings)) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!("Provider {} ({}) not loaded: {}", id, settings.kind, e);
                continue;
            }
        };

        if let Err(e) = coordinator.register(adapter) {
            warn!("Provider {} not registered: {}", id, e);
            continue;
        }

        scheduled.push(ScheduledProvider::new(id.clone(), settings.config.clone()));
    }

    scheduled
}

/// Writes the store back into the document
#[derive(Clone)]
struct Persister {
    documents: Arc<dyn DocumentStore>,
    document: Arc<Mutex<InventoryDocument>>,
    store: EntityStore,
}

impl Persister {
    fn new(documents: Arc<dyn DocumentStore>, document: InventoryDocument, store: EntityStore) -> Self {
        Self {
            documents,
            document: Arc::new(Mutex::new(document)),
            store,
        }
    }

    /// Save the current store contents, keeping the document's other sections
    async fn save(&self) -> netdoc_core::Result<()> {
        let mut document = self.document.lock().await;
        document.set_entities(self.store.entities().await);
        self.documents.save(&document).await
    }
}

/// Persist after every replaced partition until the engine goes away
async fn persist_on_events(mut events: mpsc::Receiver<SyncEvent>, persister: Persister) {
    while let Some(event) = events.recv().await {
        match event {
            SyncEvent::PartitionReplaced { report } => {
                if let Err(e) = persister.save().await {
                    error!("Failed to persist document after {} sync: {}", report.provider, e);
                } else {
                    debug!("Document persisted after {} sync", report.provider);
                }
            }
            other => debug!("Sync event: {:?}", other),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
