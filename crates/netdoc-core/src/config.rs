//! Configuration types for netdoc
//!
//! Connection parameters are supplied by the caller per run; the core never
//! persists them itself (the host's [`InventoryDocument`] may).
//!
//! [`InventoryDocument`]: crate::traits::InventoryDocument

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Per-provider connection parameters
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Controller URL (`https://unifi.local:8443`) or bare host (`192.168.88.1`)
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub username: String,

    /// ⚠️ Never log this value
    #[serde(default)]
    pub password: String,

    /// Site / realm identifier, for controllers that manage several
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,

    /// Explicit API port; falls back to the endpoint URL's port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Connect over TLS even if the endpoint has no `https` scheme
    #[serde(default)]
    pub use_tls: bool,

    /// Verify the controller's certificate when using TLS
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// Per-call time budget the adapter enforces
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub sync_interval: SyncInterval,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("site", &self.site)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("verify_tls", &self.verify_tls)
            .field("timeout_secs", &self.timeout_secs)
            .field("sync_interval", &self.sync_interval)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: String::new(),
            password: String::new(),
            site: None,
            port: None,
            use_tls: false,
            verify_tls: default_verify_tls(),
            timeout_secs: default_timeout_secs(),
            sync_interval: SyncInterval::default(),
            enabled: default_enabled(),
        }
    }
}

impl ProviderConfig {
    /// Create a config with endpoint and credentials set
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn with_sync_interval(mut self, interval: SyncInterval) -> Self {
        self.sync_interval = interval;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// The endpoint parsed as an http(s) URL, if it is one
    pub fn endpoint_url(&self) -> Option<Url> {
        Url::parse(self.endpoint.trim())
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
    }

    /// Host part of the endpoint
    pub fn host(&self) -> String {
        match self.endpoint_url() {
            Some(url) => url.host_str().unwrap_or_default().to_string(),
            None => self.endpoint.trim().to_string(),
        }
    }

    /// Whether the connection is TLS-protected
    pub fn secure(&self) -> bool {
        self.use_tls || self.endpoint_url().is_some_and(|u| u.scheme() == "https")
    }

    /// Explicit port, else the endpoint URL's port or scheme default
    pub fn effective_port(&self) -> Option<u16> {
        self.port
            .or_else(|| self.endpoint_url().and_then(|u| u.port_or_known_default()))
    }

    /// Per-call time budget
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Which of `required` are blank
    pub fn missing_fields(&self, required: &[ConfigField]) -> Vec<ConfigField> {
        required
            .iter()
            .copied()
            .filter(|field| match field {
                ConfigField::Endpoint => self.endpoint.trim().is_empty(),
                ConfigField::Username => self.username.trim().is_empty(),
                ConfigField::Password => self.password.is_empty(),
                ConfigField::Site => self.site.as_deref().is_none_or(|s| s.trim().is_empty()),
                ConfigField::Port => self.effective_port().is_none(),
            })
            .collect()
    }
}

/// A connection field an adapter may require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    Endpoint,
    Username,
    Password,
    Site,
    Port,
}

impl std::fmt::Display for ConfigField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConfigField::Endpoint => "endpoint",
            ConfigField::Username => "username",
            ConfigField::Password => "password",
            ConfigField::Site => "site",
            ConfigField::Port => "port",
        };
        f.write_str(name)
    }
}

/// How often a provider is synced automatically
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncInterval {
    /// Only on explicit request
    #[default]
    Manual,
    Hourly,
    Daily,
}

impl SyncInterval {
    /// Period between automatic runs, `None` for manual
    pub fn period(&self) -> Option<Duration> {
        match self {
            SyncInterval::Manual => None,
            SyncInterval::Hourly => Some(Duration::from_secs(60 * 60)),
            SyncInterval::Daily => Some(Duration::from_secs(24 * 60 * 60)),
        }
    }
}

/// A provider entry in the host document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Adapter factory name (e.g. "unifi", "mikrotik")
    pub kind: String,

    #[serde(default)]
    pub config: ProviderConfig,

    /// Adapter-specific options, passed to the factory untouched
    #[serde(default)]
    pub options: serde_json::Value,
}

impl ProviderSettings {
    pub fn new(kind: impl Into<String>, config: ProviderConfig) -> Self {
        Self {
            kind: kind.into(),
            config,
            options: serde_json::Value::Null,
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.kind.trim().is_empty() {
            return Err(crate::Error::config("Provider kind cannot be empty"));
        }
        if self.config.timeout_secs == 0 {
            return Err(crate::Error::config("Provider timeout must be > 0"));
        }
        Ok(())
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the sync event channel
    ///
    /// When full, new events are dropped with a warning log.
    ///
    /// Default: 256 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

fn default_verify_tls() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_enabled() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    256
}
