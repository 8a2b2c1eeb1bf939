// # MikroTik Inventory Provider
//
// This crate provides the "mikrotik" provider adapter: a RouterOS router
// whose management API reports the router itself and its DHCP leases.
//
// ## Simulated router
//
// The adapter answers from a fixture in the provider's `options` (see
// [`MikrotikOptions`]) instead of opening an API session. Connection checks:
//
// - endpoint must be a bare host or an http(s) URL → otherwise `Error::Config`
// - host must be one the router answers on → otherwise `Error::Unreachable`
// - credentials must match when the fixture pins them → otherwise `Error::Authentication`
// - every call finishes within `config.timeout()` → otherwise `Error::Timeout`
//
// ## Mapping
//
// - The router becomes one Router equipment keyed by its host.
// - Each lease becomes one DHCP address keyed by MAC, with the router host
//   as gateway and the fixture's lease VLAN.
//
// ## Transport
//
// The API listens on 8728 (plain) and 8729 (TLS); a port that contradicts
// the configured security mode is refused by the transport policy.

use async_trait::async_trait;
use chrono::Utc;
use netdoc_core::config::ProviderConfig;
use netdoc_core::identity::derive_id;
use netdoc_core::model::{
    AddressEntry, AssignmentKind, DeviceStatus, DeviceType, Equipment, Gateway, ProviderId,
    Snapshot, Source,
};
use netdoc_core::traits::{ProviderAdapter, ProviderAdapterFactory, TransportPolicy};
use netdoc_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Provider kind this crate registers
pub const KIND: &str = "mikrotik";

/// RouterOS API port, plain text
pub const API_PORT: u16 = 8728;

/// RouterOS API port, TLS
pub const API_TLS_PORT: u16 = 8729;

/// The router's own identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterInfo {
    pub name: String,
    pub model: String,
    pub mac: String,
    /// RouterOS version string
    pub firmware: String,
    pub location: String,
}

impl Default for RouterInfo {
    fn default() -> Self {
        Self {
            name: "MikroTik Core Router".to_string(),
            model: "RB5009".to_string(),
            mac: "E4:8D:8C:01:02:03".to_string(),
            firmware: "RouterOS v7.12".to_string(),
            location: "Central Rack".to_string(),
        }
    }
}

/// A DHCP lease as RouterOS reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    #[serde(default, rename = "host-name", skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    pub address: String,
    #[serde(rename = "mac-address")]
    pub mac_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Credentials the simulated router accepts
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Router fixture, read from the provider's `options`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MikrotikOptions {
    /// Hosts the router answers on; empty means any host
    pub hosts: Vec<String>,
    /// Accepted credentials; `None` accepts any
    pub credentials: Option<Credentials>,
    pub router: RouterInfo,
    pub leases: Vec<Lease>,
    /// VLAN the leases are served on
    pub lease_vlan: String,
    /// Simulated round-trip per call
    pub latency_ms: u64,
}

impl Default for MikrotikOptions {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            credentials: None,
            router: RouterInfo::default(),
            leases: vec![
                Lease {
                    host_name: Some("PC-ADMIN".to_string()),
                    address: "192.168.88.50".to_string(),
                    mac_address: "00:15:5D:01:02:03".to_string(),
                    comment: Some("Finance".to_string()),
                },
                Lease {
                    host_name: Some("CCTV-01".to_string()),
                    address: "192.168.88.200".to_string(),
                    mac_address: "B8:27:EB:AA:BB:CC".to_string(),
                    comment: Some("Entrance camera".to_string()),
                },
            ],
            lease_vlan: "88".to_string(),
            latency_ms: 100,
        }
    }
}

/// MikroTik RouterOS adapter
#[derive(Debug)]
pub struct MikrotikAdapter {
    id: ProviderId,
    options: MikrotikOptions,
}

impl MikrotikAdapter {
    /// Create an adapter stamping records with `id`
    pub fn new(id: ProviderId, options: MikrotikOptions) -> Self {
        Self { id, options }
    }

    /// Run one API call: connection checks plus simulated latency, bounded
    /// by the config's timeout
    ///
    /// # Returns
    ///
    /// The router host on success.
    async fn call(&self, config: &ProviderConfig) -> Result<String> {
        let host = config.host();
        if host.is_empty() || host.contains(|c: char| c.is_whitespace() || c == '/') {
            return Err(Error::config(format!("Invalid router address '{}'", config.endpoint)));
        }

        let latency = Duration::from_millis(self.options.latency_ms);
        tokio::time::timeout(config.timeout(), tokio::time::sleep(latency))
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "Router {} did not answer within {}s",
                    host, config.timeout_secs
                ))
            })?;

        if !self.options.hosts.is_empty() && !self.options.hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)) {
            return Err(Error::unreachable(format!("No route to host {}", host)));
        }

        if let Some(expected) = &self.options.credentials {
            if expected.username != config.username || expected.password != config.password {
                return Err(Error::auth("RouterOS login failed"));
            }
        }

        Ok(host)
    }

    fn router(&self, host: &str) -> Equipment {
        let info = &self.options.router;
        let mut router = Equipment::new(derive_id(&self.id, "router", host), &info.name, DeviceType::Router)
            .with_model(&info.model)
            .with_ip(host)
            .with_mac(&info.mac)
            .with_status(DeviceStatus::Active)
            .with_source(Source::provider(&self.id));

        router.location = info.location.clone();
        router.firmware = info.firmware.clone();
        router.notes = "Main MikroTik router".to_string();
        router.last_seen = Some(Utc::now());
        router
    }

    fn lease(&self, lease: &Lease, host: &str) -> AddressEntry {
        let name = lease
            .host_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("Generic MikroTik Lease");

        let mut entry = AddressEntry::new(derive_id(&self.id, "lease", &lease.mac_address), name, &lease.address)
            .with_kind(AssignmentKind::Dhcp)
            .with_gateway(Gateway::Address(host.to_string()))
            .with_vlan(&self.options.lease_vlan)
            .with_source(Source::provider(&self.id));
        entry.notes = lease
            .comment
            .clone()
            .unwrap_or_else(|| "Imported via RouterOS API".to_string());
        entry
    }
}

#[async_trait]
impl ProviderAdapter for MikrotikAdapter {
    fn provider_id(&self) -> &ProviderId {
        &self.id
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn transport_policy(&self) -> TransportPolicy {
        TransportPolicy::ports(API_PORT, API_TLS_PORT)
    }

    async fn test_connection(&self, config: &ProviderConfig) -> Result<String> {
        let host = self.call(config).await?;
        debug!("RouterOS {} accepted login for {}", host, config.username);
        Ok(format!("Connected to RouterOS at {}", host))
    }

    async fn fetch_snapshot(&self, config: &ProviderConfig) -> Result<Snapshot> {
        let host = self.call(config).await?;

        let equipment = vec![self.router(&host)];
        let addresses = self
            .options
            .leases
            .iter()
            .map(|l| self.lease(l, &host))
            .collect();

        debug!("RouterOS {} reported {} leases", host, self.options.leases.len());
        Ok(Snapshot::new(equipment, addresses))
    }
}

/// Factory for creating MikroTik adapters
pub struct MikrotikFactory;

impl ProviderAdapterFactory for MikrotikFactory {
    fn create(&self, provider: &ProviderId, options: &serde_json::Value) -> Result<Arc<dyn ProviderAdapter>> {
        let options = if options.is_null() {
            MikrotikOptions::default()
        } else {
            serde_json::from_value(options.clone())
                .map_err(|e| Error::config(format!("Invalid mikrotik options: {}", e)))?
        };

        Ok(Arc::new(MikrotikAdapter::new(provider.clone(), options)))
    }
}

/// Register the MikroTik factory under [`KIND`]
pub fn register(registry: &netdoc_core::ProviderRegistry) {
    registry.register_factory(KIND, Box::new(MikrotikFactory));
}
