// # UniFi Inventory Provider
//
// This crate provides the "unifi" provider adapter: a wireless/switch
// controller that reports its managed devices.
//
// ## Simulated controller
//
// The adapter does not speak the controller's HTTP API. It answers from a
// device fixture supplied in the provider's `options` (see
// [`UnifiOptions`]), with the connection checks a real controller would
// perform:
//
// - endpoint must be an `http(s)://` URL → otherwise `Error::Config`
// - host must be one the controller answers on → otherwise `Error::Unreachable`
// - credentials must match when the fixture pins them → otherwise `Error::Authentication`
// - every call finishes within `config.timeout()` → otherwise `Error::Timeout`
//
// ## Mapping
//
// | Controller field | Record                                    |
// |------------------|-------------------------------------------|
// | `type` code      | `uap` → AccessPoint, `usw` → Switch, `ugw`/`udm` → Router |
// | `state == 1`     | Active, anything else Offline             |
// | `mac`            | natural key for both equipment and address ids |
// | `ip`             | one Static address per device on the site gateway, VLAN 1 |
//
// ## Transport
//
// Controllers only accept TLS; a plain `http://` endpoint passes the
// connection test but is refused by the transport policy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use netdoc_core::config::ProviderConfig;
use netdoc_core::identity::derive_id;
use netdoc_core::model::{
    AddressEntry, AssignmentKind, DeviceStatus, DeviceType, Equipment, Gateway, ProviderId,
    Snapshot, Source, Telemetry,
};
use netdoc_core::traits::{ProviderAdapter, ProviderAdapterFactory, TransportPolicy};
use netdoc_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Provider kind this crate registers
pub const KIND: &str = "unifi";

/// Site used when the config names none
const DEFAULT_SITE: &str = "default";

/// A device as the controller reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiDevice {
    pub name: String,
    pub model: String,
    /// Device class code (`uap`, `usw`, `ugw`, `udm`)
    #[serde(rename = "type")]
    pub type_code: String,
    pub ip: String,
    pub mac: String,
    /// Firmware version
    pub version: String,
    /// 1 = connected
    pub state: u8,
    /// Seconds since boot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem: Option<f32>,
}

/// Credentials the simulated controller accepts
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

/// Controller fixture, read from the provider's `options`
///
/// Every field has a default, so `null` or `{}` yields a small site with
/// an access point, a switch and a gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifiOptions {
    /// Hosts the controller answers on; empty means any host
    pub hosts: Vec<String>,
    /// Accepted credentials; `None` accepts any
    pub credentials: Option<Credentials>,
    /// Gateway for every device address
    pub site_gateway: String,
    /// Simulated round-trip per call
    pub latency_ms: u64,
    pub devices: Vec<UnifiDevice>,
}

impl Default for UnifiOptions {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            credentials: None,
            site_gateway: "192.168.1.1".to_string(),
            latency_ms: 100,
            devices: default_devices(),
        }
    }
}

fn default_devices() -> Vec<UnifiDevice> {
    let device = |name: &str, model: &str, code: &str, ip: &str, mac: &str, version: &str| UnifiDevice {
        name: name.to_string(),
        model: model.to_string(),
        type_code: code.to_string(),
        ip: ip.to_string(),
        mac: mac.to_string(),
        version: version.to_string(),
        state: 1,
        uptime: None,
        cpu: None,
        mem: None,
    };

    vec![
        device("U6-Pro-Hall", "U6PRO", "uap", "192.168.1.10", "78:45:58:AA:BB:01", "6.5.62"),
        device("USW-Lite-16", "USL16P", "usw", "192.168.1.5", "78:45:58:AA:CC:02", "6.5.59"),
        device("UXG-Lite", "UXGLite", "ugw", "192.168.1.1", "78:45:58:AA:DD:03", "3.1.16"),
    ]
}

/// Map a controller type code to a device type
pub fn device_type(code: &str) -> DeviceType {
    match code.trim().to_ascii_lowercase().as_str() {
        "uap" => DeviceType::AccessPoint,
        "usw" => DeviceType::Switch,
        "ugw" | "udm" => DeviceType::Router,
        _ => DeviceType::Other,
    }
}

/// Render seconds as `3d 4h 12m`
fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

/// UniFi controller adapter
#[derive(Debug)]
pub struct UnifiAdapter {
    id: ProviderId,
    options: UnifiOptions,
}

impl UnifiAdapter {
    /// Create an adapter stamping records with `id`
    pub fn new(id: ProviderId, options: UnifiOptions) -> Self {
        Self { id, options }
    }

    /// Run one controller call: connection checks plus simulated latency,
    /// bounded by the config's timeout
    ///
    /// # Returns
    ///
    /// The controller host on success.
    async fn call(&self, config: &ProviderConfig) -> Result<String> {
        let url = config.endpoint_url().ok_or_else(|| {
            Error::config(format!(
                "Invalid controller URL '{}' (must start with http:// or https://)",
                config.endpoint
            ))
        })?;
        let host = url.host_str().unwrap_or_default().to_string();

        let latency = Duration::from_millis(self.options.latency_ms);
        tokio::time::timeout(config.timeout(), tokio::time::sleep(latency))
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "Controller {} did not answer within {}s (ETIMEDOUT)",
                    host, config.timeout_secs
                ))
            })?;

        if !self.options.hosts.is_empty() && !self.options.hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)) {
            return Err(Error::unreachable(format!("Host {} not found", host)));
        }

        if let Some(expected) = &self.options.credentials {
            if expected.username != config.username || expected.password != config.password {
                return Err(Error::auth("Invalid credentials (401 Unauthorized)"));
            }
        }

        Ok(host)
    }

    fn to_equipment(&self, device: &UnifiDevice, site: &str, seen: DateTime<Utc>) -> Equipment {
        let status = if device.state == 1 {
            DeviceStatus::Active
        } else {
            DeviceStatus::Offline
        };

        let mut equipment = Equipment::new(
            derive_id(&self.id, "device", &device.mac),
            &device.name,
            device_type(&device.type_code),
        )
        .with_model(&device.model)
        .with_ip(&device.ip)
        .with_mac(&device.mac)
        .with_status(status)
        .with_source(Source::provider(&self.id));

        equipment.location = format!("UniFi site {}", site);
        equipment.firmware = device.version.clone();
        equipment.notes = "Synced from UniFi controller".to_string();
        equipment.last_seen = Some(seen);

        if device.uptime.is_some() || device.cpu.is_some() || device.mem.is_some() {
            equipment.telemetry = Some(Telemetry {
                uptime: device.uptime.map(format_uptime),
                cpu_percent: device.cpu,
                ram_percent: device.mem,
                temperature_c: None,
            });
        }

        equipment
    }

    fn to_address(&self, device: &UnifiDevice) -> AddressEntry {
        let mut entry = AddressEntry::new(derive_id(&self.id, "address", &device.mac), &device.name, &device.ip)
            .with_kind(AssignmentKind::Static)
            .with_gateway(Gateway::Address(self.options.site_gateway.clone()))
            .with_vlan("1")
            .with_source(Source::provider(&self.id));
        entry.notes = format!("UniFi device ({})", device.model);
        entry
    }
}

#[async_trait]
impl ProviderAdapter for UnifiAdapter {
    fn provider_id(&self) -> &ProviderId {
        &self.id
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn transport_policy(&self) -> TransportPolicy {
        TransportPolicy::tls_only()
    }

    async fn test_connection(&self, config: &ProviderConfig) -> Result<String> {
        let host = self.call(config).await?;
        let site = config.site.as_deref().unwrap_or(DEFAULT_SITE);
        debug!("UniFi controller {} accepted login for site {}", host, site);
        Ok(format!("Connected to UniFi controller {} (site {})", host, site))
    }

    async fn fetch_snapshot(&self, config: &ProviderConfig) -> Result<Snapshot> {
        let host = self.call(config).await?;
        let site = config.site.as_deref().unwrap_or(DEFAULT_SITE);
        let seen = Utc::now();

        let equipment = self
            .options
            .devices
            .iter()
            .map(|d| self.to_equipment(d, site, seen))
            .collect();
        let addresses = self.options.devices.iter().map(|d| self.to_address(d)).collect();

        debug!("UniFi controller {} reported {} devices", host, self.options.devices.len());
        Ok(Snapshot::new(equipment, addresses))
    }
}

/// Factory for creating UniFi adapters
pub struct UnifiFactory;

impl ProviderAdapterFactory for UnifiFactory {
    fn create(&self, provider: &ProviderId, options: &serde_json::Value) -> Result<Arc<dyn ProviderAdapter>> {
        let options = if options.is_null() {
            UnifiOptions::default()
        } else {
            serde_json::from_value(options.clone())
                .map_err(|e| Error::config(format!("Invalid unifi options: {}", e)))?
        };

        Ok(Arc::new(UnifiAdapter::new(provider.clone(), options)))
    }
}

/// Register the UniFi factory under [`KIND`]
pub fn register(registry: &netdoc_core::ProviderRegistry) {
    registry.register_factory(KIND, Box::new(UnifiFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdoc_core::ErrorKind;
    use serde_json::json;

    fn adapter(options: serde_json::Value) -> Arc<dyn ProviderAdapter> {
        UnifiFactory
            .create(&ProviderId::new("unifi").unwrap(), &options)
            .unwrap()
    }

    fn config() -> ProviderConfig {
        ProviderConfig::new("https://unifi.local:8443", "admin", "secret")
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(device_type("uap"), DeviceType::AccessPoint);
        assert_eq!(device_type("usw"), DeviceType::Switch);
        assert_eq!(device_type("ugw"), DeviceType::Router);
        assert_eq!(device_type("UDM"), DeviceType::Router);
        assert_eq!(device_type("uph"), DeviceType::Other);
    }

    #[test]
    fn test_uptime_format() {
        assert_eq!(format_uptime(3 * 86_400 + 4 * 3_600 + 12 * 60), "3d 4h 12m");
        assert_eq!(format_uptime(90 * 60), "1h 30m");
    }

    #[test]
    fn test_factory_rejects_bad_options() {
        let result = UnifiFactory.create(&ProviderId::new("unifi").unwrap(), &json!({"devices": 5}));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_registers_kind() {
        let registry = netdoc_core::ProviderRegistry::new();
        register(&registry);
        assert!(registry.has_kind(KIND));
    }

    #[tokio::test]
    async fn test_default_fixture_snapshot() {
        let adapter = adapter(json!({"latency_ms": 0}));
        let snapshot = adapter.fetch_snapshot(&config()).await.unwrap();

        assert_eq!(snapshot.equipment.len(), 3);
        assert_eq!(snapshot.addresses.len(), 3);
        assert!(snapshot.check_provenance(adapter.provider_id()).is_ok());

        let types: Vec<DeviceType> = snapshot.equipment.iter().map(|e| e.device_type).collect();
        assert_eq!(types, vec![DeviceType::AccessPoint, DeviceType::Switch, DeviceType::Router]);

        let address = &snapshot.addresses[0];
        assert_eq!(address.kind, AssignmentKind::Static);
        assert_eq!(address.gateway, Gateway::Address("192.168.1.1".into()));
        assert_eq!(address.vlan_id, "1");
        assert!(snapshot.equipment.iter().all(|e| e.last_seen.is_some()));
    }

    #[tokio::test]
    async fn test_ids_stable_between_fetches() {
        let adapter = adapter(json!({"latency_ms": 0}));
        let first = adapter.fetch_snapshot(&config()).await.unwrap();
        let second = adapter.fetch_snapshot(&config()).await.unwrap();

        let ids = |s: &Snapshot| s.equipment.iter().map(|e| e.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert!(first.equipment[0].id.starts_with("unifi-device-"));
    }

    #[tokio::test]
    async fn test_offline_state_and_telemetry() {
        let adapter = adapter(json!({
            "latency_ms": 0,
            "devices": [{
                "name": "AP-Garage", "model": "UAP-AC-LR", "type": "uap",
                "ip": "192.168.1.20", "mac": "78:45:58:AA:EE:04", "version": "6.6.55",
                "state": 0, "uptime": 7200, "cpu": 12.5
            }]
        }));
        let snapshot = adapter.fetch_snapshot(&config()).await.unwrap();
        let device = &snapshot.equipment[0];

        assert_eq!(device.status, DeviceStatus::Offline);
        let telemetry = device.telemetry.as_ref().unwrap();
        assert_eq!(telemetry.uptime.as_deref(), Some("2h 0m"));
        assert_eq!(telemetry.cpu_percent, Some(12.5));
    }

    #[tokio::test]
    async fn test_connection_failures_classified() {
        let adapter = adapter(json!({
            "latency_ms": 0,
            "hosts": ["unifi.local"],
            "credentials": {"username": "admin", "password": "secret"}
        }));

        assert!(adapter.test_connection(&config()).await.is_ok());

        let invalid = ProviderConfig::new("unifi.local", "admin", "secret");
        assert_eq!(adapter.test_connection(&invalid).await.unwrap_err().kind(), ErrorKind::Config);

        let offline = ProviderConfig::new("https://offline.local", "admin", "secret");
        assert_eq!(adapter.test_connection(&offline).await.unwrap_err().kind(), ErrorKind::Unreachable);

        let wrong = ProviderConfig::new("https://unifi.local", "admin", "nope");
        let err = adapter.test_connection(&wrong).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(err.detail(), "Invalid credentials (401 Unauthorized)");

        // Fetch refuses too
        assert!(adapter.fetch_snapshot(&wrong).await.is_err());
    }

    #[tokio::test]
    async fn test_slow_controller_times_out() {
        let adapter = adapter(json!({"latency_ms": 1500}));
        let err = adapter
            .test_connection(&config().with_timeout_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(err.kind(), ErrorKind::Unreachable);
    }

    #[test]
    fn test_requires_tls() {
        assert!(adapter(serde_json::Value::Null).transport_policy().require_tls);
    }
}
