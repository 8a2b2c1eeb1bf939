//! Inventory data model
//!
//! Equipment and IPAM records, their provenance, and the snapshot an
//! adapter hands back from a fetch. Port mappings and WAN links are plain
//! documentation records the host persists alongside; the sync engine never
//! touches them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of an external provider (e.g. "unifi", "mikrotik")
///
/// Non-empty, trimmed, and never equal to `Manual` (case-insensitive) so a
/// provider partition can't be confused with hand-entered records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderId(String);

impl ProviderId {
    /// Create a provider id
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(Error::config("Provider id cannot be empty"));
        }
        if id.eq_ignore_ascii_case(MANUAL_TAG) {
            return Err(Error::config("Provider id 'Manual' is reserved"));
        }
        Ok(Self(id))
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProviderId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ProviderId> for String {
    fn from(id: ProviderId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProviderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

const MANUAL_TAG: &str = "Manual";

/// Provenance of a record
///
/// Serialized as a bare string: `"Manual"` or the provider id. `Manual`
/// sorts before every provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Source {
    /// Entered by hand; never written by the sync engine
    #[default]
    Manual,
    /// Owned by an external provider
    Provider(ProviderId),
}

impl Source {
    /// Provider-owned source
    pub fn provider(id: &ProviderId) -> Self {
        Source::Provider(id.clone())
    }

    /// Whether this is the manual partition
    pub fn is_manual(&self) -> bool {
        matches!(self, Source::Manual)
    }

    /// Whether this source is owned by `id`
    pub fn is_provider(&self, id: &ProviderId) -> bool {
        matches!(self, Source::Provider(p) if p == id)
    }
}

impl TryFrom<String> for Source {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        if value.trim().eq_ignore_ascii_case(MANUAL_TAG) {
            Ok(Source::Manual)
        } else {
            ProviderId::new(value).map(Source::Provider)
        }
    }
}

impl From<Source> for String {
    fn from(source: Source) -> Self {
        match source {
            Source::Manual => MANUAL_TAG.to_string(),
            Source::Provider(id) => id.into(),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Manual => f.write_str(MANUAL_TAG),
            Source::Provider(id) => id.fmt(f),
        }
    }
}

/// Kind of network device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Modem,
    Switch,
    Firewall,
    AccessPoint,
    Server,
    Router,
    Other,
}

/// Operational status of a device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceStatus {
    #[default]
    Active,
    Maintenance,
    InStock,
    Offline,
}

/// Optional live readings reported by a controller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram_percent: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f32>,
}

/// An inventoried piece of network equipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub firmware: String,
    #[serde(default)]
    pub status: DeviceStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<Telemetry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: Source,
}

impl Equipment {
    /// Create a manual, active equipment record with empty details
    pub fn new(id: impl Into<String>, name: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            device_type,
            model: String::new(),
            location: String::new(),
            ip: String::new(),
            mac: String::new(),
            firmware: String::new(),
            status: DeviceStatus::Active,
            notes: String::new(),
            telemetry: None,
            last_seen: None,
            source: Source::Manual,
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = ip.into();
        self
    }

    pub fn with_mac(mut self, mac: impl Into<String>) -> Self {
        self.mac = mac.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// How an address was assigned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentKind {
    #[default]
    Static,
    #[serde(rename = "DHCP")]
    Dhcp,
    Reserved,
}

/// Default gateway of an address entry
///
/// Serialized as the address string, or `"none"` when the entry has no
/// gateway. `"---"` and the empty string are accepted as "none" on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Gateway {
    Address(String),
    #[default]
    None,
}

impl From<String> for Gateway {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == "---" || trimmed.eq_ignore_ascii_case("none") {
            Gateway::None
        } else {
            Gateway::Address(trimmed.to_string())
        }
    }
}

impl From<Gateway> for String {
    fn from(gateway: Gateway) -> Self {
        match gateway {
            Gateway::Address(addr) => addr,
            Gateway::None => "none".to_string(),
        }
    }
}

/// An IPAM record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub id: String,
    pub device_name: String,
    pub ip: String,
    #[serde(default)]
    pub mask: String,
    #[serde(default)]
    pub gateway: Gateway,
    #[serde(default)]
    pub vlan_id: String,
    #[serde(rename = "type", default)]
    pub kind: AssignmentKind,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub source: Source,
}

impl AddressEntry {
    /// Create a manual static entry with a /24 mask and no gateway
    pub fn new(id: impl Into<String>, device_name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            device_name: device_name.into(),
            ip: ip.into(),
            mask: "255.255.255.0".to_string(),
            gateway: Gateway::None,
            vlan_id: "1".to_string(),
            kind: AssignmentKind::Static,
            notes: String::new(),
            source: Source::Manual,
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn with_kind(mut self, kind: AssignmentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_gateway(mut self, gateway: Gateway) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_vlan(mut self, vlan_id: impl Into<String>) -> Self {
        self.vlan_id = vlan_id.into();
        self
    }
}

/// Everything one provider fetch returned
///
/// All records carry the fetching adapter's [`Source`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub equipment: Vec<Equipment>,
    pub addresses: Vec<AddressEntry>,
}

impl Snapshot {
    pub fn new(equipment: Vec<Equipment>, addresses: Vec<AddressEntry>) -> Self {
        Self { equipment, addresses }
    }

    /// Total record count
    pub fn len(&self) -> usize {
        self.equipment.len() + self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equipment.is_empty() && self.addresses.is_empty()
    }

    /// Check that every record is stamped with `provider`
    ///
    /// Returns a contract error naming the first offending record.
    pub fn check_provenance(&self, provider: &ProviderId) -> Result<()> {
        if let Some(e) = self.equipment.iter().find(|e| !e.source.is_provider(provider)) {
            return Err(Error::contract(format!(
                "equipment {} from {} is tagged {}",
                e.id, provider, e.source
            )));
        }
        if let Some(a) = self.addresses.iter().find(|a| !a.source.is_provider(provider)) {
            return Err(Error::contract(format!(
                "address {} from {} is tagged {}",
                a.id, provider, a.source
            )));
        }
        Ok(())
    }
}

/// Read-only copy of the whole inventory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    pub equipment: Vec<Equipment>,
    pub addresses: Vec<AddressEntry>,
}

impl Entities {
    /// Equipment from one source
    pub fn equipment_from<'a>(&'a self, source: &'a Source) -> impl Iterator<Item = &'a Equipment> {
        self.equipment.iter().filter(move |e| &e.source == source)
    }

    /// Addresses from one source
    pub fn addresses_from<'a>(&'a self, source: &'a Source) -> impl Iterator<Item = &'a AddressEntry> {
        self.addresses.iter().filter(move |a| &a.source == source)
    }
}

/// Patch cable category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CableType {
    Cat5e,
    #[default]
    Cat6,
    Fiber,
}

/// Patch panel port to switch port mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub id: String,
    pub patch_panel_port: String,
    pub end_device: String,
    pub destination_switch: String,
    pub switch_port: String,
    #[serde(default)]
    pub vlan: String,
    #[serde(default)]
    pub cable: CableType,
}

/// An upstream internet link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WanLink {
    pub id: String,
    pub isp: String,
    #[serde(default)]
    pub connection_type: String,
    #[serde(default)]
    pub speed: String,
    #[serde(default)]
    pub public_ip: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub contract_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unifi() -> ProviderId {
        ProviderId::new("unifi").unwrap()
    }

    #[test]
    fn test_provider_id_rejects_reserved_and_empty() {
        assert!(ProviderId::new("").is_err());
        assert!(ProviderId::new("   ").is_err());
        assert!(ProviderId::new("manual").is_err());
        assert_eq!(ProviderId::new(" unifi ").unwrap().as_str(), "unifi");
    }

    #[test]
    fn test_source_serializes_as_bare_string() {
        let json = serde_json::to_string(&Source::provider(&unifi())).unwrap();
        assert_eq!(json, "\"unifi\"");
        let manual: Source = serde_json::from_str("\"Manual\"").unwrap();
        assert_eq!(manual, Source::Manual);
    }

    #[test]
    fn test_manual_sorts_first() {
        assert!(Source::Manual < Source::provider(&ProviderId::new("aaa").unwrap()));
    }

    #[test]
    fn test_gateway_sentinels() {
        assert_eq!(Gateway::from("---".to_string()), Gateway::None);
        assert_eq!(Gateway::from("None".to_string()), Gateway::None);
        assert_eq!(
            Gateway::from("192.168.1.1".to_string()),
            Gateway::Address("192.168.1.1".to_string())
        );
        assert_eq!(String::from(Gateway::None), "none");
    }

    #[test]
    fn test_equipment_source_defaults_to_manual() {
        let json = r#"{"id":"1","name":"Core","type":"Switch"}"#;
        let eq: Equipment = serde_json::from_str(json).unwrap();
        assert_eq!(eq.source, Source::Manual);
        assert_eq!(eq.status, DeviceStatus::Active);
    }

    #[test]
    fn test_check_provenance_flags_foreign_record() {
        let src = Source::provider(&unifi());
        let good = Equipment::new("a", "A", DeviceType::Switch).with_source(src.clone());
        let bad = AddressEntry::new("b", "B", "10.0.0.2");

        assert!(Snapshot::new(vec![good.clone()], vec![]).check_provenance(&unifi()).is_ok());

        let err = Snapshot::new(vec![good], vec![bad])
            .check_provenance(&unifi())
            .unwrap_err();
        assert!(err.to_string().contains("address b"));
    }
}
