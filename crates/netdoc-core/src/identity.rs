//! Stable record identifiers
//!
//! Adapters derive record ids from the provider id plus an upstream natural
//! key (usually a MAC address), so re-syncing an unchanged controller yields
//! the same ids run after run.

use uuid::Uuid;

use crate::model::ProviderId;

/// Namespace for all netdoc-derived ids
const NETDOC_NAMESPACE: Uuid = Uuid::from_u128(0x6e65_7464_6f63_4f4b_9a1d_2c0e_5b7f_3a10);

/// Derive a deterministic id for an upstream record
///
/// `namespace` separates record families from the same provider (e.g.
/// `"dev"` and `"ip"`), so a device and its address don't share an id.
///
/// ```
/// use netdoc_core::identity::derive_id;
/// use netdoc_core::model::ProviderId;
///
/// let unifi = ProviderId::new("unifi").unwrap();
/// let a = derive_id(&unifi, "dev", "78:45:58:AA:BB:01");
/// let b = derive_id(&unifi, "dev", "78:45:58:aa:bb:01");
/// assert_eq!(a, b);
/// assert!(a.starts_with("unifi-dev-"));
/// ```
pub fn derive_id(provider: &ProviderId, namespace: &str, natural_key: &str) -> String {
    let key = natural_key.trim().to_ascii_lowercase();
    let name = format!("{}/{}/{}", provider.as_str(), namespace, key);
    let uuid = Uuid::new_v5(&NETDOC_NAMESPACE, name.as_bytes());
    format!("{}-{}-{}", provider.as_str(), namespace, uuid.simple())
}
