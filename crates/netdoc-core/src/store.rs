// # Entity Store
//
// Canonical in-memory home of all Equipment and AddressEntry records,
// partitioned by provenance.
//
// ## Write discipline
//
// The only mutation after construction is `replace_partition`, called by the
// ReconciliationEngine. It swaps one provider's partition under a single
// write-lock acquisition with no await inside, so readers observe either the
// pre-sync or the post-sync partition, never a mix. The Manual partition is
// never written.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::model::{AddressEntry, Entities, Equipment, ProviderId, Snapshot, Source};

/// Records sharing one [`Source`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub equipment: Vec<Equipment>,
    pub addresses: Vec<AddressEntry>,
}

impl Partition {
    pub fn is_empty(&self) -> bool {
        self.equipment.is_empty() && self.addresses.is_empty()
    }
}

/// What a partition replace changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Equipment records now in the partition
    pub equipment_added: usize,
    /// Address records now in the partition
    pub addresses_added: usize,
    /// Equipment ids present before and gone after
    pub equipment_dropped: usize,
    /// Address ids present before and gone after
    pub addresses_dropped: usize,
}

/// Partitioned inventory store
///
/// Cheap to clone; clones share the same records.
///
/// # Example
///
/// ```rust
/// use netdoc_core::store::EntityStore;
/// use netdoc_core::model::{DeviceType, Entities, Equipment};
///
/// # tokio_test::block_on(async {
/// let store = EntityStore::from_entities(Entities {
///     equipment: vec![Equipment::new("1", "Core Router", DeviceType::Router)],
///     addresses: vec![],
/// });
/// assert_eq!(store.entities().await.equipment.len(), 1);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    inner: Arc<RwLock<BTreeMap<Source, Partition>>>,
}

impl EntityStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from flat records, partitioning them by `source`
    pub fn from_entities(entities: Entities) -> Self {
        let mut partitions: BTreeMap<Source, Partition> = BTreeMap::new();
        for e in entities.equipment {
            partitions.entry(e.source.clone()).or_default().equipment.push(e);
        }
        for a in entities.addresses {
            partitions.entry(a.source.clone()).or_default().addresses.push(a);
        }
        Self {
            inner: Arc::new(RwLock::new(partitions)),
        }
    }

    /// Consistent copy of every record
    ///
    /// Partitions appear in [`Source`] order (Manual first), records in the
    /// order they were written within a partition.
    pub async fn entities(&self) -> Entities {
        let guard = self.inner.read().await;
        let mut out = Entities::default();
        for partition in guard.values() {
            out.equipment.extend(partition.equipment.iter().cloned());
            out.addresses.extend(partition.addresses.iter().cloned());
        }
        out
    }

    /// Copy of one partition (empty if unknown)
    pub async fn partition(&self, source: &Source) -> Partition {
        self.inner.read().await.get(source).cloned().unwrap_or_default()
    }

    /// `(source, equipment count, address count)` per non-empty partition
    pub async fn partition_sizes(&self) -> Vec<(Source, usize, usize)> {
        self.inner
            .read()
            .await
            .iter()
            .filter(|(_, p)| !p.is_empty())
            .map(|(s, p)| (s.clone(), p.equipment.len(), p.addresses.len()))
            .collect()
    }

    /// Replace `provider`'s partition with `snapshot`
    ///
    /// Full replace, not upsert: records absent from the snapshot are
    /// dropped. An empty snapshot removes the partition entirely.
    pub(crate) async fn replace_partition(
        &self,
        provider: &ProviderId,
        snapshot: Snapshot,
    ) -> MergeOutcome {
        let source = Source::provider(provider);
        let incoming = Partition {
            equipment: snapshot.equipment,
            addresses: snapshot.addresses,
        };

        let mut guard = self.inner.write().await;
        let previous = if incoming.is_empty() {
            guard.remove(&source)
        } else {
            guard.insert(source, incoming.clone())
        };
        drop(guard);

        let previous = previous.unwrap_or_default();
        MergeOutcome {
            equipment_added: incoming.equipment.len(),
            addresses_added: incoming.addresses.len(),
            equipment_dropped: dropped(
                previous.equipment.iter().map(|e| e.id.as_str()),
                incoming.equipment.iter().map(|e| e.id.as_str()),
            ),
            addresses_dropped: dropped(
                previous.addresses.iter().map(|a| a.id.as_str()),
                incoming.addresses.iter().map(|a| a.id.as_str()),
            ),
        }
    }
}

/// Count ids in `before` that are not in `after`
fn dropped<'a>(
    before: impl Iterator<Item = &'a str>,
    after: impl Iterator<Item = &'a str>,
) -> usize {
    let after: HashSet<&str> = after.collect();
    before.filter(|id| !after.contains(id)).count()
}
