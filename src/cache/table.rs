//! Growable aggregate tables.
//!
//! Each table is an arena of [`AggregateKey`]s addressed by positional
//! handles plus a key lookup. Handles are assigned in registration order and
//! never reused, so a table written out and read back in the same order
//! yields the same handles.

use rustc_hash::FxHashMap;

use crate::aggregate::{
    AggregateHandle, AggregateId, AggregateKey, IdComponent, LocalHandle, StableHandle,
};
use crate::core::AggError;
use crate::graph::{PackageGraph, PackageIndex};

/// One aggregate table, stable or local.
#[derive(Debug, Clone)]
pub struct AggregateTable<H> {
    entries: Vec<AggregateKey>,
    lookup: FxHashMap<AggregateKey, H>,
}

impl<H> Default for AggregateTable<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            lookup: FxHashMap::default(),
        }
    }
}

impl<H: AggregateHandle> AggregateTable<H> {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of `key`, appending it as the next entry if unknown.
    pub fn get_or_insert(&mut self, key: AggregateKey) -> H {
        debug_assert!(key.len() >= 2, "aggregate {key} has fewer than two members");
        if let Some(&handle) = self.lookup.get(&key) {
            return handle;
        }
        let handle = H::from_position(self.entries.len());
        self.lookup.insert(key.clone(), handle);
        self.entries.push(key);
        handle
    }

    /// Handle of `key`, if registered.
    #[must_use]
    pub fn find(&self, key: &AggregateKey) -> Option<H> {
        self.lookup.get(key).copied()
    }

    /// Members of the entry behind `handle`.
    #[must_use]
    pub fn get(&self, handle: H) -> Option<&[PackageIndex]> {
        self.entries.get(handle.position()).map(AggregateKey::indices)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (H, &[PackageIndex])> {
        self.entries.iter().enumerate().map(|(i, key)| (H::from_position(i), key.indices()))
    }
}

/// The stable and local tables side by side.
#[derive(Debug, Clone, Default)]
pub struct AggregateTables {
    /// Aggregates of stable packages.
    pub stable: AggregateTable<StableHandle>,
    /// Aggregates of local-dependent packages.
    pub local: AggregateTable<LocalHandle>,
}

impl AggregateTables {
    /// Identity of `members`, registering table entries as needed.
    ///
    /// Members may come in any order and contain duplicates.
    pub fn register(
        &mut self,
        graph: &PackageGraph,
        members: impl IntoIterator<Item = PackageIndex>,
    ) -> AggregateId {
        let (stable, local) = split(graph, members);
        AggregateId::new(register_component(&mut self.stable, stable), register_component(&mut self.local, local))
    }

    /// Identity of `members` without registering anything.
    ///
    /// `None` when either partition would need a table entry that does not
    /// exist yet.
    #[must_use]
    pub fn lookup(
        &self,
        graph: &PackageGraph,
        members: impl IntoIterator<Item = PackageIndex>,
    ) -> Option<AggregateId> {
        let (stable, local) = split(graph, members);
        Some(AggregateId::new(find_component(&self.stable, stable)?, find_component(&self.local, local)?))
    }

    /// Preload the stable table from persisted entries, in order.
    ///
    /// Every entry is validated against `graph` before anything is inserted:
    /// members must be in range, strictly ascending, at least two, and all
    /// stable. Fails with [`AggError::CorruptLiveCache`] otherwise, leaving
    /// the tables untouched. Returns the number of seeded entries.
    pub fn seed_stable(
        &mut self,
        graph: &PackageGraph,
        entries: &[Vec<i32>],
    ) -> Result<usize, AggError> {
        if !self.stable.is_empty() {
            return Err(AggError::corrupt("stable table is already populated"));
        }

        let mut keys = Vec::with_capacity(entries.len());
        for (position, raw) in entries.iter().enumerate() {
            if raw.len() < 2 {
                return Err(AggError::corrupt(format!(
                    "stable aggregate {position} has {} members",
                    raw.len()
                )));
            }

            let mut members = Vec::with_capacity(raw.len());
            for &value in raw {
                let index = u32::try_from(value)
                    .ok()
                    .map(PackageIndex::new)
                    .filter(|index| graph.contains(*index))
                    .ok_or_else(|| {
                        AggError::corrupt(format!(
                            "stable aggregate {position} references unknown package {value}"
                        ))
                    })?;
                if graph.is_local_dependent(index) {
                    return Err(AggError::corrupt(format!(
                        "stable aggregate {position} contains local-dependent package {index}"
                    )));
                }
                if members.last().is_some_and(|last| *last >= index) {
                    return Err(AggError::corrupt(format!(
                        "stable aggregate {position} is not strictly ascending"
                    )));
                }
                members.push(index);
            }
            keys.push(AggregateKey::from_sorted(members));
        }

        for key in keys {
            let position = self.stable.len();
            if self.stable.get_or_insert(key).position() != position {
                self.stable = AggregateTable::new();
                return Err(AggError::corrupt(format!("stable aggregate {position} is a duplicate")));
            }
        }
        Ok(self.stable.len())
    }
}

/// Stable and local-dependent members of `members`, each sorted and deduplicated.
fn split(
    graph: &PackageGraph,
    members: impl IntoIterator<Item = PackageIndex>,
) -> (Vec<PackageIndex>, Vec<PackageIndex>) {
    let (mut stable, mut local): (Vec<_>, Vec<_>) =
        members.into_iter().partition(|p| graph.is_stable(*p));
    for part in [&mut stable, &mut local] {
        part.sort_unstable();
        part.dedup();
    }
    (stable, local)
}

fn register_component<H: AggregateHandle>(
    table: &mut AggregateTable<H>,
    members: Vec<PackageIndex>,
) -> IdComponent<H> {
    match members.len() {
        0 => IdComponent::Absent,
        1 => IdComponent::Single(members[0]),
        _ => IdComponent::Aggregate(table.get_or_insert(AggregateKey::from_sorted(members))),
    }
}

fn find_component<H: AggregateHandle>(
    table: &AggregateTable<H>,
    members: Vec<PackageIndex>,
) -> Option<IdComponent<H>> {
    match members.len() {
        0 => Some(IdComponent::Absent),
        1 => Some(IdComponent::Single(members[0])),
        _ => table.find(&AggregateKey::from_sorted(members)).map(IdComponent::Aggregate),
    }
}
