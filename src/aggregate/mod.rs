//! Aggregate identity.
//!
//! An [`AggregateKey`] is the canonical, order-independent identity of a
//! package set: the sorted, de-duplicated index sequence plus a precomputed
//! hash. Two keys are equal iff they denote the same mathematical set.
//!
//! An [`AggregateId`] describes any package set as two independent
//! components, one for its stable members and one for its local-dependent
//! members. Each component is an [`IdComponent`]: absent, a single package,
//! or a handle into the stable or local aggregate table. The handle types
//! are distinct ([`StableHandle`], [`LocalHandle`]), so a stable handle can
//! never be compared against a local one.

use rustc_hash::FxHasher;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::graph::PackageIndex;

/// Canonical identity of a package set.
#[derive(Clone, Debug)]
pub struct AggregateKey {
    indices: Box<[PackageIndex]>,
    hash: u64,
}

impl AggregateKey {
    /// Build a key from indices in any order; duplicates are dropped.
    pub fn new(indices: impl IntoIterator<Item = PackageIndex>) -> Self {
        let mut indices: Vec<PackageIndex> = indices.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();
        Self::from_sorted(indices)
    }

    /// Build a key from an already sorted, duplicate-free sequence.
    pub fn from_sorted(indices: Vec<PackageIndex>) -> Self {
        debug_assert!(
            indices.windows(2).all(|w| w[0] < w[1]),
            "aggregate key indices must be strictly increasing"
        );
        let hash = Self::compute_hash(&indices);
        Self {
            indices: indices.into_boxed_slice(),
            hash,
        }
    }

    fn compute_hash(indices: &[PackageIndex]) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write_usize(indices.len());
        for index in indices {
            hasher.write_u32(index.as_u32());
        }
        hasher.finish()
    }

    /// Members in ascending index order.
    #[must_use]
    pub fn indices(&self) -> &[PackageIndex] {
        &self.indices
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The precomputed hash of the index sequence.
    #[must_use]
    pub const fn hash_value(&self) -> u64 {
        self.hash
    }

    /// Whether `index` is a member.
    #[must_use]
    pub fn contains(&self, index: PackageIndex) -> bool {
        self.indices.binary_search(&index).is_ok()
    }
}

impl PartialEq for AggregateKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.indices == other.indices
    }
}

impl Eq for AggregateKey {}

impl Hash for AggregateKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, index) in self.indices.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", index.as_u32())?;
        }
        write!(f, "}}")
    }
}

/// Positional handle into one aggregate table.
pub trait AggregateHandle: Copy + Eq + Hash + fmt::Debug {
    /// Handle for the entry at `position`.
    fn from_position(position: usize) -> Self;

    /// Position of the entry in its table.
    fn position(self) -> usize;
}

/// Handle into the stable aggregate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StableHandle(u32);

/// Handle into the local aggregate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LocalHandle(u32);

macro_rules! impl_handle {
    ($ty:ident, $prefix:literal) => {
        impl $ty {
            /// Wrap a raw table position.
            #[must_use]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// The raw table position.
            #[must_use]
            pub const fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl AggregateHandle for $ty {
            fn from_position(position: usize) -> Self {
                Self(position as u32)
            }

            fn position(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

impl_handle!(StableHandle, "S");
impl_handle!(LocalHandle, "L");

/// One half of an [`AggregateId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum IdComponent<H> {
    /// No members of this kind.
    Absent,
    /// Exactly one member: its own package index.
    Single(PackageIndex),
    /// Two or more members registered in the table under this handle.
    Aggregate(H),
}

impl<H> IdComponent<H> {
    /// Whether the component has no members.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The handle, if this component references a table entry.
    #[must_use]
    pub fn handle(&self) -> Option<&H> {
        match self {
            Self::Aggregate(handle) => Some(handle),
            _ => None,
        }
    }
}

impl<H: fmt::Display> fmt::Display for IdComponent<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Single(index) => write!(f, "single {index}"),
            Self::Aggregate(handle) => write!(f, "aggregate {handle}"),
        }
    }
}

/// Identity of any package set, split into stable and local components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AggregateId {
    /// Identity of the stable members.
    pub stable: IdComponent<StableHandle>,
    /// Identity of the local-dependent members.
    pub local: IdComponent<LocalHandle>,
}

impl AggregateId {
    /// Identity of the empty set.
    pub const EMPTY: Self = Self {
        stable: IdComponent::Absent,
        local: IdComponent::Absent,
    };

    /// Combine two components.
    #[must_use]
    pub const fn new(stable: IdComponent<StableHandle>, local: IdComponent<LocalHandle>) -> Self {
        Self {
            stable,
            local,
        }
    }

    /// Whether both components are absent.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stable.is_absent() && self.local.is_absent()
    }

    /// Whether the set has both stable and local-dependent members.
    #[must_use]
    pub const fn is_hybrid(&self) -> bool {
        !self.stable.is_absent() && !self.local.is_absent()
    }
}

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stable: {}, local: {}", self.stable, self.local)
    }
}
