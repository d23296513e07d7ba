//! Package graph model.
//!
//! A [`PackageGraph`] is built once from a validated, topologically sorted
//! list of [`PackageDescriptor`]s. Construction assigns every package a
//! permanent [`PackageIndex`] and adds two synthetic boundary packages:
//!
//! - **Head** at index 0. It has no requirements, and every regular package
//!   whose `requires` list is empty implicitly requires it, so Head is
//!   reachable from every package in the graph.
//! - **Tail** at the last index. It requires every regular package that no
//!   other package requires or contains, so its closure is the whole graph.
//!
//! Descriptor `i` becomes package `i + 1`. Because the input is
//! topologically sorted, dependencies and children always have a strictly
//! smaller index than their dependents, which lets the stable/local
//! classification be computed in a single forward pass.
//!
//! Validation (cycles, unknown names, duplicates) is the caller's job; see
//! [`manifest`] for the loader used by the CLI. This module only checks its
//! preconditions with `debug_assert!`.

pub mod manifest;


use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::constants::{HEAD_PACKAGE_NAME, TAIL_PACKAGE_NAME};

/// Permanent, 0-based position of a package in topological order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PackageIndex(u32);

impl PackageIndex {
    /// Index of the synthetic Head package.
    pub const HEAD: Self = Self(0);

    /// Wrap a raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw index.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// The raw index, for slice access.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PackageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Role of a package in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// Synthetic root at index 0.
    Head,
    /// Synthetic sink at the last index.
    Tail,
    /// A package contributed by the caller.
    Regular,
}

/// Input record for one regular package.
///
/// `requires` and `children` are positions in the descriptor sequence and
/// must point to earlier descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageDescriptor {
    /// Display name.
    pub name: String,
    /// Whether the package is bound to mutable, watchable content.
    pub is_local: bool,
    /// Direct predecessors.
    pub requires: Vec<usize>,
    /// Directly contained packages.
    pub children: Vec<usize>,
}

impl PackageDescriptor {
    /// A stable package with no requirements.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A local package with no requirements.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_local: true,
            ..Self::default()
        }
    }

    /// Set the direct predecessors.
    #[must_use]
    pub fn with_requires(mut self, requires: impl IntoIterator<Item = usize>) -> Self {
        self.requires = requires.into_iter().collect();
        self
    }

    /// Set the directly contained packages.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = usize>) -> Self {
        self.children = children.into_iter().collect();
        self
    }
}

/// Immutable node of a [`PackageGraph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    index: PackageIndex,
    kind: PackageKind,
    name: String,
    is_local: bool,
    requires: Vec<PackageIndex>,
    children: Vec<PackageIndex>,
    is_eventually_local_dependent: bool,
}

impl Package {
    /// Permanent index of this package.
    #[must_use]
    pub const fn index(&self) -> PackageIndex {
        self.index
    }

    /// Head, Tail or Regular.
    #[must_use]
    pub const fn kind(&self) -> PackageKind {
        self.kind
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this package itself is bound to watchable content.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.is_local
    }

    /// Direct predecessors, all with a smaller index.
    #[must_use]
    pub fn requires(&self) -> &[PackageIndex] {
        &self.requires
    }

    /// Directly contained packages, all with a smaller index.
    #[must_use]
    pub fn children(&self) -> &[PackageIndex] {
        &self.children
    }

    /// True iff this package or anything reachable from it is local.
    #[must_use]
    pub const fn is_eventually_local_dependent(&self) -> bool {
        self.is_eventually_local_dependent
    }

    /// Inverse of [`Package::is_eventually_local_dependent`].
    #[must_use]
    pub const fn is_stable(&self) -> bool {
        !self.is_eventually_local_dependent
    }

    /// `requires` followed by `children`.
    pub fn edges(&self) -> impl Iterator<Item = PackageIndex> + '_ {
        self.requires.iter().chain(self.children.iter()).copied()
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.index)
    }
}

/// Topologically ordered package graph with Head and Tail boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageGraph {
    packages: Vec<Package>,
}

impl PackageGraph {
    /// Build the graph from topologically sorted descriptors.
    ///
    /// Never fails: the descriptors are assumed to be validated upstream.
    /// Back references are checked with `debug_assert!` only.
    #[must_use]
    pub fn new(descriptors: Vec<PackageDescriptor>) -> Self {
        let count = descriptors.len();
        let tail_index = PackageIndex::new((count + 1) as u32);
        let mut packages = Vec::with_capacity(count + 2);
        let mut has_dependent = vec![false; count];

        packages.push(Package {
            index: PackageIndex::HEAD,
            kind: PackageKind::Head,
            name: HEAD_PACKAGE_NAME.to_string(),
            is_local: false,
            requires: Vec::new(),
            children: Vec::new(),
            is_eventually_local_dependent: false,
        });

        for (position, descriptor) in descriptors.into_iter().enumerate() {
            let index = PackageIndex::new((position + 1) as u32);
            let to_index = |refs: &[usize]| -> Vec<PackageIndex> {
                refs.iter()
                    .map(|&r| {
                        debug_assert!(
                            r < position,
                            "descriptor {position} references later descriptor {r}"
                        );
                        PackageIndex::new((r + 1) as u32)
                    })
                    .collect()
            };

            let mut requires = to_index(&descriptor.requires);
            let children = to_index(&descriptor.children);
            for &r in descriptor.requires.iter().chain(descriptor.children.iter()) {
                has_dependent[r] = true;
            }
            if requires.is_empty() {
                requires.push(PackageIndex::HEAD);
            }

            let is_eventually_local_dependent = descriptor.is_local
                || requires
                    .iter()
                    .chain(children.iter())
                    .any(|q| packages[q.as_usize()].is_eventually_local_dependent);

            packages.push(Package {
                index,
                kind: PackageKind::Regular,
                name: descriptor.name,
                is_local: descriptor.is_local,
                requires,
                children,
                is_eventually_local_dependent,
            });
        }

        let mut tail_requires: Vec<PackageIndex> = has_dependent
            .iter()
            .enumerate()
            .filter(|(_, has)| !**has)
            .map(|(position, _)| PackageIndex::new((position + 1) as u32))
            .collect();
        if tail_requires.is_empty() {
            tail_requires.push(PackageIndex::HEAD);
        }
        let tail_local = tail_requires.iter().any(|q| packages[q.as_usize()].is_eventually_local_dependent);

        packages.push(Package {
            index: tail_index,
            kind: PackageKind::Tail,
            name: TAIL_PACKAGE_NAME.to_string(),
            is_local: false,
            requires: tail_requires,
            children: Vec::new(),
            is_eventually_local_dependent: tail_local,
        });

        tracing::debug!(
            "Built package graph with {} packages ({} local-dependent)",
            packages.len(),
            packages.iter().filter(|p| p.is_eventually_local_dependent).count()
        );

        Self {
            packages,
        }
    }

    /// All packages in index order, Head first and Tail last.
    #[must_use]
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Package at `index`. Panics on an out-of-range index.
    #[must_use]
    pub fn package(&self, index: PackageIndex) -> &Package {
        &self.packages[index.as_usize()]
    }

    /// Package at `index`, if it exists.
    #[must_use]
    pub fn get(&self, index: PackageIndex) -> Option<&Package> {
        self.packages.get(index.as_usize())
    }

    /// First package with the given name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// The synthetic Head package.
    #[must_use]
    pub fn head(&self) -> &Package {
        &self.packages[0]
    }

    /// The synthetic Tail package.
    #[must_use]
    pub fn tail(&self) -> &Package {
        &self.packages[self.packages.len() - 1]
    }

    /// Number of packages including Head and Tail.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Always false: Head and Tail are present in every graph.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Whether `index` names a package of this graph.
    #[must_use]
    pub fn contains(&self, index: PackageIndex) -> bool {
        index.as_usize() < self.packages.len()
    }

    /// Whether `index` is local-dependent (itself local or reaching a local package).
    #[must_use]
    pub fn is_local_dependent(&self, index: PackageIndex) -> bool {
        self.packages[index.as_usize()].is_eventually_local_dependent
    }

    /// Whether `index` is stable (not local-dependent).
    #[must_use]
    pub fn is_stable(&self, index: PackageIndex) -> bool {
        !self.is_local_dependent(index)
    }

    /// Content fingerprint of the graph shape.
    ///
    /// Covers names, local flags, requires and children of every package.
    /// Format: `sha256:<lowercase hex>`.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for package in &self.packages {
            hasher.update(package.name.as_bytes());
            hasher.update([0u8, u8::from(package.is_local)]);
            for edge in &package.requires {
                hasher.update(edge.as_u32().to_le_bytes());
            }
            hasher.update([0xffu8]);
            for edge in &package.children {
                hasher.update(edge.as_u32().to_le_bytes());
            }
            hasher.update([0xfeu8]);
        }
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }

    /// Fingerprint of the stable part of the graph only.
    ///
    /// Stable packages can only reference stable packages, so two graphs
    /// with the same stable fingerprint agree on every stable reachable set.
    /// Edits to local packages leave it unchanged unless they shift stable
    /// indices.
    #[must_use]
    pub fn stable_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for package in self.packages.iter().filter(|p| p.is_stable()) {
            hasher.update(package.index.as_u32().to_le_bytes());
            hasher.update(package.name.as_bytes());
            hasher.update([0u8]);
            for edge in package.edges() {
                hasher.update(edge.as_u32().to_le_bytes());
            }
            hasher.update([0xffu8]);
        }
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }
}
