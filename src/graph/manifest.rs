//! Graph manifest loading.
//!
//! This is the upstream collaborator the core relies on: it turns a
//! declarative list of packages (in any order) into the validated,
//! topologically sorted [`PackageDescriptor`] sequence that
//! [`PackageGraph::new`] expects. Cycles, duplicate names and dangling
//! references are rejected here, so the graph model never sees them.
//!
//! # Format
//!
//! ```toml
//! [[package]]
//! name = "core"
//!
//! [[package]]
//! name = "theme"
//! local = true
//! requires = ["core"]
//!
//! [[package]]
//! name = "app"
//! requires = ["theme"]
//! children = ["widgets"]
//!
//! [[package]]
//! name = "widgets"
//! requires = ["core"]
//! ```

use anyhow::{Context, Result};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{PackageDescriptor, PackageGraph};
use crate::core::AggError;

/// One `[[package]]` entry of a graph manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPackage {
    /// Unique package name.
    pub name: String,
    /// Whether the package content is local and watchable.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub local: bool,
    /// Names of directly required packages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    /// Names of directly contained packages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

/// Parsed graph manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphManifest {
    /// Declared packages, in file order.
    #[serde(default, rename = "package")]
    pub packages: Vec<ManifestPackage>,
}

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is currently on the DFS stack.
    Gray,
    /// Node has been fully visited.
    Black,
}

impl GraphManifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read graph manifest: {}", path.display()))?;

        Self::parse(&content, &path.display().to_string()).map_err(anyhow::Error::from)
    }

    /// Parse manifest text. `file` is only used in error messages.
    pub fn parse(content: &str, file: &str) -> Result<Self, AggError> {
        toml::from_str(content).map_err(|e| AggError::ManifestParseError {
            file: file.to_string(),
            reason: e.to_string(),
        })
    }

    /// Validate the manifest and return descriptors in topological order.
    ///
    /// Dependencies and children always precede the packages that reference
    /// them. On a cycle the error names the full chain, e.g.
    /// `a → b → a`.
    pub fn to_descriptors(&self) -> Result<Vec<PackageDescriptor>, AggError> {
        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(self.packages.len());
        for (position, package) in self.packages.iter().enumerate() {
            if positions.insert(package.name.as_str(), position).is_some() {
                return Err(AggError::DuplicatePackage {
                    name: package.name.clone(),
                });
            }
        }

        // Edge direction: dependent → dependency
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(self.packages.len(), 0);
        let nodes: Vec<NodeIndex> =
            (0..self.packages.len()).map(|position| graph.add_node(position)).collect();

        for (position, package) in self.packages.iter().enumerate() {
            for name in package.requires.iter().chain(package.children.iter()) {
                let target = positions.get(name.as_str()).ok_or_else(|| {
                    AggError::UnknownPackage {
                        name: name.clone(),
                        referenced_by: package.name.clone(),
                    }
                })?;
                if !graph.contains_edge(nodes[position], nodes[*target]) {
                    graph.add_edge(nodes[position], nodes[*target], ());
                }
            }
        }

        self.detect_cycles(&graph)?;

        let sorted = toposort(&graph, None).map_err(|_| AggError::Other {
            message: "Failed to determine package order".to_string(),
        })?;

        // toposort lists dependents first; reverse so dependencies come first
        let order: Vec<usize> = sorted.into_iter().rev().map(|idx| graph[idx]).collect();
        let mut sorted_position = vec![0usize; order.len()];
        for (new_position, &old_position) in order.iter().enumerate() {
            sorted_position[old_position] = new_position;
        }

        let descriptors = order
            .iter()
            .map(|&old_position| {
                let package = &self.packages[old_position];
                let resolve = |names: &[String]| -> Vec<usize> {
                    names.iter().map(|n| sorted_position[positions[n.as_str()]]).collect()
                };
                PackageDescriptor {
                    name: package.name.clone(),
                    is_local: package.local,
                    requires: resolve(&package.requires),
                    children: resolve(&package.children),
                }
            })
            .collect();

        Ok(descriptors)
    }

    /// Validate and build the package graph in one step.
    pub fn to_graph(&self) -> Result<PackageGraph, AggError> {
        Ok(PackageGraph::new(self.to_descriptors()?))
    }

    fn detect_cycles(&self, graph: &DiGraph<usize, ()>) -> Result<(), AggError> {
        let mut colors = vec![Color::White; graph.node_count()];
        let mut path: Vec<NodeIndex> = Vec::new();

        for node in graph.node_indices() {
            if colors[node.index()] == Color::White
                && let Some(cycle) = Self::dfs_visit(graph, node, &mut colors, &mut path)
            {
                let chain = cycle
                    .iter()
                    .map(|idx| self.packages[graph[*idx]].name.as_str())
                    .collect::<Vec<_>>()
                    .join(" → ");
                return Err(AggError::CircularDependency {
                    chain,
                });
            }
        }

        Ok(())
    }

    fn dfs_visit(
        graph: &DiGraph<usize, ()>,
        node: NodeIndex,
        colors: &mut [Color],
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<NodeIndex>> {
        colors[node.index()] = Color::Gray;
        path.push(node);

        for neighbor in graph.neighbors(node) {
            match colors[neighbor.index()] {
                Color::Gray => {
                    let start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(neighbor);
                    return Some(cycle);
                }
                Color::White => {
                    if let Some(cycle) = Self::dfs_visit(graph, neighbor, colors, path) {
                        return Some(cycle);
                    }
                }
                Color::Black => {}
            }
        }

        path.pop();
        colors[node.index()] = Color::Black;
        None
    }
}
