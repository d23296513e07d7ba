//! Graph fixtures.

use crate::graph::{PackageDescriptor, PackageGraph};

/// Descriptors of the reference scenario.
///
/// | index | package | kind                          |
/// |-------|---------|-------------------------------|
/// | 0     | Head    | stable                        |
/// | 1     | `p1`    | stable, requires Head         |
/// | 2     | `p2`    | local, requires Head          |
/// | 3     | `p3`    | local, requires `p1` and `p2` |
/// | 4     | Tail    | requires `p3`                 |
#[must_use]
pub fn scenario_descriptors() -> Vec<PackageDescriptor> {
    vec![
        PackageDescriptor::new("p1"),
        PackageDescriptor::local("p2"),
        PackageDescriptor::local("p3").with_requires([0, 1]),
    ]
}

/// Graph of [`scenario_descriptors`].
#[must_use]
pub fn scenario_graph() -> PackageGraph {
    PackageGraph::new(scenario_descriptors())
}

/// Build a graph from bit masks, one `(is_local, requires, children)` triple
/// per descriptor.
///
/// Bit `j` of `requires` (or `children`) makes descriptor `i` reference
/// descriptor `j`; bits at or above `i` are ignored, so any input yields a
/// valid topologically sorted graph. Useful with random inputs.
#[must_use]
pub fn graph_from_masks(layout: &[(bool, u32, u32)]) -> PackageGraph {
    let descriptors = layout
        .iter()
        .enumerate()
        .map(|(i, &(is_local, requires, children))| {
            let bits = |mask: u32| (0..i.min(32)).filter(move |j| mask & (1 << j) != 0);
            PackageDescriptor {
                name: format!("pkg{i}"),
                is_local,
                requires: bits(requires).collect(),
                children: bits(children).collect(),
            }
        })
        .collect();
    PackageGraph::new(descriptors)
}

/// Graph manifests in TOML form.
#[derive(Clone, Debug)]
pub struct GraphFixture {
    /// Manifest text.
    pub content: String,
}

impl GraphFixture {
    /// The reference scenario plus a stable consumer, written out of order.
    #[must_use]
    pub fn scenario() -> Self {
        Self {
            content: r#"
[[package]]
name = "p3"
local = true
requires = ["p1", "p2"]

[[package]]
name = "p1"

[[package]]
name = "p2"
local = true

[[package]]
name = "themes"
requires = ["p1"]
children = ["icons"]

[[package]]
name = "icons"
requires = ["p1"]
"#
            .trim_start()
            .to_string(),
        }
    }

    /// A layered graph with a wide stable base and a few local packages on top.
    #[must_use]
    pub fn layered() -> Self {
        let mut content = String::new();
        for i in 0..6 {
            content.push_str(&format!("[[package]]\nname = \"base{i}\"\n"));
            if i > 0 {
                content.push_str(&format!("requires = [\"base{}\"]\n", i - 1));
            }
            content.push('\n');
        }
        for i in 0..3 {
            content.push_str(&format!(
                "[[package]]\nname = \"app{i}\"\nlocal = {}\nrequires = [\"base5\", \"base{}\"]\n\n",
                i != 1,
                i * 2
            ));
        }
        Self {
            content,
        }
    }
}
