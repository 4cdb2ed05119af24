//! Dependency graph implementation using petgraph.
//!
//! Provides a directed graph of software components rooted at the analyzed
//! repository. Edges point from the dependent component to its dependency
//! and carry the hop count from the root.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef, Reversed};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::parser::{DependencyKind, Ecosystem, ManifestEntry, ANY_VERSION};

/// Minimum number of transitive dependents for a component to count as
/// critical in [`GraphStats`].
pub const CRITICAL_DEPENDENTS: usize = 5;

/// Whether a component is the analyzed repository or one of its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentRole {
    /// The analyzed repository itself
    Root,
    /// A declared dependency at any depth
    #[default]
    Dependency,
}

impl ComponentRole {
    /// Importance of the role on the 0-10 scale used for impact scoring.
    pub fn criticality(&self) -> f64 {
        match self {
            Self::Root => 10.0,
            Self::Dependency => 5.0,
        }
    }
}

impl std::fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Dependency => write!(f, "dependency"),
        }
    }
}

/// Optional facts about a component that feed the risk formula.
///
/// Every field may be missing; the risk analyzer substitutes a neutral
/// value for gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentMetadata {
    /// Relative popularity in 0.0..=1.0
    pub popularity: Option<f64>,
    /// Days since the latest release
    pub release_age_days: Option<u32>,
    /// Number of publicly known vulnerabilities
    pub known_cves: Option<u32>,
}

impl ComponentMetadata {
    /// Returns true if no field is known.
    pub fn is_empty(&self) -> bool {
        self.popularity.is_none() && self.release_age_days.is_none() && self.known_cves.is_none()
    }
}

/// A node in the dependency graph.
///
/// Components are immutable once inserted; risk annotations live in the
/// separate assessment produced by the risk analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Identifier (e.g., "requests", "github.com/spf13/cobra")
    pub name: String,
    /// Declared version constraint, `*` when unconstrained
    pub version: String,
    /// Packaging system the component was declared in
    pub ecosystem: Ecosystem,
    /// Root or dependency
    pub role: ComponentRole,
    /// How the component was declared
    pub kind: DependencyKind,
    /// Hops from the root (root = 0)
    pub depth: usize,
    /// Manifest the component was discovered in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
    /// Optional risk inputs
    pub metadata: ComponentMetadata,
}

impl Component {
    /// Creates the root component for an analyzed repository.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chainscope::graph::{Component, ComponentRole};
    /// use chainscope::parser::Ecosystem;
    ///
    /// let root = Component::root("my-service", Ecosystem::Python);
    /// assert_eq!(root.role, ComponentRole::Root);
    /// assert_eq!(root.depth, 0);
    /// ```
    pub fn root(name: impl Into<String>, ecosystem: Ecosystem) -> Self {
        Self {
            name: name.into(),
            version: ANY_VERSION.to_string(),
            ecosystem,
            role: ComponentRole::Root,
            kind: DependencyKind::Production,
            depth: 0,
            manifest: None,
            metadata: ComponentMetadata::default(),
        }
    }

    /// Creates a dependency component at the given depth.
    pub fn dependency(
        name: impl Into<String>,
        version: impl Into<String>,
        ecosystem: Ecosystem,
        depth: usize,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ecosystem,
            role: ComponentRole::Dependency,
            kind: DependencyKind::Production,
            depth,
            manifest: None,
            metadata: ComponentMetadata::default(),
        }
    }

    /// Creates a dependency component from a parsed manifest entry.
    pub fn from_entry(entry: &ManifestEntry, ecosystem: Ecosystem, depth: usize) -> Self {
        Self::dependency(&entry.name, &entry.constraint, ecosystem, depth).with_kind(entry.kind)
    }

    /// Sets the declaration kind.
    pub fn with_kind(mut self, kind: DependencyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Records the manifest this component came from.
    pub fn with_manifest(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }

    /// Attaches risk metadata.
    pub fn with_metadata(mut self, metadata: ComponentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns true if this is the analyzed repository.
    pub fn is_root(&self) -> bool {
        self.role == ComponentRole::Root
    }
}

/// An edge in the dependency graph.
///
/// `depth` is the depth of the target as reached through this edge, which
/// is always the source depth plus one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Hops from the root to the target along this edge
    pub depth: usize,
    /// How the source declared the target
    pub kind: DependencyKind,
}

/// Rejected edge insertion.
///
/// Any of these indicates a builder or configuration bug and aborts the
/// current run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidEdgeError {
    #[error("Unknown component: {name}")]
    MissingEndpoint { name: String },

    #[error("Edge {from} -> {to} at depth {depth} exceeds maximum depth {max_depth}")]
    DepthExceeded {
        from: String,
        to: String,
        depth: usize,
        max_depth: usize,
    },

    #[error("Edge {from} -> {to} targets the root component")]
    RootTarget { from: String, to: String },

    #[error("Edge {from} -> {to} has depth {depth}, expected {expected}")]
    DepthMismatch {
        from: String,
        to: String,
        depth: usize,
        expected: usize,
    },
}

/// Summary statistics over a graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub total_components: usize,
    pub total_edges: usize,
    pub components_by_ecosystem: BTreeMap<Ecosystem, usize>,
    pub deepest_level: usize,
    pub average_dependencies_per_component: f64,
    pub critical_components: usize,
}

/// A directed graph of components rooted at the analyzed repository.
///
/// The graph uses petgraph's `DiGraph` internally, with nodes representing
/// components and edges representing "depends on" relationships. Edges
/// point from the dependent to its dependency.
///
/// Invariants maintained by every mutating method:
///
/// - components are unique by name and the first insertion wins
/// - the root has depth 0 and no incoming edges
/// - every edge has depth `source.depth + 1`, bounded by the maximum depth
///
/// # Example
///
/// ```rust
/// use chainscope::graph::{Component, DependencyGraph};
/// use chainscope::parser::Ecosystem;
///
/// let mut graph = DependencyGraph::new(Component::root("my-app", Ecosystem::Python), Some(2));
///
/// graph.add_component(Component::dependency("requests", ">=2.31", Ecosystem::Python, 1));
/// graph.add_component(Component::dependency("urllib3", "<3", Ecosystem::Python, 2));
///
/// graph.add_edge("my-app", "requests", 1).unwrap();
/// graph.add_edge("requests", "urllib3", 2).unwrap();
///
/// assert_eq!(graph.node_count(), 3);
/// assert_eq!(graph.edge_count(), 2);
/// assert!(graph.add_edge("my-app", "urllib3", 3).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// The underlying directed graph
    graph: DiGraph<Component, DependencyEdge>,
    /// Maps component names to their node indices for O(1) lookup
    node_indices: HashMap<String, NodeIndex>,
    /// Index of the root component
    root: NodeIndex,
    /// Deepest allowed edge, `None` for unbounded
    max_depth: Option<usize>,
}

impl DependencyGraph {
    /// Creates a graph holding only the root component.
    ///
    /// The root is forced to depth 0 with the root role regardless of the
    /// values passed in.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chainscope::graph::{Component, DependencyGraph};
    /// use chainscope::parser::Ecosystem;
    ///
    /// let graph = DependencyGraph::new(Component::root("my-app", Ecosystem::Go), None);
    /// assert_eq!(graph.node_count(), 1);
    /// assert_eq!(graph.root().name, "my-app");
    /// ```
    pub fn new(mut root: Component, max_depth: Option<usize>) -> Self {
        root.depth = 0;
        root.role = ComponentRole::Root;

        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        let name = root.name.clone();
        let idx = graph.add_node(root);
        node_indices.insert(name, idx);

        Self {
            graph,
            node_indices,
            root: idx,
            max_depth,
        }
    }

    /// The root component.
    pub fn root(&self) -> &Component {
        &self.graph[self.root]
    }

    /// The configured maximum edge depth.
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Adds a component if no component with the same name exists.
    ///
    /// # Returns
    ///
    /// `true` if the component was inserted, `false` if the name was
    /// already present (the existing component is left untouched).
    ///
    /// # Example
    ///
    /// ```rust
    /// use chainscope::graph::{Component, DependencyGraph};
    /// use chainscope::parser::Ecosystem;
    ///
    /// let mut graph = DependencyGraph::new(Component::root("app", Ecosystem::Node), None);
    /// assert!(graph.add_component(Component::dependency("react", "^18", Ecosystem::Node, 1)));
    /// assert!(!graph.add_component(Component::dependency("react", "^17", Ecosystem::Node, 2)));
    /// assert_eq!(graph.get_component("react").unwrap().version, "^18");
    /// ```
    pub fn add_component(&mut self, component: Component) -> bool {
        if self.node_indices.contains_key(&component.name) {
            return false;
        }

        let name = component.name.clone();
        let idx = self.graph.add_node(component);
        self.node_indices.insert(name, idx);
        true
    }

    /// Adds a "depends on" edge from `source` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidEdgeError`] if either endpoint is missing, the
    /// target is the root, `depth` exceeds the maximum depth, or `depth` is
    /// not the source depth plus one.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if the edge was added, `Ok(false)` if it already existed.
    pub fn add_edge(&mut self, source: &str, target: &str, depth: usize) -> Result<bool, InvalidEdgeError> {
        self.add_edge_with_kind(source, target, depth, DependencyKind::Production)
    }

    /// Adds an edge tagged with the declaration kind.
    pub fn add_edge_with_kind(
        &mut self,
        source: &str,
        target: &str,
        depth: usize,
        kind: DependencyKind,
    ) -> Result<bool, InvalidEdgeError> {
        let from_idx = self.index_of(source)?;
        let to_idx = self.index_of(target)?;

        if to_idx == self.root {
            return Err(InvalidEdgeError::RootTarget {
                from: source.to_string(),
                to: target.to_string(),
            });
        }

        if let Some(max_depth) = self.max_depth {
            if depth > max_depth {
                return Err(InvalidEdgeError::DepthExceeded {
                    from: source.to_string(),
                    to: target.to_string(),
                    depth,
                    max_depth,
                });
            }
        }

        let expected = self.graph[from_idx].depth + 1;
        if depth != expected {
            return Err(InvalidEdgeError::DepthMismatch {
                from: source.to_string(),
                to: target.to_string(),
                depth,
                expected,
            });
        }

        if self.graph.contains_edge(from_idx, to_idx) {
            return Ok(false);
        }

        self.graph.add_edge(from_idx, to_idx, DependencyEdge { depth, kind });
        Ok(true)
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex, InvalidEdgeError> {
        self.node_indices
            .get(name)
            .copied()
            .ok_or_else(|| InvalidEdgeError::MissingEndpoint {
                name: name.to_string(),
            })
    }

    /// Gets a component by name.
    pub fn get_component(&self, name: &str) -> Option<&Component> {
        self.node_indices
            .get(name)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Checks if a component exists in the graph.
    pub fn contains(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    /// All components in insertion order, root first.
    pub fn components(&self) -> Vec<&Component> {
        self.graph.node_weights().collect()
    }

    /// Components at exactly `depth`, in insertion order.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chainscope::graph::{Component, DependencyGraph};
    /// use chainscope::parser::Ecosystem;
    ///
    /// let mut graph = DependencyGraph::new(Component::root("app", Ecosystem::Rust), None);
    /// graph.add_component(Component::dependency("serde", "1", Ecosystem::Rust, 1));
    /// graph.add_component(Component::dependency("anyhow", "1", Ecosystem::Rust, 1));
    ///
    /// let names: Vec<_> = graph.components_at_depth(1).iter().map(|c| c.name.as_str()).collect();
    /// assert_eq!(names, vec!["serde", "anyhow"]);
    /// assert_eq!(graph.components_at_depth(0).len(), 1);
    /// ```
    pub fn components_at_depth(&self, depth: usize) -> Vec<&Component> {
        self.graph
            .node_weights()
            .filter(|component| component.depth == depth)
            .collect()
    }

    /// All edges as `(source, target, edge)` in insertion order.
    pub fn edges(&self) -> Vec<(&Component, &Component, &DependencyEdge)> {
        self.graph
            .edge_references()
            .map(|edge| (&self.graph[edge.source()], &self.graph[edge.target()], edge.weight()))
            .collect()
    }

    /// Direct dependencies of a component (outgoing edges).
    pub fn dependencies(&self, name: &str) -> Vec<&Component> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Direct dependents of a component (incoming edges).
    pub fn dependents(&self, name: &str) -> Vec<&Component> {
        self.neighbors(name, Direction::Incoming)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&Component> {
        let Some(&idx) = self.node_indices.get(name) else {
            return Vec::new();
        };

        // petgraph yields the most recent edge first
        let mut found: Vec<&Component> = self
            .graph
            .edges_directed(idx, direction)
            .filter_map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                self.graph.node_weight(other)
            })
            .collect();
        found.reverse();
        found
    }

    /// Every component that reaches `name` through one or more edges, in
    /// breadth-first order. The component itself is excluded.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chainscope::graph::{Component, DependencyGraph};
    /// use chainscope::parser::Ecosystem;
    ///
    /// let mut graph = DependencyGraph::new(Component::root("app", Ecosystem::Python), None);
    /// graph.add_component(Component::dependency("flask", "*", Ecosystem::Python, 1));
    /// graph.add_component(Component::dependency("werkzeug", "*", Ecosystem::Python, 2));
    /// graph.add_edge("app", "flask", 1).unwrap();
    /// graph.add_edge("flask", "werkzeug", 2).unwrap();
    ///
    /// let names: Vec<_> = graph
    ///     .transitive_dependents("werkzeug")
    ///     .iter()
    ///     .map(|c| c.name.as_str())
    ///     .collect();
    /// assert_eq!(names, vec!["flask", "app"]);
    /// ```
    pub fn transitive_dependents(&self, name: &str) -> Vec<&Component> {
        let Some(&start) = self.node_indices.get(name) else {
            return Vec::new();
        };

        let reversed = Reversed(&self.graph);
        let mut bfs = Bfs::new(reversed, start);
        let mut found = Vec::new();
        while let Some(idx) = bfs.next(reversed) {
            if idx != start {
                found.push(&self.graph[idx]);
            }
        }
        found
    }

    /// Every component reachable from `name`, in breadth-first order. The
    /// component itself is excluded.
    pub fn transitive_dependencies(&self, name: &str) -> Vec<&Component> {
        let Some(&start) = self.node_indices.get(name) else {
            return Vec::new();
        };

        let mut bfs = Bfs::new(&self.graph, start);
        let mut found = Vec::new();
        while let Some(idx) = bfs.next(&self.graph) {
            if idx != start {
                found.push(&self.graph[idx]);
            }
        }
        found
    }

    /// Components with at least `min_dependents` transitive dependents,
    /// most depended-upon first. Ties keep insertion order.
    pub fn critical_components(&self, min_dependents: usize) -> Vec<(&Component, usize)> {
        let mut critical: Vec<(&Component, usize)> = self
            .graph
            .node_weights()
            .map(|c| (c, self.transitive_dependents(&c.name).len()))
            .filter(|(_, count)| *count >= min_dependents)
            .collect();
        critical.sort_by(|a, b| b.1.cmp(&a.1));
        critical
    }

    /// Potential impact of compromising a component.
    ///
    /// The component's own criticality plus half the criticality of every
    /// transitive dependent. Unknown names score 0.
    pub fn impact_score(&self, name: &str) -> f64 {
        let Some(component) = self.get_component(name) else {
            return 0.0;
        };

        let inherited: f64 = self
            .transitive_dependents(name)
            .iter()
            .map(|c| c.role.criticality())
            .sum();
        component.role.criticality() + inherited * 0.5
    }

    /// Computes summary statistics.
    pub fn stats(&self) -> GraphStats {
        let mut components_by_ecosystem = BTreeMap::new();
        for component in self.graph.node_weights() {
            *components_by_ecosystem.entry(component.ecosystem).or_insert(0) += 1;
        }

        let total_components = self.node_count();
        let total_edges = self.edge_count();

        GraphStats {
            total_components,
            total_edges,
            components_by_ecosystem,
            deepest_level: self.graph.node_weights().map(|c| c.depth).max().unwrap_or(0),
            average_dependencies_per_component: if total_components == 0 {
                0.0
            } else {
                total_edges as f64 / total_components as f64
            },
            critical_components: self.critical_components(CRITICAL_DEPENDENTS).len(),
        }
    }

    /// Returns the number of components in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
