//! Graph module for dependency relationship modeling.
//!
//! This module provides the [`DependencyGraph`] struct, a depth-bounded
//! directed graph of [`Component`]s rooted at the analyzed repository.
//!
//! # Example
//!
//! ```rust
//! use chainscope::graph::{Component, DependencyGraph};
//! use chainscope::parser::Ecosystem;
//!
//! let mut graph = DependencyGraph::new(Component::root("my-app", Ecosystem::Node), Some(1));
//! graph.add_component(Component::dependency("react", "^18.2.0", Ecosystem::Node, 1));
//! graph.add_edge("my-app", "react", 1).unwrap();
//!
//! assert_eq!(graph.node_count(), 2);
//! assert_eq!(graph.edge_count(), 1);
//! ```

mod dependency_graph;

pub use dependency_graph::{
    Component, ComponentMetadata, ComponentRole, DependencyEdge, DependencyGraph, GraphStats,
    InvalidEdgeError, CRITICAL_DEPENDENTS,
};
