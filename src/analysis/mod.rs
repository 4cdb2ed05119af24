//! Dependency graph construction for chainscope.
//!
//! This module turns manifests into a [`DependencyGraph`](crate::graph::DependencyGraph):
//!
//! - [`ManifestSource`] supplies manifests, either from a local checkout
//!   ([`DirectorySource`]) or from memory ([`InMemorySource`])
//! - [`GraphBuilder`] expands the graph breadth-first under the depth and
//!   component limits of [`AnalysisConfig`](crate::config::AnalysisConfig)
//! - [`MetadataCatalog`] attaches optional risk metadata to components
//!
//! # Example
//!
//! ```no_run
//! use chainscope::analysis::{DirectorySource, GraphBuilder};
//! use chainscope::config::AnalysisConfig;
//! use chainscope::parser::ParserRegistry;
//!
//! let config = AnalysisConfig::default();
//! let registry = ParserRegistry::with_defaults();
//! let source = DirectorySource::new("./my-repo", config.dependency_dirs.clone()).unwrap();
//!
//! let analysis = GraphBuilder::new(&config, &registry).build(&source, None).unwrap();
//! println!("{} components", analysis.graph.node_count());
//! ```

pub mod builder;
pub mod metadata;
pub mod source;

// Re-export main types for convenience
pub use builder::{
    AnalysisError, AnalysisResult, DependencyAnalysis, EcosystemTally, GraphBuilder, ParseFailure,
};
pub use metadata::MetadataCatalog;
pub use source::{DirectorySource, InMemorySource, ManifestSource};
