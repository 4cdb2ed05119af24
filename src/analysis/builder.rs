//! Depth-bounded breadth-first graph construction.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::metadata::MetadataCatalog;
use super::source::ManifestSource;
use crate::config::AnalysisConfig;
use crate::graph::{Component, DependencyGraph, InvalidEdgeError};
use crate::parser::types::file_name_of;
use crate::parser::{DependencyKind, Ecosystem, ManifestFile, ParseError, ParserRegistry};

/// Errors that abort an analysis run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Graph invariant violated: {0}")]
    InvalidEdge(#[from] InvalidEdgeError),

    #[error("max_components must be at least 1")]
    ZeroComponentLimit,
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// A manifest that could not be read or parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseFailure {
    pub path: PathBuf,
    /// Ecosystem of the parser that rejected the file, if one was picked
    pub ecosystem: Option<Ecosystem>,
    /// Component whose manifests were being read
    pub component: String,
    pub error: String,
}

/// What the manifests of one ecosystem contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EcosystemTally {
    /// Manifests attempted, failed ones included
    pub manifests: usize,
    /// Entries extracted after filtering
    pub entries: usize,
    /// New components added to the graph
    pub components: usize,
}

/// Everything the builder produced for one run.
#[derive(Debug, Clone)]
pub struct DependencyAnalysis {
    pub graph: DependencyGraph,
    pub failures: Vec<ParseFailure>,
    pub ecosystems: BTreeMap<Ecosystem, EcosystemTally>,
    /// Components discovered after the cap was reached
    pub dropped_components: usize,
}

impl DependencyAnalysis {
    /// Ecosystems whose manifests yielded no entries at all.
    pub fn empty_ecosystems(&self) -> Vec<Ecosystem> {
        self.ecosystems
            .iter()
            .filter(|(_, tally)| tally.entries == 0)
            .map(|(eco, _)| *eco)
            .collect()
    }

    /// Total manifests attempted.
    pub fn manifests_read(&self) -> usize {
        self.ecosystems.values().map(|t| t.manifests).sum()
    }
}

/// Builds a [`DependencyGraph`] by breadth-first expansion from the root.
///
/// Depth 1 holds the root's direct dependencies; deeper levels come from
/// the dependencies' own manifests. Each component is expanded at most
/// once, and the first declaration of a name wins.
///
/// # Example
///
/// ```rust
/// use chainscope::analysis::{GraphBuilder, InMemorySource};
/// use chainscope::config::AnalysisConfig;
/// use chainscope::parser::ParserRegistry;
///
/// let source = InMemorySource::new("demo")
///     .with_root_manifest("requirements.txt", "flask==3.0\nrequests>=2.31\n")
///     .with_component_manifest("flask", "requirements.txt", "werkzeug>=3.0\n");
///
/// let config = AnalysisConfig::default();
/// let registry = ParserRegistry::with_defaults();
/// let analysis = GraphBuilder::new(&config, &registry).build(&source, None).unwrap();
///
/// assert_eq!(analysis.graph.node_count(), 4);
/// assert_eq!(analysis.graph.components_at_depth(2)[0].name, "werkzeug");
/// ```
pub struct GraphBuilder<'a> {
    config: &'a AnalysisConfig,
    registry: &'a ParserRegistry,
    catalog: Option<&'a MetadataCatalog>,
}

/// Mutable state of one build.
struct BuildState {
    graph: DependencyGraph,
    failures: Vec<ParseFailure>,
    ecosystems: BTreeMap<Ecosystem, EcosystemTally>,
    dropped: usize,
    queue: VecDeque<String>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a AnalysisConfig, registry: &'a ParserRegistry) -> Self {
        Self {
            config,
            registry,
            catalog: None,
        }
    }

    /// Attaches metadata from `catalog` to every component created.
    pub fn with_catalog(mut self, catalog: &'a MetadataCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Runs the expansion.
    ///
    /// `project_name` names the root component; the source's own name is
    /// used when it is `None`.
    ///
    /// # Errors
    ///
    /// Manifest failures are recorded and skipped. Only a zero component
    /// limit or a violated graph invariant aborts the run.
    pub fn build(
        &self,
        source: &dyn ManifestSource,
        project_name: Option<&str>,
    ) -> AnalysisResult<DependencyAnalysis> {
        if self.config.max_components == 0 {
            return Err(AnalysisError::ZeroComponentLimit);
        }

        let name = project_name
            .map(str::to_string)
            .unwrap_or_else(|| source.project_name());

        let root_files = source.root_manifests(self.registry);
        let root_ecosystem = root_files
            .iter()
            .filter_map(|f| f.as_ref().ok())
            .find_map(|f| self.registry.parser_for(f.file_name()))
            .map(|p| p.ecosystem())
            .unwrap_or_default();

        let root = Component::root(&name, root_ecosystem)
            .with_metadata(self.metadata_for(&name));
        let mut state = BuildState {
            graph: DependencyGraph::new(root, self.config.max_depth),
            failures: Vec::new(),
            ecosystems: BTreeMap::new(),
            dropped: 0,
            queue: VecDeque::new(),
        };

        tracing::info!(
            project = %name,
            max_depth = ?self.config.max_depth,
            max_components = self.config.max_components,
            "building dependency graph"
        );

        if self.may_expand(0) {
            self.expand(&mut state, &name, root_files)?;
        }

        while let Some(current) = state.queue.pop_front() {
            if state.graph.node_count() >= self.config.max_components {
                break;
            }

            let Some(component) = state.graph.get_component(&current) else {
                continue;
            };
            if !self.may_expand(component.depth) {
                continue;
            }

            let files = source.component_manifests(component, self.registry);
            tracing::debug!(component = %current, manifests = files.len(), "expanding component");
            self.expand(&mut state, &current, files)?;
        }

        if state.dropped > 0 {
            tracing::warn!(
                dropped = state.dropped,
                max_components = self.config.max_components,
                "component limit reached, remaining dependencies dropped"
            );
        }

        tracing::info!(
            components = state.graph.node_count(),
            edges = state.graph.edge_count(),
            failures = state.failures.len(),
            "dependency graph complete"
        );

        Ok(DependencyAnalysis {
            graph: state.graph,
            failures: state.failures,
            ecosystems: state.ecosystems,
            dropped_components: state.dropped,
        })
    }

    fn may_expand(&self, depth: usize) -> bool {
        self.config.max_depth.map_or(true, |max| depth < max)
    }

    fn metadata_for(&self, name: &str) -> crate::graph::ComponentMetadata {
        self.catalog
            .map(|catalog| catalog.lookup(name))
            .unwrap_or_default()
    }

    fn ecosystem_of(&self, path: &Path) -> Option<Ecosystem> {
        self.registry
            .parser_for(file_name_of(path))
            .map(|p| p.ecosystem())
    }

    fn keep(&self, kind: DependencyKind, from_root: bool) -> bool {
        // Development dependencies of dependencies are never installed
        kind != DependencyKind::Development || (from_root && self.config.include_dev_dependencies)
    }

    fn expand(
        &self,
        state: &mut BuildState,
        parent: &str,
        files: Vec<Result<ManifestFile, ParseError>>,
    ) -> AnalysisResult<()> {
        let (parent_depth, from_root) = match state.graph.get_component(parent) {
            Some(c) => (c.depth, c.is_root()),
            None => return Ok(()),
        };
        let child_depth = parent_depth + 1;

        for file in files {
            let file = match file {
                Ok(file) => file,
                Err(err) => {
                    // An unreadable manifest still counts for its ecosystem
                    let ecosystem = match &err {
                        ParseError::Io { path, .. } => self.ecosystem_of(path),
                        _ => None,
                    };
                    if let Some(eco) = ecosystem {
                        state.ecosystems.entry(eco).or_default().manifests += 1;
                    }
                    self.record_failure(state, parent, None, ecosystem, err);
                    continue;
                }
            };

            let ecosystem = self.ecosystem_of(&file.path);
            if let Some(eco) = ecosystem {
                state.ecosystems.entry(eco).or_default().manifests += 1;
            }

            let parsed = match self.registry.parse(&file) {
                Ok(parsed) => parsed,
                Err(err) => {
                    self.record_failure(state, parent, Some(file.path), ecosystem, err);
                    continue;
                }
            };

            for entry in parsed.entries.iter().filter(|e| self.keep(e.kind, from_root)) {
                state.ecosystems.entry(parsed.ecosystem).or_default().entries += 1;

                if entry.name == parent || entry.name == state.graph.root().name {
                    continue;
                }

                if !state.graph.contains(&entry.name) {
                    if state.graph.node_count() >= self.config.max_components {
                        state.dropped += 1;
                        tracing::debug!(component = %entry.name, "dropped by component limit");
                        continue;
                    }

                    let component = Component::from_entry(entry, parsed.ecosystem, child_depth)
                        .with_manifest(&parsed.path)
                        .with_metadata(self.metadata_for(&entry.name));
                    state.graph.add_component(component);
                    state.ecosystems.entry(parsed.ecosystem).or_default().components += 1;
                    state.queue.push_back(entry.name.clone());
                }

                state
                    .graph
                    .add_edge_with_kind(parent, &entry.name, child_depth, entry.kind)?;
            }
        }

        Ok(())
    }

    fn record_failure(
        &self,
        state: &mut BuildState,
        component: &str,
        path: Option<PathBuf>,
        ecosystem: Option<Ecosystem>,
        err: ParseError,
    ) {
        let path = match (&err, path) {
            (_, Some(path)) => path,
            (ParseError::Io { path, .. }, None) => path.clone(),
            (_, None) => PathBuf::new(),
        };
        tracing::warn!(path = %path.display(), error = %err, "skipping manifest");

        if let Some(eco) = ecosystem {
            state.ecosystems.entry(eco).or_default();
        }
        state.failures.push(ParseFailure {
            path,
            ecosystem,
            component: component.to_string(),
            error: err.to_string(),
        });
    }
}
