//! Property-based tests for parsing, graph limits and score ranges

use proptest::prelude::*;

use chainscope::analysis::{DependencyAnalysis, GraphBuilder, InMemorySource, MetadataCatalog};
use chainscope::config::AnalysisConfig;
use chainscope::graph::ComponentMetadata;
use chainscope::parser::{ManifestFile, ParserRegistry};
use chainscope::risk::{RiskAnalyzer, RiskWeights, MAX_RISK};

const PACKAGES: usize = 10;

const MANIFEST_NAMES: [&str; 8] = [
    "requirements.txt",
    "requirements-dev.txt",
    "pyproject.toml",
    "package.json",
    "Cargo.toml",
    "go.mod",
    "pom.xml",
    "build.gradle",
];

fn requirement_line() -> impl Strategy<Value = String> {
    prop_oneof![
        r"[a-zA-Z][a-zA-Z0-9_.-]{0,10}((==|>=|<=|~=|!=|<|>)[0-9]{1,2}(\.[0-9]{1,2}){0,2})?",
        r"[a-z]{1,6}\[[a-z,]{0,6}\]?[<>=]{0,2}[0-9.]{0,4}",
        r"# [ -~]{0,20}",
        r"-r [a-z]{1,8}\.txt",
        r"\PC{0,24}",
    ]
}

fn package(i: usize) -> String {
    format!("pkg{}", i)
}

fn requirements(children: &[usize]) -> String {
    children.iter().map(|c| format!("{}\n", package(*c))).collect()
}

/// A random dependency web over a fixed pool of packages. Cycles, self
/// references and repeated children are all possible.
fn dependency_web() -> impl Strategy<Value = (Vec<usize>, Vec<Vec<usize>>)> {
    (
        prop::collection::vec(0..PACKAGES, 1..5),
        prop::collection::vec(prop::collection::vec(0..PACKAGES, 0..4), PACKAGES),
    )
}

fn source_for(root: &[usize], children: &[Vec<usize>]) -> InMemorySource {
    let mut source = InMemorySource::new("app").with_root_manifest("requirements.txt", requirements(root));
    for (i, deps) in children.iter().enumerate() {
        source = source.with_component_manifest(package(i), "requirements.txt", requirements(deps));
    }
    source
}

fn metadata() -> impl Strategy<Value = ComponentMetadata> {
    (
        prop::option::of(prop::num::f64::ANY),
        prop::option::of(any::<u32>()),
        prop::option::of(any::<u32>()),
    )
        .prop_map(|(popularity, release_age_days, known_cves)| ComponentMetadata {
            popularity,
            release_age_days,
            known_cves,
        })
}

fn weights() -> impl Strategy<Value = RiskWeights> {
    prop::array::uniform6(0.0..10.0f64).prop_map(|w| RiskWeights {
        base: w[0],
        criticality: w[1],
        dependency: w[2],
        staleness: w[3],
        vulnerability: w[4],
        popularity: w[5],
    })
}

fn build(config: &AnalysisConfig, source: &InMemorySource, catalog: &MetadataCatalog) -> DependencyAnalysis {
    let registry = ParserRegistry::with_defaults();
    GraphBuilder::new(config, &registry)
        .with_catalog(catalog)
        .build(source, None)
        .unwrap()
}

proptest! {
    #[test]
    fn test_parsing_is_deterministic(
        file_name in prop::sample::select(MANIFEST_NAMES.to_vec()),
        lines in prop::collection::vec(requirement_line(), 0..12),
    ) {
        let file = ManifestFile::new(file_name, lines.join("\n"));
        let registry = ParserRegistry::with_defaults();

        let first = registry.parse(&file).map(|p| p.entries).map_err(|e| e.to_string());
        let second = registry.parse(&file).map(|p| p.entries).map_err(|e| e.to_string());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_graph_respects_depth_and_component_limits(
        (root, children) in dependency_web(),
        max_depth in prop::option::of(0usize..5),
        max_components in 1usize..15,
    ) {
        let config = AnalysisConfig {
            max_depth,
            max_components,
            ..AnalysisConfig::default()
        };
        let analysis = build(&config, &source_for(&root, &children), &MetadataCatalog::new());
        let graph = &analysis.graph;

        prop_assert!(graph.node_count() <= max_components);
        prop_assert_eq!(graph.root().depth, 0);
        for (source, target, edge) in graph.edges() {
            prop_assert_eq!(edge.depth, source.depth + 1);
            prop_assert!(!target.is_root());
            if let Some(max) = max_depth {
                prop_assert!(edge.depth <= max);
            }
        }
        if let Some(max) = max_depth {
            prop_assert!(graph.components().iter().all(|c| c.depth <= max));
        }
    }

    #[test]
    fn test_scores_stay_in_range(
        (root, children) in dependency_web(),
        entries in prop::collection::vec(metadata(), PACKAGES),
        weights in weights(),
    ) {
        let mut catalog = MetadataCatalog::new();
        for (i, meta) in entries.into_iter().enumerate() {
            catalog.insert(package(i), meta);
        }
        let config = AnalysisConfig {
            max_depth: None,
            ..AnalysisConfig::default()
        };
        let analysis = build(&config, &source_for(&root, &children), &catalog);

        let assessment = RiskAnalyzer::new(weights, 7.0).assess(&analysis.graph);
        prop_assert!((0.0..=MAX_RISK).contains(&assessment.overall.value()));
        for component in &assessment.components {
            prop_assert!((0.0..=MAX_RISK).contains(&component.score.value()));
        }
    }
}
