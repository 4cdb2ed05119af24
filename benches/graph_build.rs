//! Benchmarks for graph construction and risk scoring
//!
//! Builds synthetic requirements.txt trees of growing size so regressions
//! in breadth-first expansion or transitive-dependent counting show up.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chainscope::analysis::{GraphBuilder, InMemorySource};
use chainscope::config::AnalysisConfig;
use chainscope::parser::ParserRegistry;
use chainscope::risk::RiskAnalyzer;

/// Create a source where every component declares `fanout` children, down
/// to `depth` levels. Children are shared between siblings so the graph
/// has diamonds, not only a tree.
fn create_source(depth: usize, fanout: usize) -> InMemorySource {
    let level = |d: usize| -> Vec<String> { (0..fanout).map(|i| format!("pkg-{}-{}", d, i)).collect() };
    let requirements = |names: &[String]| -> String {
        names.iter().map(|n| format!("{}>=1.0\n", n)).collect()
    };

    let mut source = InMemorySource::new("bench-root")
        .with_root_manifest("requirements.txt", requirements(&level(1)));

    for d in 1..depth {
        let children = level(d + 1);
        for parent in level(d) {
            source = source.with_component_manifest(&parent, "requirements.txt", requirements(&children));
        }
    }

    source
}

fn config(max_components: usize) -> AnalysisConfig {
    AnalysisConfig {
        max_depth: None,
        max_components,
        ..AnalysisConfig::default()
    }
}

/// Benchmark graph construction from manifests
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");
    let registry = ParserRegistry::with_defaults();

    for fanout in [5, 10, 20].iter() {
        let source = create_source(6, *fanout);
        let cfg = config(10_000);

        group.bench_with_input(BenchmarkId::new("fanout", fanout), fanout, |b, _| {
            b.iter(|| {
                black_box(GraphBuilder::new(&cfg, &registry).build(&source, None).unwrap())
            });
        });
    }

    group.finish();
}

/// Benchmark risk scoring of an already built graph
fn bench_assess(c: &mut Criterion) {
    let mut group = c.benchmark_group("risk_assess");
    let registry = ParserRegistry::with_defaults();
    let analyzer = RiskAnalyzer::default();

    for fanout in [5, 10, 20].iter() {
        let source = create_source(6, *fanout);
        let cfg = config(10_000);
        let analysis = GraphBuilder::new(&cfg, &registry).build(&source, None).unwrap();

        group.bench_with_input(
            BenchmarkId::new("components", analysis.graph.node_count()),
            &analysis,
            |b, analysis| {
                b.iter(|| black_box(analyzer.assess(&analysis.graph)));
            },
        );
    }

    group.finish();
}

/// Benchmark the component cap cutting a large graph short
fn bench_capped_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build_capped");
    let registry = ParserRegistry::with_defaults();
    let source = create_source(6, 20);

    for cap in [30, 300, 3000].iter() {
        let cfg = config(*cap);

        group.bench_with_input(BenchmarkId::new("max_components", cap), cap, |b, _| {
            b.iter(|| {
                black_box(GraphBuilder::new(&cfg, &registry).build(&source, None).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_assess, bench_capped_build);
criterion_main!(benches);
