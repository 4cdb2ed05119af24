//! End-to-end runs over a checkout on disk: parse, build, score, write.

use std::fs;
use std::path::Path;

use chainscope::analysis::{DirectorySource, GraphBuilder, MetadataCatalog};
use chainscope::config::{AnalysisConfig, Settings};
use chainscope::export::ExportData;
use chainscope::output::OutputManager;
use chainscope::parser::{Ecosystem, ParserRegistry};
use chainscope::risk::{RiskAnalyzer, MAX_RISK};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A Python service with vendored dependencies, one of them carrying a
/// truncated package.json.
fn checkout(root: &Path) {
    write(
        root,
        "requirements.txt",
        "# runtime\nflask==3.0.0\nrequests>=2.31,<3\n",
    );
    write(root, "requirements-dev.txt", "pytest>=8\n");
    write(
        root,
        "vendor/flask/pyproject.toml",
        "[project]\nname = \"flask\"\ndependencies = [\"werkzeug>=3.0\", \"jinja2>=3.1\", \"click>=8.1\"]\n",
    );
    write(root, "vendor/werkzeug/requirements.txt", "markupsafe>=2.1\n");
    write(root, "vendor/requests/requirements.txt", "urllib3<3\nidna\ncertifi\n");
    write(root, "vendor/requests/package.json", "{ \"dependencies\": ");
}

fn run(root: &Path, config: &AnalysisConfig, out: &mut OutputManager) -> chainscope::output::RunFiles {
    let registry = ParserRegistry::with_defaults();
    let source = DirectorySource::new(root, config.dependency_dirs.clone()).unwrap();
    let analysis = GraphBuilder::new(config, &registry)
        .build(&source, Some("service"))
        .unwrap();
    let assessment = RiskAnalyzer::default().assess(&analysis.graph);
    let data = ExportData::new("service", &analysis, &assessment, config);
    out.write_run(&data).unwrap()
}

#[test]
fn test_full_pipeline_writes_three_outputs() {
    let repo = tempfile::tempdir().unwrap();
    let outputs = tempfile::tempdir().unwrap();
    checkout(repo.path());

    let config = AnalysisConfig::default();
    let mut manager = OutputManager::new(outputs.path());
    let files = run(repo.path(), &config, &mut manager);

    let graph: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&files.graph).unwrap()).unwrap();
    let names: Vec<&str> = graph["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "service", "pytest", "flask", "requests", "werkzeug", "jinja2", "click", "urllib3",
            "idna", "certifi"
        ]
    );
    // markupsafe sits at depth 3, beyond the default limit of 2
    assert!(!names.contains(&"markupsafe"));
    assert!(graph["edges"]
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["depth"].as_u64().unwrap() <= 2));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&files.report).unwrap()).unwrap();
    assert_eq!(report["project"]["root_ecosystem"], "python");
    assert_eq!(report["parse_failures"].as_array().unwrap().len(), 1);
    assert_eq!(
        report["parse_failures"][0]["path"],
        "vendor/requests/package.json"
    );
    assert_eq!(report["parse_failures"][0]["component"], "requests");
    assert_eq!(report["empty_ecosystems"], serde_json::json!(["node"]));
    let overall = report["risk"]["overall_score"].as_f64().unwrap();
    assert!((0.0..=MAX_RISK).contains(&overall));
    // flask and requests each have the root as a dependent
    let critical = report["critical_components"].as_array().unwrap();
    assert!(critical.iter().any(|c| c["component"] == "flask"));
    assert!(report["risk"]["critical_paths"].is_array());

    let csv = fs::read_to_string(&files.metrics).unwrap();
    assert_eq!(csv.lines().count(), names.len() + 1);
    assert!(csv.contains("\">=2.31,<3\""));

    assert_eq!(manager.list_projects(), vec!["service"]);
}

#[test]
fn test_max_depth_zero_yields_single_component() {
    let repo = tempfile::tempdir().unwrap();
    checkout(repo.path());

    let config = AnalysisConfig {
        max_depth: Some(0),
        ..AnalysisConfig::default()
    };
    let registry = ParserRegistry::with_defaults();
    let source = DirectorySource::new(repo.path(), config.dependency_dirs.clone()).unwrap();
    let analysis = GraphBuilder::new(&config, &registry).build(&source, None).unwrap();

    assert_eq!(analysis.graph.node_count(), 1);
    assert_eq!(analysis.graph.edge_count(), 0);
    assert_eq!(analysis.graph.root().depth, 0);
    // The root ecosystem is still detected without expanding
    assert_eq!(analysis.graph.root().ecosystem, Ecosystem::Python);
}

#[test]
fn test_component_cap_and_unbounded_depth() {
    let repo = tempfile::tempdir().unwrap();
    checkout(repo.path());
    let registry = ParserRegistry::with_defaults();

    let unbounded = AnalysisConfig {
        max_depth: None,
        ..AnalysisConfig::default()
    };
    let source = DirectorySource::new(repo.path(), unbounded.dependency_dirs.clone()).unwrap();
    let analysis = GraphBuilder::new(&unbounded, &registry).build(&source, None).unwrap();
    assert_eq!(analysis.graph.get_component("markupsafe").unwrap().depth, 3);

    for cap in [1, 3, 5] {
        let capped = AnalysisConfig {
            max_components: cap,
            ..unbounded.clone()
        };
        let analysis = GraphBuilder::new(&capped, &registry).build(&source, None).unwrap();
        assert_eq!(analysis.graph.node_count(), cap);
        assert!(analysis.dropped_components > 0);
    }
}

#[test]
fn test_rerun_keeps_earlier_outputs() {
    let repo = tempfile::tempdir().unwrap();
    let outputs = tempfile::tempdir().unwrap();
    checkout(repo.path());

    let config = AnalysisConfig::default();
    let mut manager = OutputManager::new(outputs.path());
    let first = run(repo.path(), &config, &mut manager);
    let first_report = fs::read_to_string(&first.report).unwrap();

    let second = run(repo.path(), &config, &mut manager);
    assert!(second.stamp > first.stamp);
    for path in first.paths() {
        assert!(path.exists());
    }
    assert_eq!(fs::read_to_string(&first.report).unwrap(), first_report);

    let files = manager.project_files("service");
    assert_eq!(files["graphs"].len(), 2);
    assert_eq!(files["reports"].len(), 2);
    assert_eq!(files["metrics"].len(), 2);
}

#[test]
fn test_metadata_extremes_stay_in_range() {
    let repo = tempfile::tempdir().unwrap();
    checkout(repo.path());

    let catalog = MetadataCatalog::from_json_str(
        r#"{
            "flask": { "popularity": 0.0, "release_age_days": 4000000000, "known_cves": 4000000000 },
            "requests": { "popularity": 1.0, "release_age_days": 0, "known_cves": 0 }
        }"#,
    )
    .unwrap();

    let settings = Settings::default();
    let registry = ParserRegistry::with_defaults();
    let source = DirectorySource::new(repo.path(), settings.analysis.dependency_dirs.clone()).unwrap();
    let analysis = GraphBuilder::new(&settings.analysis, &registry)
        .with_catalog(&catalog)
        .build(&source, None)
        .unwrap();

    let assessment = RiskAnalyzer::new(settings.risk.weights, settings.risk.high_risk_threshold)
        .assess(&analysis.graph);
    assert!((0.0..=MAX_RISK).contains(&assessment.overall.value()));
    for component in &assessment.components {
        assert!((0.0..=MAX_RISK).contains(&component.score.value()));
    }
    assert!(assessment.get("flask").unwrap().score > assessment.get("requests").unwrap().score);
}
