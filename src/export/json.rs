//! JSON export implementation.
//!
//! Two documents are produced: the canonical graph (nodes, edges, scores)
//! and a report summarizing statistics, risk and builder bookkeeping.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;

use super::{ExportData, Exporter};
use crate::analysis::{EcosystemTally, ParseFailure};
use crate::graph::{Component, GraphStats};
use crate::parser::{DependencyKind, Ecosystem};
use crate::risk::{CriticalComponent, CriticalPath, RiskLevel, RiskScore};

/// Graph JSON exporter implementation.
pub struct GraphJsonExporter;

/// Report JSON exporter implementation.
pub struct ReportJsonExporter;

/// Serializable edge for JSON output.
#[derive(Serialize)]
struct JsonEdge<'a> {
    source: &'a str,
    target: &'a str,
    depth: usize,
    kind: DependencyKind,
}

/// Serializable score for JSON output.
#[derive(Serialize)]
struct JsonScore<'a> {
    component: &'a str,
    score: RiskScore,
    level: RiskLevel,
}

/// Root graph export structure.
#[derive(Serialize)]
struct JsonGraph<'a> {
    project: &'a str,
    nodes: Vec<&'a Component>,
    edges: Vec<JsonEdge<'a>>,
    scores: Vec<JsonScore<'a>>,
    overall_score: RiskScore,
}

/// Project info for JSON output.
#[derive(Serialize)]
struct JsonProject<'a> {
    name: &'a str,
    root_ecosystem: Ecosystem,
    generated_at: String,
    tool_version: &'static str,
}

/// Analysis parameters for JSON output. `max_depth` is null when unbounded.
#[derive(Serialize)]
struct JsonParameters<'a> {
    max_depth: Option<usize>,
    max_components: usize,
    include_dev_dependencies: bool,
    dependency_dirs: &'a [String],
}

#[derive(Serialize)]
struct JsonImpact<'a> {
    component: &'a str,
    impact: f64,
}

/// Risk summary for JSON output.
#[derive(Serialize)]
struct JsonRisk<'a> {
    overall_score: RiskScore,
    overall_level: RiskLevel,
    high_risk_threshold: f64,
    high_risk_components: usize,
    high_risk_percentage: f64,
    distribution: &'a BTreeMap<RiskLevel, usize>,
    high_risk: Vec<&'a str>,
    top_impact: Vec<JsonImpact<'a>>,
    critical_paths: &'a [CriticalPath],
}

/// Root report export structure.
#[derive(Serialize)]
struct JsonReport<'a> {
    project: JsonProject<'a>,
    parameters: JsonParameters<'a>,
    statistics: GraphStats,
    risk: JsonRisk<'a>,
    critical_min_dependents: usize,
    critical_components: &'a [CriticalComponent],
    ecosystems: &'a BTreeMap<Ecosystem, EcosystemTally>,
    empty_ecosystems: Vec<Ecosystem>,
    parse_failures: &'a [ParseFailure],
    dropped_components: usize,
}

fn write_pretty<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    writeln!(writer, "{}", json)
}

impl Exporter for GraphJsonExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        let graph = data.graph();

        let edges: Vec<JsonEdge> = graph
            .edges()
            .into_iter()
            .map(|(source, target, edge)| JsonEdge {
                source: &source.name,
                target: &target.name,
                depth: edge.depth,
                kind: edge.kind,
            })
            .collect();

        let scores: Vec<JsonScore> = data
            .assessment
            .components
            .iter()
            .map(|c| JsonScore {
                component: &c.name,
                score: c.score,
                level: c.level,
            })
            .collect();

        let export = JsonGraph {
            project: &data.project_name,
            nodes: graph.components(),
            edges,
            scores,
            overall_score: data.assessment.overall,
        };

        write_pretty(writer, &export)
    }
}

impl Exporter for ReportJsonExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        let graph = data.graph();
        let assessment = data.assessment;

        let risk = JsonRisk {
            overall_score: assessment.overall,
            overall_level: assessment.overall_level,
            high_risk_threshold: assessment.high_risk_threshold,
            high_risk_components: assessment.high_risk_count,
            high_risk_percentage: assessment.high_risk_percentage,
            distribution: &assessment.distribution,
            high_risk: assessment.high_risk().map(|c| c.name.as_str()).collect(),
            top_impact: assessment
                .top_impact
                .iter()
                .map(|(component, impact)| JsonImpact {
                    component,
                    impact: *impact,
                })
                .collect(),
            critical_paths: &assessment.critical_paths,
        };

        let export = JsonReport {
            project: JsonProject {
                name: &data.project_name,
                root_ecosystem: graph.root().ecosystem,
                generated_at: data.generated_at.to_rfc3339(),
                tool_version: env!("CARGO_PKG_VERSION"),
            },
            parameters: JsonParameters {
                max_depth: data.config.max_depth,
                max_components: data.config.max_components,
                include_dev_dependencies: data.config.include_dev_dependencies,
                dependency_dirs: &data.config.dependency_dirs,
            },
            statistics: graph.stats(),
            risk,
            critical_min_dependents: assessment.critical_min_dependents,
            critical_components: &assessment.critical_components,
            ecosystems: &data.analysis.ecosystems,
            empty_ecosystems: data.analysis.empty_ecosystems(),
            parse_failures: &data.analysis.failures,
            dropped_components: data.analysis.dropped_components,
        };

        write_pretty(writer, &export)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures;

    fn render<E: Exporter>(exporter: E) -> serde_json::Value {
        let (analysis, assessment, config) = fixtures::analyzed();
        let data = ExportData::new("demo", &analysis, &assessment, &config);
        let mut output = Vec::new();
        exporter.export(&data, &mut output).unwrap();
        serde_json::from_slice(&output).unwrap()
    }

    #[test]
    fn test_graph_json_shape() {
        let parsed = render(GraphJsonExporter);

        assert_eq!(parsed["project"], "demo");
        let nodes = parsed["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0]["name"], "demo");
        assert_eq!(nodes[0]["role"], "root");
        assert_eq!(nodes[1]["name"], "flask");
        assert_eq!(nodes[1]["version"], "==3.0");
        assert_eq!(nodes[1]["ecosystem"], "python");
        assert_eq!(nodes[1]["manifest"], "requirements.txt");

        let edges = parsed["edges"].as_array().unwrap();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[2]["source"], "flask");
        assert_eq!(edges[2]["target"], "werkzeug");
        assert_eq!(edges[2]["depth"], 2);

        assert_eq!(parsed["scores"].as_array().unwrap().len(), 4);
        let overall = parsed["overall_score"].as_f64().unwrap();
        assert!((0.0..=10.0).contains(&overall));
    }

    #[test]
    fn test_report_json_sections() {
        let parsed = render(ReportJsonExporter);

        assert_eq!(parsed["project"]["name"], "demo");
        assert_eq!(parsed["project"]["root_ecosystem"], "python");
        assert_eq!(parsed["parameters"]["max_depth"], 2);
        assert_eq!(parsed["parameters"]["max_components"], 30);
        assert_eq!(parsed["statistics"]["total_components"], 4);
        assert_eq!(parsed["statistics"]["components_by_ecosystem"]["python"], 4);
        assert_eq!(parsed["risk"]["distribution"]["critical"], 0);
        assert_eq!(parsed["dropped_components"], 0);

        assert_eq!(parsed["empty_ecosystems"], serde_json::json!(["node"]));
        let failures = parsed["parse_failures"].as_array().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0]["path"], "package.json");
        assert_eq!(parsed["ecosystems"]["python"]["components"], 3);
    }

    #[test]
    fn test_report_json_critical_sections() {
        let parsed = render(ReportJsonExporter);

        assert_eq!(parsed["critical_min_dependents"], 1);
        let critical = parsed["critical_components"].as_array().unwrap();
        assert_eq!(critical.len(), 3);
        assert_eq!(critical[0]["component"], "werkzeug");
        assert_eq!(critical[0]["transitive_dependents"], 2);

        // werkzeug: 5 + 0.5 * (5 + 10) stays below the path threshold
        assert_eq!(parsed["risk"]["critical_paths"], serde_json::json!([]));
    }
}
