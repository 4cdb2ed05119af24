//! CSV export implementation.
//!
//! One row per component, in graph order, for spreadsheet use. Missing
//! metadata is written as an empty field.

use super::{ExportData, Exporter};
use std::io::{self, Write};

/// Column names of the metrics file.
pub const HEADER: &str = "component,version,ecosystem,role,kind,depth,dependencies,dependents,\
popularity,release_age_days,known_cves,base_risk,criticality_risk,dependency_risk,\
staleness_risk,vulnerability_risk,popularity_risk,risk_score,risk_level,impact_score";

/// CSV exporter implementation.
pub struct CsvMetricsExporter;

impl CsvMetricsExporter {
    /// Escape a field value for CSV format.
    ///
    /// Wraps the value in quotes if it contains commas, quotes, or line breaks.
    fn escape_field(value: &str) -> String {
        if value.contains([',', '"', '\n', '\r']) {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }

    fn optional<T: ToString>(value: Option<T>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }
}

impl Exporter for CsvMetricsExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        let graph = data.graph();

        writeln!(writer, "{}", HEADER)?;

        for component in graph.components() {
            let Some(risk) = data.assessment.get(&component.name) else {
                tracing::warn!(component = %component.name, "no risk score, row skipped");
                continue;
            };
            let metadata = &component.metadata;
            let factors = &risk.factors;

            writeln!(
                writer,
                "{},{},{},{},{},{},{},{},{},{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{},{},{:.2}",
                Self::escape_field(&component.name),
                Self::escape_field(&component.version),
                component.ecosystem,
                component.role,
                component.kind,
                component.depth,
                graph.dependencies(&component.name).len(),
                graph.dependents(&component.name).len(),
                Self::optional(metadata.popularity.map(|p| format!("{:.2}", p))),
                Self::optional(metadata.release_age_days),
                Self::optional(metadata.known_cves),
                factors.base,
                factors.criticality,
                factors.dependency,
                factors.staleness,
                factors.vulnerability,
                factors.popularity,
                risk.score,
                risk.level,
                risk.impact,
            )?;
        }

        Ok(())
    }
}
