//! Export functionality for analysis results.
//!
//! This module provides exporters for outputting a finished analysis in
//! three shapes: a canonical JSON graph, a JSON report and a flat CSV of
//! per-component metrics.

pub mod csv;
pub mod json;

use std::io::{self, Write};

use chrono::{DateTime, Local};

use crate::analysis::DependencyAnalysis;
use crate::config::AnalysisConfig;
use crate::graph::DependencyGraph;
use crate::risk::RiskAssessment;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Nodes, edges and scores as JSON
    GraphJson,
    /// Statistics and risk summary as JSON
    ReportJson,
    /// One CSV row per component
    Csv,
}

impl ExportFormat {
    /// Every format, in the order a run writes them.
    pub const ALL: [ExportFormat; 3] = [Self::GraphJson, Self::ReportJson, Self::Csv];

    /// Output subdirectory for the format.
    pub fn category(&self) -> &'static str {
        match self {
            Self::GraphJson => "graphs",
            Self::ReportJson => "reports",
            Self::Csv => "metrics",
        }
    }

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::GraphJson | Self::ReportJson => "json",
            Self::Csv => "csv",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "graph" | "graph-json" => Ok(ExportFormat::GraphJson),
            "report" | "report-json" => Ok(ExportFormat::ReportJson),
            "csv" | "metrics" => Ok(ExportFormat::Csv),
            _ => Err(format!(
                "Unknown export format: '{}'. Valid formats: graph, report, csv",
                s
            )),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::GraphJson => write!(f, "graph"),
            ExportFormat::ReportJson => write!(f, "report"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Data container for export operations.
///
/// Borrows the finished analysis; exporters never modify it.
#[derive(Debug, Clone)]
pub struct ExportData<'a> {
    /// Project name
    pub project_name: String,
    /// Graph and builder bookkeeping
    pub analysis: &'a DependencyAnalysis,
    /// Risk scores for every component of the graph
    pub assessment: &'a RiskAssessment,
    /// Limits the graph was built with
    pub config: &'a AnalysisConfig,
    /// When the analysis finished
    pub generated_at: DateTime<Local>,
}

impl<'a> ExportData<'a> {
    /// Create new export data from analysis results.
    pub fn new(
        project_name: impl Into<String>,
        analysis: &'a DependencyAnalysis,
        assessment: &'a RiskAssessment,
        config: &'a AnalysisConfig,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            analysis,
            assessment,
            config,
            generated_at: Local::now(),
        }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.analysis.graph
    }
}

/// Trait for exporters.
pub trait Exporter {
    /// Export the data to the given writer.
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()>;
}

/// Export data in the specified format.
pub fn export<W: Write>(format: ExportFormat, data: &ExportData, writer: &mut W) -> io::Result<()> {
    match format {
        ExportFormat::GraphJson => json::GraphJsonExporter.export(data, writer),
        ExportFormat::ReportJson => json::ReportJsonExporter.export(data, writer),
        ExportFormat::Csv => csv::CsvMetricsExporter.export(data, writer),
    }
}

/// Export data to a string.
pub fn export_to_string(format: ExportFormat, data: &ExportData) -> io::Result<String> {
    let mut buffer = Vec::new();
    export(format, data, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("graph".parse::<ExportFormat>().unwrap(), ExportFormat::GraphJson);
        assert_eq!("REPORT".parse::<ExportFormat>().unwrap(), ExportFormat::ReportJson);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("metrics".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("markdown".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_export_format_layout() {
        assert_eq!(ExportFormat::GraphJson.category(), "graphs");
        assert_eq!(ExportFormat::ReportJson.category(), "reports");
        assert_eq!(ExportFormat::Csv.category(), "metrics");
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(format!("{}", ExportFormat::ReportJson), "report");
    }

    #[test]
    fn test_export_to_string_all_formats() {
        let (analysis, assessment, config) = fixtures::analyzed();
        let data = ExportData::new("demo", &analysis, &assessment, &config);

        for format in ExportFormat::ALL {
            let out = export_to_string(format, &data).unwrap();
            assert!(!out.is_empty(), "{} export is empty", format);
        }
    }
}
