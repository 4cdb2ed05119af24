//! Per-component risk factors and the project-wide assessment.

use std::collections::BTreeMap;

use serde::Serialize;

use super::score::{RiskLevel, RiskScore, RiskWeights, MAX_RISK};
use crate::graph::{Component, ComponentRole, DependencyGraph};

/// Factor value used when the metadata behind a factor is missing.
pub const NEUTRAL_FACTOR: f64 = 5.0;

/// Score at or above which a component counts as high risk.
pub const DEFAULT_HIGH_RISK_THRESHOLD: f64 = 7.0;

/// Days of release age per staleness point (ten points at two years).
const DAYS_PER_STALENESS_POINT: f64 = 73.0;

/// Vulnerability points per known CVE.
const RISK_PER_CVE: f64 = 2.5;

/// Number of components listed in [`RiskAssessment::top_impact`].
const TOP_IMPACT: usize = 5;

/// Transitive dependents needed to appear in
/// [`RiskAssessment::critical_components`].
pub const DEFAULT_CRITICAL_MIN_DEPENDENTS: usize = 1;

/// Impact above which a component starts a critical attack path.
pub const CRITICAL_PATH_IMPACT: f64 = 15.0;

/// Number of paths listed in [`RiskAssessment::critical_paths`].
const TOP_CRITICAL_PATHS: usize = 5;

/// The six factors behind a component's score, each in `[0, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskFactors {
    pub base: f64,
    pub criticality: f64,
    pub dependency: f64,
    pub staleness: f64,
    pub vulnerability: f64,
    pub popularity: f64,
}

impl RiskFactors {
    /// Derives factors from a component and its transitive dependent count.
    pub fn for_component(component: &Component, transitive_dependents: usize) -> Self {
        let metadata = &component.metadata;

        let base = match component.role {
            ComponentRole::Root => 9.0,
            ComponentRole::Dependency => 6.0,
        };

        let staleness = metadata
            .release_age_days
            .map(|days| f64::from(days) / DAYS_PER_STALENESS_POINT)
            .map_or(NEUTRAL_FACTOR, cap);

        let vulnerability = metadata
            .known_cves
            .map(|cves| f64::from(cves) * RISK_PER_CVE)
            .map_or(NEUTRAL_FACTOR, cap);

        let popularity = metadata
            .popularity
            .filter(|p| !p.is_nan())
            .map(|p| (1.0 - p.clamp(0.0, 1.0)) * MAX_RISK)
            .unwrap_or(NEUTRAL_FACTOR);

        Self {
            base,
            criticality: component.role.criticality(),
            dependency: cap(transitive_dependents as f64),
            staleness,
            vulnerability,
            popularity,
        }
    }

    /// Weighted sum of the factors, clamped to `[0, 10]`.
    pub fn score(&self, weights: &RiskWeights) -> RiskScore {
        RiskScore::new(
            self.base * weights.base
                + self.criticality * weights.criticality
                + self.dependency * weights.dependency
                + self.staleness * weights.staleness
                + self.vulnerability * weights.vulnerability
                + self.popularity * weights.popularity,
        )
    }
}

fn cap(value: f64) -> f64 {
    value.min(MAX_RISK)
}

/// Risk of one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentRisk {
    pub name: String,
    pub factors: RiskFactors,
    pub score: RiskScore,
    pub level: RiskLevel,
    /// Potential impact of compromising the component
    pub impact: f64,
}

/// A component depended upon by others, with its transitive dependent count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriticalComponent {
    pub component: String,
    pub transitive_dependents: usize,
}

/// How far a compromise of one high-impact component propagates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalPath {
    pub component: String,
    pub impact: f64,
    pub total_dependents: usize,
    /// Root components among the transitive dependents
    pub roots_affected: Vec<String>,
}

/// Risk of a whole dependency graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    /// Per-component risk in graph insertion order
    pub components: Vec<ComponentRisk>,
    /// Mean of the component scores
    pub overall: RiskScore,
    pub overall_level: RiskLevel,
    pub high_risk_threshold: f64,
    pub high_risk_count: usize,
    pub high_risk_percentage: f64,
    /// Component count per level; every level is present
    pub distribution: BTreeMap<RiskLevel, usize>,
    /// Highest impact components, most impactful first
    pub top_impact: Vec<(String, f64)>,
    pub critical_min_dependents: usize,
    /// Components with at least `critical_min_dependents` transitive
    /// dependents, most depended-upon first
    pub critical_components: Vec<CriticalComponent>,
    /// Components whose impact exceeds [`CRITICAL_PATH_IMPACT`], most
    /// impactful first
    pub critical_paths: Vec<CriticalPath>,
}

impl RiskAssessment {
    pub fn get(&self, name: &str) -> Option<&ComponentRisk> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Components at or above the high-risk threshold.
    pub fn high_risk(&self) -> impl Iterator<Item = &ComponentRisk> {
        self.components
            .iter()
            .filter(move |c| c.score.value() >= self.high_risk_threshold)
    }
}

/// Applies the weighted risk formula to a graph.
///
/// Assessment is a pure function of the graph and the weights; running it
/// twice yields identical results.
///
/// # Example
///
/// ```rust
/// use chainscope::graph::{Component, DependencyGraph};
/// use chainscope::parser::Ecosystem;
/// use chainscope::risk::{RiskAnalyzer, RiskLevel};
///
/// let mut graph = DependencyGraph::new(Component::root("app", Ecosystem::Python), Some(1));
/// graph.add_component(Component::dependency("requests", "*", Ecosystem::Python, 1));
/// graph.add_edge("app", "requests", 1).unwrap();
///
/// let assessment = RiskAnalyzer::default().assess(&graph);
/// assert_eq!(assessment.components.len(), 2);
/// assert!(assessment.overall.value() <= 10.0);
/// assert_eq!(assessment.overall_level, RiskLevel::Medium);
/// ```
#[derive(Debug, Clone)]
pub struct RiskAnalyzer {
    weights: RiskWeights,
    high_risk_threshold: f64,
    critical_min_dependents: usize,
}

impl Default for RiskAnalyzer {
    fn default() -> Self {
        Self::new(RiskWeights::default(), DEFAULT_HIGH_RISK_THRESHOLD)
    }
}

impl RiskAnalyzer {
    pub fn new(weights: RiskWeights, high_risk_threshold: f64) -> Self {
        Self {
            weights,
            high_risk_threshold,
            critical_min_dependents: DEFAULT_CRITICAL_MIN_DEPENDENTS,
        }
    }

    /// Sets the dependent count needed for the critical component list.
    pub fn with_critical_min_dependents(mut self, min_dependents: usize) -> Self {
        self.critical_min_dependents = min_dependents;
        self
    }

    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    /// Scores a single component of `graph`.
    pub fn component_risk(&self, graph: &DependencyGraph, component: &Component) -> ComponentRisk {
        let dependents = graph.transitive_dependents(&component.name).len();
        let factors = RiskFactors::for_component(component, dependents);
        let score = factors.score(&self.weights);

        ComponentRisk {
            name: component.name.clone(),
            factors,
            score,
            level: score.level(),
            impact: graph.impact_score(&component.name),
        }
    }

    /// Scores every component and aggregates the results.
    pub fn assess(&self, graph: &DependencyGraph) -> RiskAssessment {
        let components: Vec<ComponentRisk> = graph
            .components()
            .into_iter()
            .map(|c| self.component_risk(graph, c))
            .collect();

        let total = components.len();
        let mean = if total == 0 {
            0.0
        } else {
            components.iter().map(|c| c.score.value()).sum::<f64>() / total as f64
        };
        let overall = RiskScore::new(mean);

        let high_risk_count = components
            .iter()
            .filter(|c| c.score.value() >= self.high_risk_threshold)
            .count();
        let high_risk_percentage = if total == 0 {
            0.0
        } else {
            high_risk_count as f64 / total as f64 * 100.0
        };

        let mut distribution: BTreeMap<RiskLevel, usize> =
            RiskLevel::ALL.iter().map(|level| (*level, 0)).collect();
        for component in &components {
            *distribution.entry(component.level).or_insert(0) += 1;
        }

        let mut top_impact: Vec<(String, f64)> = components
            .iter()
            .map(|c| (c.name.clone(), c.impact))
            .collect();
        top_impact.sort_by(|a, b| b.1.total_cmp(&a.1));
        top_impact.truncate(TOP_IMPACT);

        let critical_components = graph
            .critical_components(self.critical_min_dependents)
            .into_iter()
            .map(|(c, count)| CriticalComponent {
                component: c.name.clone(),
                transitive_dependents: count,
            })
            .collect();
        let critical_paths = Self::critical_paths(graph, &components);

        tracing::info!(
            components = total,
            overall = %overall,
            high_risk = high_risk_count,
            "risk assessment complete"
        );

        RiskAssessment {
            components,
            overall,
            overall_level: overall.level(),
            high_risk_threshold: self.high_risk_threshold,
            high_risk_count,
            high_risk_percentage,
            distribution,
            top_impact,
            critical_min_dependents: self.critical_min_dependents,
            critical_components,
            critical_paths,
        }
    }

    fn critical_paths(graph: &DependencyGraph, components: &[ComponentRisk]) -> Vec<CriticalPath> {
        let mut high_impact: Vec<&ComponentRisk> = components
            .iter()
            .filter(|c| c.impact > CRITICAL_PATH_IMPACT)
            .collect();
        high_impact.sort_by(|a, b| b.impact.total_cmp(&a.impact));

        high_impact
            .into_iter()
            .take(TOP_CRITICAL_PATHS)
            .map(|c| {
                let dependents = graph.transitive_dependents(&c.name);
                CriticalPath {
                    component: c.name.clone(),
                    impact: c.impact,
                    total_dependents: dependents.len(),
                    roots_affected: dependents
                        .iter()
                        .filter(|d| d.is_root())
                        .map(|d| d.name.clone())
                        .collect(),
                }
            })
            .collect()
    }
}
