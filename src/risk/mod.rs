//! Heuristic supply-chain risk scoring.
//!
//! Every component gets six factors in `[0, 10]` derived from its role,
//! its position in the graph and optional metadata. The component score is
//! their weighted sum and the project score is the mean over components.
//! Missing metadata falls back to a neutral mid-range value instead of
//! failing the run.

mod analyzer;
mod score;

pub use analyzer::{
    ComponentRisk, CriticalComponent, CriticalPath, RiskAnalyzer, RiskAssessment, RiskFactors,
    CRITICAL_PATH_IMPACT, DEFAULT_CRITICAL_MIN_DEPENDENTS, DEFAULT_HIGH_RISK_THRESHOLD,
    NEUTRAL_FACTOR,
};
pub use score::{InvalidWeightError, RiskLevel, RiskScore, RiskWeights, MAX_RISK};
