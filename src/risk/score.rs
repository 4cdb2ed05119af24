//! Risk score scalar, levels and formula weights.

use serde::{Deserialize, Serialize};

/// Upper bound of every factor and score.
pub const MAX_RISK: f64 = 10.0;

/// A risk value in `[0, 10]`.
///
/// Construction clamps out-of-range input and maps NaN to 0, so a score
/// can never leave the range no matter what metadata went in.
///
/// # Example
///
/// ```rust
/// use chainscope::risk::RiskScore;
///
/// assert_eq!(RiskScore::new(12.5).value(), 10.0);
/// assert_eq!(RiskScore::new(-1.0).value(), 0.0);
/// assert_eq!(RiskScore::new(f64::NAN).value(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(f64);

impl RiskScore {
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, MAX_RISK))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn level(&self) -> RiskLevel {
        RiskLevel::from_score(self.0)
    }
}

impl std::fmt::Display for RiskScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Coarse bucket for a score: low < 3 <= medium < 6 <= high < 8 <= critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub fn from_score(score: f64) -> Self {
        if score < 3.0 {
            Self::Low
        } else if score < 6.0 {
            Self::Medium
        } else if score < 8.0 {
            Self::High
        } else {
            Self::Critical
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A weight that cannot be used in the risk formula.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Risk weight '{name}' must be a finite non-negative number, got {value}")]
pub struct InvalidWeightError {
    pub name: &'static str,
    pub value: f64,
}

/// Weights of the six risk factors.
///
/// The defaults sum to 1.0, which keeps the weighted sum inside `[0, 10]`
/// before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub base: f64,
    pub criticality: f64,
    pub dependency: f64,
    pub staleness: f64,
    pub vulnerability: f64,
    pub popularity: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            base: 0.20,
            criticality: 0.15,
            dependency: 0.15,
            staleness: 0.20,
            vulnerability: 0.20,
            popularity: 0.10,
        }
    }
}

impl RiskWeights {
    /// Weights paired with their names, in column order.
    pub fn named(&self) -> [(&'static str, f64); 6] {
        [
            ("base", self.base),
            ("criticality", self.criticality),
            ("dependency", self.dependency),
            ("staleness", self.staleness),
            ("vulnerability", self.vulnerability),
            ("popularity", self.popularity),
        ]
    }

    /// Rejects negative, NaN or infinite weights.
    pub fn validate(&self) -> Result<(), InvalidWeightError> {
        match self
            .named()
            .into_iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            Some((name, value)) => Err(InvalidWeightError { name, value }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_clamps() {
        assert_eq!(RiskScore::new(5.5).value(), 5.5);
        assert_eq!(RiskScore::new(f64::INFINITY).value(), 10.0);
        assert_eq!(RiskScore::new(f64::NEG_INFINITY).value(), 0.0);
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(2.99), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(3.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(6.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(7.99), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(8.0), RiskLevel::Critical);
        assert_eq!(RiskScore::new(10.0).level(), RiskLevel::Critical);
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let total: f64 = RiskWeights::default().named().iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(RiskWeights::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_weights() {
        let weights = RiskWeights {
            staleness: -0.1,
            ..RiskWeights::default()
        };
        let err = weights.validate().unwrap_err();
        assert_eq!(err.name, "staleness");

        let weights = RiskWeights {
            popularity: f64::NAN,
            ..RiskWeights::default()
        };
        assert_eq!(weights.validate().unwrap_err().name, "popularity");
    }

    #[test]
    fn test_level_display_and_order() {
        assert_eq!(RiskLevel::Critical.to_string(), "critical");
        assert!(RiskLevel::Low < RiskLevel::Critical);
    }
}
