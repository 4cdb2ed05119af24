//! Configuration management
//!
//! Settings are read from a TOML file and passed explicitly into the
//! analysis entry point; nothing in the library reads global state.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::risk::{
    InvalidWeightError, RiskWeights, DEFAULT_CRITICAL_MIN_DEPENDENTS, DEFAULT_HIGH_RISK_THRESHOLD,
    MAX_RISK,
};

/// The configuration written by `chainscope config`.
pub const DOCUMENTED_CONFIG: &str = r#"# chainscope configuration

[analysis]
# Deepest dependency level to expand. Remove the line for unbounded depth.
max_depth = 2
# Maximum number of components in the graph, root included.
max_components = 30
# Include the root's development dependencies.
include_dev_dependencies = true
# Directories searched for a dependency's own manifests, e.g. vendor/<name>.
dependency_dirs = ["vendor", "node_modules", "third_party"]

[output]
# Root of the graphs/, reports/ and metrics/ directories.
base_directory = "outputs"

[risk]
# Components scoring at or above this value count as high risk.
high_risk_threshold = 7.0
# Transitive dependents needed to be listed as a critical component.
critical_min_dependents = 1

[risk.weights]
base = 0.20
criticality = 0.15
dependency = 0.15
staleness = 0.20
vulnerability = 0.20
popularity = 0.10
"#;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Weight(#[from] InvalidWeightError),
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
    pub risk: RiskConfig,
}

/// Limits and inputs of the graph builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Deepest level expanded; `None` expands without bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    /// Component cap, root included
    pub max_components: usize,
    /// Whether the root's development dependencies become components
    pub include_dev_dependencies: bool,
    /// Directories searched for dependency manifests
    pub dependency_dirs: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(2),
            max_components: 30,
            include_dev_dependencies: true,
            dependency_dirs: vec![
                "vendor".to_string(),
                "node_modules".to_string(),
                "third_party".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub base_directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_directory: PathBuf::from("outputs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub high_risk_threshold: f64,
    pub critical_min_dependents: usize,
    pub weights: RiskWeights,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_risk_threshold: DEFAULT_HIGH_RISK_THRESHOLD,
            critical_min_dependents: DEFAULT_CRITICAL_MIN_DEPENDENTS,
            weights: RiskWeights::default(),
        }
    }
}

impl Settings {
    /// Parses settings from TOML text. `origin` is only used in errors.
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.max_components == 0 {
            return Err(ConfigError::Invalid(
                "analysis.max_components must be at least 1".to_string(),
            ));
        }

        let threshold = self.risk.high_risk_threshold;
        if !threshold.is_finite() || !(0.0..=MAX_RISK).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "risk.high_risk_threshold must be within 0..=10, got {}",
                threshold
            )));
        }

        if self.output.base_directory.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "output.base_directory must not be empty".to_string(),
            ));
        }

        self.risk.weights.validate()?;
        Ok(())
    }
}

/// `$HOME/.config/chainscope/config.toml`, if `HOME` is set.
pub fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("chainscope")
            .join("config.toml")
    })
}

/// Load configuration from disk or use defaults
///
/// An explicit path must exist. Without one, the default location is used
/// when present and built-in defaults otherwise.
pub fn load(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(path) => path,
            None => {
                tracing::debug!("no config file found, using defaults");
                return Ok(Settings::default());
            }
        },
    };

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let settings = Settings::from_toml_str(&content, &path)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(settings)
}
