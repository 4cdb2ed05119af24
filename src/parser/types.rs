//! Shared types for manifest parsing.
//!
//! This module defines the core data structures used to represent
//! dependency declarations across the supported packaging ecosystems.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Constraint recorded when a manifest declares a dependency without one.
pub const ANY_VERSION: &str = "*";

/// The packaging system a dependency belongs to.
///
/// Ordering is the declaration order, which keeps registry iteration and
/// report output deterministic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    /// PyPI (requirements.txt, pyproject.toml, setup.py).
    Python,
    /// npm (package.json).
    Node,
    /// Maven Central (pom.xml, build.gradle).
    Java,
    /// Go modules (go.mod).
    Go,
    /// crates.io (Cargo.toml).
    Rust,
    /// Anything the registry could not attribute.
    #[default]
    Unknown,
}

impl Ecosystem {
    /// All ecosystem tags, in order.
    pub const ALL: [Ecosystem; 6] = [
        Ecosystem::Python,
        Ecosystem::Node,
        Ecosystem::Java,
        Ecosystem::Go,
        Ecosystem::Rust,
        Ecosystem::Unknown,
    ];

    /// Returns the lowercase tag used in exports.
    pub fn label(&self) -> &'static str {
        match self {
            Ecosystem::Python => "python",
            Ecosystem::Node => "node",
            Ecosystem::Java => "java",
            Ecosystem::Go => "go",
            Ecosystem::Rust => "rust",
            Ecosystem::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Ecosystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "python" | "pypi" => Ok(Ecosystem::Python),
            "node" | "nodejs" | "npm" => Ok(Ecosystem::Node),
            "java" | "maven" => Ok(Ecosystem::Java),
            "go" | "golang" => Ok(Ecosystem::Go),
            "rust" | "cargo" => Ok(Ecosystem::Rust),
            "unknown" => Ok(Ecosystem::Unknown),
            _ => Err(format!(
                "Unknown ecosystem: '{}'. Valid ecosystems: python, node, java, go, rust",
                s
            )),
        }
    }
}

/// Categorizes the type of dependency relationship.
///
/// Different dependency kinds have different implications for what ends
/// up shipped; the graph builder may drop development entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Required at runtime.
    #[default]
    Production,
    /// Only needed while developing or testing.
    Development,
    /// Only needed to build the package.
    Build,
    /// Enhances functionality if available.
    Optional,
    /// Expected to be provided by the consumer.
    Peer,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyKind::Production => "production",
            DependencyKind::Development => "development",
            DependencyKind::Build => "build",
            DependencyKind::Optional => "optional",
            DependencyKind::Peer => "peer",
        };
        write!(f, "{}", s)
    }
}

/// A single `(name, version-constraint)` pair extracted from a manifest.
///
/// The constraint is kept as an opaque string: operators the parser does
/// not recognize are passed through rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// The package name (e.g., "requests", "serde").
    pub name: String,

    /// The version constraint (e.g., "==1.2", "^18.0.0", "*").
    pub constraint: String,

    /// The category of this dependency.
    pub kind: DependencyKind,
}

impl ManifestEntry {
    /// Creates a new production entry.
    pub fn new(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::with_kind(name, constraint, DependencyKind::Production)
    }

    /// Creates a new entry with an explicit kind.
    pub fn with_kind(
        name: impl Into<String>,
        constraint: impl Into<String>,
        kind: DependencyKind,
    ) -> Self {
        let constraint = constraint.into();
        Self {
            name: name.into(),
            constraint: if constraint.trim().is_empty() {
                ANY_VERSION.to_string()
            } else {
                constraint
            },
            kind,
        }
    }

    /// Returns the entry as a borrowed `(name, constraint)` pair.
    pub fn as_pair(&self) -> (&str, &str) {
        (&self.name, &self.constraint)
    }
}

impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} ({})", self.name, self.constraint, self.kind)
    }
}

/// A manifest file handed over by a [`ManifestSource`](crate::analysis::ManifestSource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    /// Path relative to the source root, used for parser selection and reporting.
    pub path: PathBuf,

    /// Raw text content.
    pub content: String,
}

impl ManifestFile {
    /// Creates a new manifest file.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Returns the bare file name (e.g., "requirements.txt").
    pub fn file_name(&self) -> &str {
        file_name_of(&self.path)
    }
}

/// Returns the final path component as UTF-8, or an empty string.
pub(crate) fn file_name_of(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecosystem_label_and_parse() {
        for eco in Ecosystem::ALL {
            assert_eq!(eco.label().parse::<Ecosystem>().unwrap(), eco);
        }
        assert_eq!("npm".parse::<Ecosystem>().unwrap(), Ecosystem::Node);
        assert_eq!("Cargo".parse::<Ecosystem>().unwrap(), Ecosystem::Rust);
        assert!("cobol".parse::<Ecosystem>().is_err());
    }

    #[test]
    fn test_ecosystem_serializes_lowercase() {
        let json = serde_json::to_string(&Ecosystem::Python).unwrap();
        assert_eq!(json, "\"python\"");
    }

    #[test]
    fn test_dependency_kind_display() {
        assert_eq!(DependencyKind::Production.to_string(), "production");
        assert_eq!(DependencyKind::Development.to_string(), "development");
    }

    #[test]
    fn test_entry_empty_constraint_becomes_any() {
        let entry = ManifestEntry::new("numpy", "");
        assert_eq!(entry.constraint, ANY_VERSION);
        assert_eq!(entry.as_pair(), ("numpy", "*"));
    }

    #[test]
    fn test_entry_display() {
        let entry = ManifestEntry::with_kind("pytest", ">=7", DependencyKind::Development);
        assert_eq!(format!("{}", entry), "pytest>=7 (development)");
    }

    #[test]
    fn test_manifest_file_name() {
        let file = ManifestFile::new("vendor/foo/requirements.txt", "");
        assert_eq!(file.file_name(), "requirements.txt");
    }
}
