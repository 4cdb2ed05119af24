//! Parser for npm package.json files.
//!
//! Node.js detection is a known gap: only the four standard dependency
//! maps are read, and workspaces, overrides and lockfiles are ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{ParseError, ParseResult};
use super::registry::ManifestParser;
use super::types::{DependencyKind, Ecosystem, ManifestEntry, ANY_VERSION};

/// The dependency-relevant subset of a package.json file.
///
/// Dependency maps keep declaration order so discovery order is stable.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackageJson {
    /// The name of the package.
    pub name: Option<String>,

    /// The version of the package (semver format).
    pub version: Option<String>,

    /// Production dependencies required at runtime.
    pub dependencies: Option<Map<String, Value>>,

    /// Development-only dependencies (testing, building, etc.).
    #[serde(rename = "devDependencies")]
    pub dev_dependencies: Option<Map<String, Value>>,

    /// Peer dependencies that the host package must provide.
    #[serde(rename = "peerDependencies")]
    pub peer_dependencies: Option<Map<String, Value>>,

    /// Optional dependencies that enhance functionality if available.
    #[serde(rename = "optionalDependencies")]
    pub optional_dependencies: Option<Map<String, Value>>,
}

impl PackageJson {
    /// Returns the total count of all dependencies.
    pub fn dependency_count(&self) -> usize {
        [
            &self.dependencies,
            &self.dev_dependencies,
            &self.peer_dependencies,
            &self.optional_dependencies,
        ]
        .iter()
        .map(|m| m.as_ref().map_or(0, |d| d.len()))
        .sum()
    }
}

/// Parses a package.json from a string.
///
/// # Example
///
/// ```
/// use chainscope::parser::package_json::parse_str;
///
/// let json = r#"{"name": "my-app", "version": "1.0.0"}"#;
/// let pkg = parse_str(json).unwrap();
/// assert_eq!(pkg.name, Some("my-app".to_string()));
/// ```
pub fn parse_str(content: &str) -> ParseResult<PackageJson> {
    let value: Value = serde_json::from_str(content)?;
    if !value.is_object() {
        return Err(ParseError::InvalidManifest(
            "package.json root must be an object".to_string(),
        ));
    }
    Ok(serde_json::from_value(value)?)
}

/// Extracts all dependencies into a flat list, tagged by kind.
///
/// Non-string specifiers (e.g. objects written by some tools) are kept as
/// unconstrained entries.
pub fn extract_dependencies(pkg: &PackageJson) -> Vec<ManifestEntry> {
    let sections = [
        (&pkg.dependencies, DependencyKind::Production),
        (&pkg.dev_dependencies, DependencyKind::Development),
        (&pkg.peer_dependencies, DependencyKind::Peer),
        (&pkg.optional_dependencies, DependencyKind::Optional),
    ];

    let mut deps = Vec::new();
    for (section, kind) in sections {
        let Some(map) = section else {
            continue;
        };
        for (name, spec) in map {
            let constraint = spec.as_str().unwrap_or(ANY_VERSION);
            deps.push(ManifestEntry::with_kind(name.as_str(), constraint, kind));
        }
    }
    deps
}

/// Parser for `package.json`.
pub struct PackageJsonParser;

impl ManifestParser for PackageJsonParser {
    fn name(&self) -> &'static str {
        "package.json"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Node
    }

    fn supports_file(&self, file_name: &str) -> bool {
        file_name == "package.json"
    }

    fn parse(&self, content: &str) -> ParseResult<Vec<ManifestEntry>> {
        let pkg = parse_str(content)?;
        Ok(extract_dependencies(&pkg))
    }
}
