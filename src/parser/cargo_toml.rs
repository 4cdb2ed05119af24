//! Parser for Rust `Cargo.toml` manifests.

use super::error::ParseResult;
use super::registry::ManifestParser;
use super::types::{DependencyKind, Ecosystem, ManifestEntry};

/// Parser for `Cargo.toml`.
///
/// Reads `[dependencies]`, `[dev-dependencies]`, `[build-dependencies]`,
/// their `[target.'cfg(..)'.*]` variants and `[workspace.dependencies]`.
pub struct CargoTomlParser;

impl CargoTomlParser {
    fn push_section(entries: &mut Vec<ManifestEntry>, table: &toml::Table, kind: DependencyKind) {
        for (name, value) in table {
            let kind = if is_optional(value) {
                DependencyKind::Optional
            } else {
                kind
            };
            entries.push(ManifestEntry::with_kind(name.as_str(), extract_version(value), kind));
        }
    }

    fn push_sections(entries: &mut Vec<ManifestEntry>, table: &toml::Table) {
        let sections = [
            ("dependencies", DependencyKind::Production),
            ("dev-dependencies", DependencyKind::Development),
            ("build-dependencies", DependencyKind::Build),
        ];
        for (key, kind) in sections {
            if let Some(section) = table.get(key).and_then(|v| v.as_table()) {
                Self::push_section(entries, section, kind);
            }
        }
    }
}

impl ManifestParser for CargoTomlParser {
    fn name(&self) -> &'static str {
        "Cargo.toml"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Rust
    }

    fn supports_file(&self, file_name: &str) -> bool {
        file_name == "Cargo.toml"
    }

    fn parse(&self, content: &str) -> ParseResult<Vec<ManifestEntry>> {
        let cargo: toml::Table = toml::from_str(content)?;
        let mut entries = Vec::new();

        Self::push_sections(&mut entries, &cargo);

        if let Some(targets) = cargo.get("target").and_then(|v| v.as_table()) {
            for target in targets.values().filter_map(|v| v.as_table()) {
                Self::push_sections(&mut entries, target);
            }
        }

        if let Some(deps) = cargo
            .get("workspace")
            .and_then(|v| v.get("dependencies"))
            .and_then(|v| v.as_table())
        {
            Self::push_section(&mut entries, deps, DependencyKind::Production);
        }

        Ok(entries)
    }
}

/// Extract version from a TOML value (either a string or a table).
///
/// Path and git dependencies without a version come back empty, which the
/// entry constructor turns into `*`.
fn extract_version(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Table(t) => t
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn is_optional(value: &toml::Value) -> bool {
    value
        .get("optional")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}
