//! Parser registry keyed by ecosystem.
//!
//! New manifest formats are added by implementing [`ManifestParser`] and
//! calling [`ParserRegistry::register`]; nothing in the graph builder needs
//! to change.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::cargo_toml::CargoTomlParser;
use super::error::{ParseError, ParseResult};
use super::go_mod::GoModParser;
use super::java::{GradleParser, MavenPomParser};
use super::package_json::PackageJsonParser;
use super::python::{PyProjectParser, RequirementsTxtParser, SetupPyParser};
use super::types::{Ecosystem, ManifestEntry, ManifestFile};

/// Common capability of every manifest parser.
pub trait ManifestParser: Send + Sync {
    /// Short identifier used in logs (e.g., "requirements.txt").
    fn name(&self) -> &'static str;

    /// The ecosystem this parser handles.
    fn ecosystem(&self) -> Ecosystem;

    /// Checks if this parser understands the given bare file name.
    fn supports_file(&self, file_name: &str) -> bool;

    /// Extracts dependency entries, in declaration order.
    fn parse(&self, content: &str) -> ParseResult<Vec<ManifestEntry>>;

    /// Parses a whole manifest file. Override when the file name carries
    /// meaning beyond parser selection.
    fn parse_file(&self, file: &ManifestFile) -> ParseResult<Vec<ManifestEntry>> {
        self.parse(&file.content)
    }
}

/// Entries extracted from one manifest file.
#[derive(Debug, Clone)]
pub struct ParsedManifest {
    pub path: PathBuf,
    pub ecosystem: Ecosystem,
    pub entries: Vec<ManifestEntry>,
}

/// Maps ecosystem tags to the parsers registered for them.
pub struct ParserRegistry {
    parsers: BTreeMap<Ecosystem, Vec<Box<dyn ManifestParser>>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: BTreeMap<Ecosystem, Vec<&str>> = self
            .parsers
            .iter()
            .map(|(eco, parsers)| (*eco, parsers.iter().map(|p| p.name()).collect()))
            .collect();
        f.debug_struct("ParserRegistry")
            .field("parsers", &names)
            .finish()
    }
}

impl ParserRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            parsers: BTreeMap::new(),
        }
    }

    /// Creates a registry with every built-in parser.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(RequirementsTxtParser)
            .register(PyProjectParser)
            .register(SetupPyParser)
            .register(PackageJsonParser)
            .register(CargoTomlParser)
            .register(GoModParser)
            .register(MavenPomParser)
            .register(GradleParser);
        registry
    }

    /// Registers a parser under its own ecosystem tag.
    ///
    /// Parsers registered earlier win when several accept the same file.
    pub fn register<P: ManifestParser + 'static>(&mut self, parser: P) -> &mut Self {
        self.parsers
            .entry(parser.ecosystem())
            .or_default()
            .push(Box::new(parser));
        self
    }

    /// Ecosystems with at least one registered parser.
    pub fn ecosystems(&self) -> Vec<Ecosystem> {
        self.parsers.keys().copied().collect()
    }

    /// Parsers registered for one ecosystem.
    pub fn parsers_for(&self, ecosystem: Ecosystem) -> Vec<&dyn ManifestParser> {
        match self.parsers.get(&ecosystem) {
            Some(parsers) => parsers.iter().map(|p| p.as_ref() as &dyn ManifestParser).collect(),
            None => Vec::new(),
        }
    }

    /// Finds the parser responsible for a bare file name.
    pub fn parser_for(&self, file_name: &str) -> Option<&dyn ManifestParser> {
        self.parsers
            .values()
            .flat_map(|parsers| parsers.iter())
            .find(|p| p.supports_file(file_name))
            .map(|p| p.as_ref() as &dyn ManifestParser)
    }

    /// Returns true if some parser accepts the file name.
    pub fn supports(&self, file_name: &str) -> bool {
        self.parser_for(file_name).is_some()
    }

    /// Parses a manifest with whichever parser accepts its file name.
    pub fn parse(&self, file: &ManifestFile) -> ParseResult<ParsedManifest> {
        let parser = self
            .parser_for(file.file_name())
            .ok_or_else(|| ParseError::Unsupported(file.path.display().to_string()))?;
        self.run(parser, file)
    }

    /// Parses a manifest as a declared ecosystem.
    ///
    /// Fails with [`ParseError::Unsupported`] when no parser of that
    /// ecosystem accepts the file name.
    pub fn parse_as(&self, ecosystem: Ecosystem, file: &ManifestFile) -> ParseResult<ParsedManifest> {
        let parser = self
            .parsers_for(ecosystem)
            .into_iter()
            .find(|p| p.supports_file(file.file_name()))
            .ok_or_else(|| {
                ParseError::Unsupported(format!("{} as {}", file.path.display(), ecosystem))
            })?;
        self.run(parser, file)
    }

    fn run(&self, parser: &dyn ManifestParser, file: &ManifestFile) -> ParseResult<ParsedManifest> {
        let entries = parser.parse_file(file)?;
        tracing::debug!(
            parser = parser.name(),
            path = %file.path.display(),
            entries = entries.len(),
            "parsed manifest"
        );
        Ok(ParsedManifest {
            path: file.path.clone(),
            ecosystem: parser.ecosystem(),
            entries,
        })
    }

    /// Total number of registered parsers.
    pub fn len(&self) -> usize {
        self.parsers.values().map(Vec::len).sum()
    }

    /// Returns true if no parser is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct GemfileParser;

    impl ManifestParser for GemfileParser {
        fn name(&self) -> &'static str {
            "Gemfile"
        }

        fn ecosystem(&self) -> Ecosystem {
            Ecosystem::Unknown
        }

        fn supports_file(&self, file_name: &str) -> bool {
            file_name == "Gemfile"
        }

        fn parse(&self, content: &str) -> ParseResult<Vec<ManifestEntry>> {
            Ok(content
                .lines()
                .filter_map(|l| l.trim().strip_prefix("gem "))
                .map(|name| ManifestEntry::new(name.trim_matches(|c| c == '\'' || c == '"'), "*"))
                .collect())
        }
    }

    #[test]
    fn test_defaults_cover_all_known_ecosystems() {
        let registry = ParserRegistry::with_defaults();
        assert_eq!(
            registry.ecosystems(),
            vec![
                Ecosystem::Python,
                Ecosystem::Node,
                Ecosystem::Java,
                Ecosystem::Go,
                Ecosystem::Rust
            ]
        );
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn test_parser_for_file_names() {
        let registry = ParserRegistry::with_defaults();
        assert_eq!(
            registry.parser_for("requirements.txt").unwrap().ecosystem(),
            Ecosystem::Python
        );
        assert_eq!(registry.parser_for("package.json").unwrap().ecosystem(), Ecosystem::Node);
        assert_eq!(registry.parser_for("Cargo.toml").unwrap().ecosystem(), Ecosystem::Rust);
        assert_eq!(registry.parser_for("go.mod").unwrap().ecosystem(), Ecosystem::Go);
        assert_eq!(registry.parser_for("pom.xml").unwrap().ecosystem(), Ecosystem::Java);
        assert!(registry.parser_for("README.md").is_none());
    }

    #[test]
    fn test_register_new_ecosystem_without_core_changes() {
        let mut registry = ParserRegistry::new();
        assert!(registry.is_empty());
        registry.register(GemfileParser);

        let file = ManifestFile::new("Gemfile", "gem 'rails'\ngem 'puma'\n");
        let parsed = registry.parse(&file).unwrap();

        assert_eq!(parsed.ecosystem, Ecosystem::Unknown);
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].name, "rails");
    }

    #[test]
    fn test_parse_unsupported_file() {
        let registry = ParserRegistry::with_defaults();
        let file = ManifestFile::new("Gemfile", "gem 'rails'");
        assert!(matches!(
            registry.parse(&file),
            Err(ParseError::Unsupported(_))
        ));
    }

    #[test]
    fn test_parse_as_declared_ecosystem() {
        let registry = ParserRegistry::with_defaults();
        let file = ManifestFile::new("requirements.txt", "foo==1.2\n");

        let parsed = registry.parse_as(Ecosystem::Python, &file).unwrap();
        assert_eq!(parsed.entries[0].as_pair(), ("foo", "==1.2"));

        assert!(matches!(
            registry.parse_as(Ecosystem::Node, &file),
            Err(ParseError::Unsupported(_))
        ));
    }
}
