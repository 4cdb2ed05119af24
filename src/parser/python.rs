//! Parsers for Python dependency declarations.
//!
//! `requirements*.txt` is parsed with a strict line grammar, `pyproject.toml`
//! through the TOML deserializer, and `setup.py` by best-effort text
//! scanning of its `install_requires` list.

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::{ParseError, ParseResult};
use super::registry::ManifestParser;
use super::types::{DependencyKind, Ecosystem, ManifestEntry, ManifestFile};

/// Version operators understood by pip, longest first.
pub const REQUIREMENT_OPERATORS: [&str; 8] = ["===", "==", "~=", "!=", ">=", "<=", ">", "<"];

/// Returns the leading operator of a constraint, if pip recognizes it.
///
/// Constraints with unrecognized operators are still accepted by the
/// parsers; they are just passed through as opaque strings.
pub fn constraint_operator(constraint: &str) -> Option<&'static str> {
    REQUIREMENT_OPERATORS
        .iter()
        .find(|op| constraint.starts_with(*op))
        .copied()
}

/// Parses a single PEP 508 style requirement.
///
/// Returns `Ok(None)` for blank lines, comments and pip option lines
/// (`-r`, `-e`, `--index-url`, ...). The error string describes why the
/// requirement is malformed.
pub fn parse_requirement(raw: &str) -> Result<Option<ManifestEntry>, String> {
    let line = strip_comment(raw).trim().trim_end_matches('\\').trim();
    if line.is_empty() || line.starts_with('-') {
        return Ok(None);
    }

    // Environment markers never change the constraint itself.
    let spec = line.split(';').next().unwrap_or_default().trim();

    let name_end = spec
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        .unwrap_or(spec.len());
    let name = &spec[..name_end];
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err("expected a package name".to_string());
    }

    let mut rest = spec[name_end..].trim_start();
    if rest.starts_with('[') {
        match rest.find(']') {
            Some(end) => rest = rest[end + 1..].trim_start(),
            None => return Err("unterminated extras".to_string()),
        }
    }

    let constraint = if let Some(url) = rest.strip_prefix('@') {
        format!("@{}", url.trim())
    } else {
        let rest = rest
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .unwrap_or(rest);
        rest.chars().filter(|c| !c.is_whitespace()).collect()
    };

    Ok(Some(ManifestEntry::new(name, constraint)))
}

/// Strips a trailing `# comment`. A `#` only starts a comment at the
/// beginning of a line or after whitespace, so URL fragments survive.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'#' && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
            return &line[..i];
        }
    }
    line
}

/// Parser for `requirements.txt` and its variants (`requirements-dev.txt`, ...).
pub struct RequirementsTxtParser;

impl RequirementsTxtParser {
    fn is_dev_file(file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        ["dev", "test", "lint", "doc"]
            .iter()
            .any(|marker| lower.contains(marker))
    }

    /// Parses requirements content, tagging entries with `kind`.
    pub fn parse_with_kind(content: &str, kind: DependencyKind) -> ParseResult<Vec<ManifestEntry>> {
        let mut entries = Vec::new();

        for (idx, line) in content.lines().enumerate() {
            match parse_requirement(line) {
                Ok(Some(mut entry)) => {
                    entry.kind = kind;
                    entries.push(entry);
                }
                Ok(None) => {}
                Err(reason) => return Err(ParseError::malformed(idx + 1, line, reason)),
            }
        }

        Ok(entries)
    }

    /// Parses a file by name, inferring development kind from the name.
    pub fn parse_file_content(file_name: &str, content: &str) -> ParseResult<Vec<ManifestEntry>> {
        let kind = if Self::is_dev_file(file_name) {
            DependencyKind::Development
        } else {
            DependencyKind::Production
        };
        Self::parse_with_kind(content, kind)
    }
}

impl ManifestParser for RequirementsTxtParser {
    fn name(&self) -> &'static str {
        "requirements.txt"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Python
    }

    fn supports_file(&self, file_name: &str) -> bool {
        file_name.starts_with("requirements") && file_name.ends_with(".txt")
    }

    fn parse(&self, content: &str) -> ParseResult<Vec<ManifestEntry>> {
        Self::parse_with_kind(content, DependencyKind::Production)
    }

    fn parse_file(&self, file: &ManifestFile) -> ParseResult<Vec<ManifestEntry>> {
        Self::parse_file_content(file.file_name(), &file.content)
    }
}

/// Parser for PEP 621 and Poetry style `pyproject.toml` files.
pub struct PyProjectParser;

impl PyProjectParser {
    fn push_requirements(
        entries: &mut Vec<ManifestEntry>,
        section: &str,
        value: &toml::Value,
        kind: DependencyKind,
    ) -> ParseResult<()> {
        let Some(items) = value.as_array() else {
            return Err(ParseError::InvalidManifest(format!(
                "{} must be an array of strings",
                section
            )));
        };

        for item in items {
            let Some(spec) = item.as_str() else {
                return Err(ParseError::InvalidManifest(format!(
                    "{} contains a non-string entry",
                    section
                )));
            };
            match parse_requirement(spec) {
                Ok(Some(mut entry)) => {
                    entry.kind = kind;
                    entries.push(entry);
                }
                Ok(None) => {}
                Err(reason) => {
                    return Err(ParseError::InvalidManifest(format!(
                        "{}: '{}' ({})",
                        section, spec, reason
                    )))
                }
            }
        }
        Ok(())
    }

    fn push_poetry_table(entries: &mut Vec<ManifestEntry>, table: &toml::Table, kind: DependencyKind) {
        for (name, value) in table {
            if name == "python" {
                continue;
            }
            let constraint = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Table(t) => t
                    .get("version")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                _ => String::new(),
            };
            entries.push(ManifestEntry::with_kind(name.as_str(), constraint, kind));
        }
    }
}

impl ManifestParser for PyProjectParser {
    fn name(&self) -> &'static str {
        "pyproject.toml"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Python
    }

    fn supports_file(&self, file_name: &str) -> bool {
        file_name == "pyproject.toml"
    }

    fn parse(&self, content: &str) -> ParseResult<Vec<ManifestEntry>> {
        let doc: toml::Table = toml::from_str(content)?;
        let mut entries = Vec::new();

        if let Some(project) = doc.get("project").and_then(|v| v.as_table()) {
            if let Some(deps) = project.get("dependencies") {
                Self::push_requirements(
                    &mut entries,
                    "project.dependencies",
                    deps,
                    DependencyKind::Production,
                )?;
            }
            if let Some(extras) = project.get("optional-dependencies").and_then(|v| v.as_table()) {
                for (extra, deps) in extras {
                    let section = format!("project.optional-dependencies.{}", extra);
                    Self::push_requirements(&mut entries, &section, deps, DependencyKind::Optional)?;
                }
            }
        }

        let poetry = doc
            .get("tool")
            .and_then(|v| v.get("poetry"))
            .and_then(|v| v.as_table());
        if let Some(poetry) = poetry {
            if let Some(deps) = poetry.get("dependencies").and_then(|v| v.as_table()) {
                Self::push_poetry_table(&mut entries, deps, DependencyKind::Production);
            }
            if let Some(deps) = poetry.get("dev-dependencies").and_then(|v| v.as_table()) {
                Self::push_poetry_table(&mut entries, deps, DependencyKind::Development);
            }
            if let Some(groups) = poetry.get("group").and_then(|v| v.as_table()) {
                for group in groups.values() {
                    if let Some(deps) = group.get("dependencies").and_then(|v| v.as_table()) {
                        Self::push_poetry_table(&mut entries, deps, DependencyKind::Development);
                    }
                }
            }
        }

        Ok(entries)
    }
}

static INSTALL_REQUIRES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)install_requires\s*=\s*\[(.*?)\]").expect("install_requires regex is valid")
});

static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["']([^"']+)["']"#).expect("quoted string regex is valid"));

/// Best-effort scanner for `setup.py`.
///
/// Only literal `install_requires=[...]` lists are understood; requirements
/// computed at runtime are invisible to it.
pub struct SetupPyParser;

impl ManifestParser for SetupPyParser {
    fn name(&self) -> &'static str {
        "setup.py"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Python
    }

    fn supports_file(&self, file_name: &str) -> bool {
        file_name == "setup.py"
    }

    fn parse(&self, content: &str) -> ParseResult<Vec<ManifestEntry>> {
        let Some(list) = INSTALL_REQUIRES.captures(content).and_then(|c| c.get(1)) else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for quoted in QUOTED.captures_iter(list.as_str()) {
            match parse_requirement(&quoted[1]) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(reason) => {
                    tracing::debug!(requirement = &quoted[1], %reason, "skipping setup.py requirement")
                }
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[ManifestEntry]) -> Vec<(&str, &str)> {
        entries.iter().map(|e| e.as_pair()).collect()
    }

    #[test]
    fn test_requirements_basic() {
        let entries = RequirementsTxtParser
            .parse("foo==1.2\n# comment\nbar>=2.0\n")
            .unwrap();
        assert_eq!(pairs(&entries), vec![("foo", "==1.2"), ("bar", ">=2.0")]);
    }

    #[test]
    fn test_requirements_is_deterministic() {
        let content = "requests==2.28.0\nflask>=2.0.0\npandas~=1.5.0\nnumpy\n";
        let first = RequirementsTxtParser.parse(content).unwrap();
        let second = RequirementsTxtParser.parse(content).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_requirements_skips_options_and_blank_lines() {
        let content = "\n-r base.txt\n--index-url https://pypi.org/simple\n-e .\n\nrequests\n";
        let entries = RequirementsTxtParser.parse(content).unwrap();
        assert_eq!(pairs(&entries), vec![("requests", "*")]);
    }

    #[test]
    fn test_requirements_extras_markers_and_comments() {
        let content = "uvicorn[standard] >= 0.20 ; python_version >= '3.8'  # server\n\
                       Django>=4.2,<5.0\n";
        let entries = RequirementsTxtParser.parse(content).unwrap();
        assert_eq!(
            pairs(&entries),
            vec![("uvicorn", ">=0.20"), ("Django", ">=4.2,<5.0")]
        );
    }

    #[test]
    fn test_requirements_unrecognized_operator_is_opaque() {
        let entries = RequirementsTxtParser.parse("weird=>1.0\nodd ^2\n").unwrap();
        assert_eq!(pairs(&entries), vec![("weird", "=>1.0"), ("odd", "^2")]);
        assert_eq!(constraint_operator("=>1.0"), None);
        assert_eq!(constraint_operator("~=1.4"), Some("~="));
        assert_eq!(constraint_operator("===1.0"), Some("==="));
    }

    #[test]
    fn test_requirements_direct_reference() {
        let entries = RequirementsTxtParser
            .parse("pkg @ https://example.com/pkg.zip#sha1=abc\n")
            .unwrap();
        assert_eq!(pairs(&entries), vec![("pkg", "@https://example.com/pkg.zip#sha1=abc")]);
    }

    #[test]
    fn test_requirements_malformed_line() {
        let err = RequirementsTxtParser
            .parse("good==1.0\n==2.0\n")
            .unwrap_err();
        match err {
            ParseError::MalformedLine { line, content, .. } => {
                assert_eq!(line, 2);
                assert_eq!(content, "==2.0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_requirements_unterminated_extras() {
        assert!(RequirementsTxtParser.parse("pkg[extra>=1\n").is_err());
    }

    #[test]
    fn test_requirements_dev_file_kind() {
        let entries =
            RequirementsTxtParser::parse_file_content("requirements-dev.txt", "pytest\n").unwrap();
        assert_eq!(entries[0].kind, DependencyKind::Development);
        assert!(RequirementsTxtParser.supports_file("requirements-dev.txt"));
        assert!(!RequirementsTxtParser.supports_file("constraints.txt"));
    }

    #[test]
    fn test_pyproject_pep621() {
        let content = r#"
[project]
name = "demo"
dependencies = ["httpx>=0.24", "rich"]

[project.optional-dependencies]
test = ["pytest>=7"]
"#;
        let entries = PyProjectParser.parse(content).unwrap();
        assert_eq!(
            pairs(&entries),
            vec![("httpx", ">=0.24"), ("rich", "*"), ("pytest", ">=7")]
        );
        assert_eq!(entries[2].kind, DependencyKind::Optional);
    }

    #[test]
    fn test_pyproject_poetry() {
        let content = r#"
[tool.poetry.dependencies]
python = "^3.10"
fastapi = "^0.100"
sqlalchemy = { version = "^2.0", extras = ["asyncio"] }

[tool.poetry.group.dev.dependencies]
black = "*"
"#;
        let entries = PyProjectParser.parse(content).unwrap();
        assert_eq!(
            pairs(&entries),
            vec![("fastapi", "^0.100"), ("sqlalchemy", "^2.0"), ("black", "*")]
        );
        assert_eq!(entries[2].kind, DependencyKind::Development);
    }

    #[test]
    fn test_pyproject_invalid_toml() {
        assert!(matches!(
            PyProjectParser.parse("[project\nname="),
            Err(ParseError::Toml(_))
        ));
    }

    #[test]
    fn test_pyproject_dependencies_not_array() {
        let content = "[project]\ndependencies = \"requests\"\n";
        assert!(matches!(
            PyProjectParser.parse(content),
            Err(ParseError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_setup_py_install_requires() {
        let content = r#"
from setuptools import setup

setup(
    name="demo",
    install_requires=[
        "requests>=2.0",
        'click',
    ],
)
"#;
        let entries = SetupPyParser.parse(content).unwrap();
        assert_eq!(pairs(&entries), vec![("requests", ">=2.0"), ("click", "*")]);
    }

    #[test]
    fn test_setup_py_without_install_requires() {
        let entries = SetupPyParser.parse("from setuptools import setup\nsetup()\n").unwrap();
        assert!(entries.is_empty());
    }
}
