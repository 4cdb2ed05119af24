//! Best-effort parsers for Java build files.
//!
//! Neither format is parsed structurally: `pom.xml` is scanned for
//! `<dependency>` blocks and Gradle scripts for configuration calls with a
//! `group:artifact:version` coordinate.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::{ParseError, ParseResult};
use super::registry::ManifestParser;
use super::types::{DependencyKind, Ecosystem, ManifestEntry};

static XML_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("xml comment regex is valid"));

static NON_PROJECT_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<dependencyManagement>.*?</dependencyManagement>|<plugins>.*?</plugins>")
        .expect("pom block regex is valid")
});

static DEPENDENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<dependency>(.*?)</dependency>").expect("dependency regex is valid"));

static PROPERTIES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<properties>(.*?)</properties>").expect("properties regex is valid"));

static XML_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([A-Za-z0-9_.\-]+)>\s*([^<]*?)\s*</[A-Za-z0-9_.\-]+>").expect("element regex is valid")
});

static PROPERTY_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$\{([^}]+)\}$").expect("property reference regex is valid"));

static GRADLE_COORDINATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)^\s*(implementation|api|compile|compileOnly|runtimeOnly|testImplementation|testRuntimeOnly|testCompileOnly|testCompile|annotationProcessor|kapt)\s*\(?\s*["']([^"':\s]+):([^"':\s]+)(?::([^"'\s]+))?["']"#,
    )
    .expect("gradle coordinate regex is valid")
});

fn element<'a>(block: &'a str, tag: &str) -> Option<&'a str> {
    XML_ELEMENT
        .captures_iter(block)
        .find(|c| &c[1] == tag)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str())
}

/// Parser for Maven `pom.xml`.
pub struct MavenPomParser;

impl MavenPomParser {
    fn properties(content: &str) -> HashMap<String, String> {
        let mut props = HashMap::new();
        if let Some(block) = PROPERTIES.captures(content).and_then(|c| c.get(1)) {
            for cap in XML_ELEMENT.captures_iter(block.as_str()) {
                props.insert(cap[1].to_string(), cap[2].to_string());
            }
        }
        props
    }

    fn kind(scope: Option<&str>, optional: Option<&str>) -> DependencyKind {
        if optional == Some("true") {
            return DependencyKind::Optional;
        }
        match scope {
            Some("test") => DependencyKind::Development,
            Some("provided") => DependencyKind::Peer,
            _ => DependencyKind::Production,
        }
    }
}

impl ManifestParser for MavenPomParser {
    fn name(&self) -> &'static str {
        "pom.xml"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Java
    }

    fn supports_file(&self, file_name: &str) -> bool {
        file_name == "pom.xml"
    }

    fn parse(&self, content: &str) -> ParseResult<Vec<ManifestEntry>> {
        if !content.contains("<project") {
            return Err(ParseError::InvalidManifest(
                "pom.xml has no <project> element".to_string(),
            ));
        }

        let content = XML_COMMENT.replace_all(content, "");
        let props = Self::properties(&content);
        let body = NON_PROJECT_BLOCKS.replace_all(&content, "");

        let mut entries = Vec::new();
        for cap in DEPENDENCY.captures_iter(&body) {
            let block = &cap[1];
            let Some(artifact) = element(block, "artifactId") else {
                continue;
            };
            let name = match element(block, "groupId") {
                Some(group) => format!("{}:{}", group, artifact),
                None => artifact.to_string(),
            };

            let version = element(block, "version").unwrap_or_default();
            let version = match PROPERTY_REF.captures(version) {
                Some(prop) => props
                    .get(&prop[1])
                    .cloned()
                    .unwrap_or_else(|| version.to_string()),
                None => version.to_string(),
            };

            let kind = Self::kind(element(block, "scope"), element(block, "optional"));
            entries.push(ManifestEntry::with_kind(name, version, kind));
        }

        Ok(entries)
    }
}

/// Parser for Gradle build scripts (Groovy and Kotlin DSL).
pub struct GradleParser;

impl GradleParser {
    fn kind(configuration: &str) -> DependencyKind {
        if configuration.starts_with("test") {
            DependencyKind::Development
        } else if matches!(configuration, "compileOnly" | "annotationProcessor" | "kapt") {
            DependencyKind::Build
        } else {
            DependencyKind::Production
        }
    }
}

impl ManifestParser for GradleParser {
    fn name(&self) -> &'static str {
        "build.gradle"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Java
    }

    fn supports_file(&self, file_name: &str) -> bool {
        matches!(file_name, "build.gradle" | "build.gradle.kts")
    }

    fn parse(&self, content: &str) -> ParseResult<Vec<ManifestEntry>> {
        Ok(GRADLE_COORDINATE
            .captures_iter(content)
            .map(|cap| {
                let name = format!("{}:{}", &cap[2], &cap[3]);
                let version = cap.get(4).map(|m| m.as_str()).unwrap_or_default();
                ManifestEntry::with_kind(name, version, Self::kind(&cap[1]))
            })
            .collect())
    }
}
