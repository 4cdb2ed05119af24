//! Where manifests come from.
//!
//! The graph builder never touches the filesystem directly; it asks a
//! [`ManifestSource`] for the repository's own manifests and for the
//! manifests of each dependency it expands.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component as PathComponent, Path, PathBuf};

use walkdir::WalkDir;

use crate::graph::Component;
use crate::parser::{ManifestFile, ParseError, ParseResult, ParserRegistry};

/// Supplies manifest files to the graph builder.
///
/// Each returned item is either a readable manifest or the error that
/// prevented reading it, so a single bad file never hides the others.
pub trait ManifestSource {
    /// Name used for the root component when the caller gives none.
    fn project_name(&self) -> String;

    /// Manifests declared by the analyzed repository itself.
    fn root_manifests(&self, registry: &ParserRegistry) -> Vec<ParseResult<ManifestFile>>;

    /// Manifests declared by a dependency, empty when none are available.
    fn component_manifests(
        &self,
        component: &Component,
        registry: &ParserRegistry,
    ) -> Vec<ParseResult<ManifestFile>>;
}

/// A local checkout on disk.
///
/// Root manifests are the supported files directly inside the root
/// directory. A dependency named `name` is looked up under each configured
/// dependency directory, e.g. `vendor/<name>` or `node_modules/<name>`;
/// the first directory that exists wins.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    dependency_dirs: Vec<String>,
}

impl DirectorySource {
    /// Creates a source rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Io`] if `root` is not a readable directory.
    pub fn new(root: impl Into<PathBuf>, dependency_dirs: Vec<String>) -> ParseResult<Self> {
        let root = root.into();
        let metadata = fs::metadata(&root).map_err(|source| ParseError::Io {
            path: root.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(ParseError::Io {
                path: root,
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            });
        }

        Ok(Self {
            root,
            dependency_dirs,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dependency_root(&self, name: &str) -> Option<PathBuf> {
        // Names become path segments; refuse anything that could escape
        let relative = Path::new(name);
        if !relative
            .components()
            .all(|c| matches!(c, PathComponent::Normal(_)))
        {
            return None;
        }

        self.dependency_dirs
            .iter()
            .map(|dir| self.root.join(dir).join(relative))
            .find(|candidate| candidate.is_dir())
    }

    fn manifests_in(&self, dir: &Path, registry: &ParserRegistry) -> Vec<ParseResult<ManifestFile>> {
        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        return None;
                    }
                    let name = entry.file_name().to_str()?;
                    registry
                        .supports(name)
                        .then(|| self.read(entry.path()))
                }
                Err(err) => {
                    let path = err.path().unwrap_or(dir).to_path_buf();
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "directory loop"));
                    Some(Err(ParseError::Io { path, source }))
                }
            })
            .collect()
    }

    fn read(&self, path: &Path) -> ParseResult<ManifestFile> {
        // Failures and manifests are both reported relative to the checkout
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let content = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: relative.to_path_buf(),
            source,
        })?;
        Ok(ManifestFile::new(relative, content))
    }
}

impl ManifestSource for DirectorySource {
    fn project_name(&self) -> String {
        let resolved = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        resolved
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| "project".to_string())
    }

    fn root_manifests(&self, registry: &ParserRegistry) -> Vec<ParseResult<ManifestFile>> {
        self.manifests_in(&self.root, registry)
    }

    fn component_manifests(
        &self,
        component: &Component,
        registry: &ParserRegistry,
    ) -> Vec<ParseResult<ManifestFile>> {
        match self.dependency_root(&component.name) {
            Some(dir) => self.manifests_in(&dir, registry),
            None => Vec::new(),
        }
    }
}

/// Manifests held in memory, keyed by component name.
///
/// Useful for tests and for callers that fetch manifests themselves.
///
/// # Example
///
/// ```rust
/// use chainscope::analysis::InMemorySource;
///
/// let source = InMemorySource::new("demo")
///     .with_root_manifest("requirements.txt", "flask==3.0\n")
///     .with_component_manifest("flask", "requirements.txt", "werkzeug>=3.0\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    name: String,
    root: Vec<ManifestFile>,
    components: BTreeMap<String, Vec<ManifestFile>>,
}

impl InMemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a manifest of the analyzed repository.
    pub fn with_root_manifest(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.root.push(ManifestFile::new(path, content));
        self
    }

    /// Adds a manifest declared by the dependency `component`.
    pub fn with_component_manifest(
        mut self,
        component: impl Into<String>,
        path: impl Into<PathBuf>,
        content: impl Into<String>,
    ) -> Self {
        self.components
            .entry(component.into())
            .or_default()
            .push(ManifestFile::new(path, content));
        self
    }

    fn supported(files: &[ManifestFile], registry: &ParserRegistry) -> Vec<ParseResult<ManifestFile>> {
        files
            .iter()
            .filter(|f| registry.supports(f.file_name()))
            .cloned()
            .map(Ok)
            .collect()
    }
}

impl ManifestSource for InMemorySource {
    fn project_name(&self) -> String {
        self.name.clone()
    }

    fn root_manifests(&self, registry: &ParserRegistry) -> Vec<ParseResult<ManifestFile>> {
        Self::supported(&self.root, registry)
    }

    fn component_manifests(
        &self,
        component: &Component,
        registry: &ParserRegistry,
    ) -> Vec<ParseResult<ManifestFile>> {
        self.components
            .get(&component.name)
            .map(|files| Self::supported(files, registry))
            .unwrap_or_default()
    }
}
