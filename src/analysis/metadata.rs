//! Offline component metadata.
//!
//! Risk inputs such as popularity or known CVEs are not fetched from any
//! registry. Callers may provide a JSON catalog keyed by component name:
//!
//! ```json
//! {
//!   "requests": { "popularity": 0.95, "release_age_days": 40, "known_cves": 0 },
//!   "left-pad": { "popularity": 0.2, "release_age_days": 2900 }
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::graph::ComponentMetadata;
use crate::parser::{ParseError, ParseResult};

/// Metadata lookup by component name.
#[derive(Debug, Clone, Default)]
pub struct MetadataCatalog {
    entries: HashMap<String, ComponentMetadata>,
}

impl MetadataCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a catalog from JSON text.
    pub fn from_json_str(content: &str) -> ParseResult<Self> {
        let entries: HashMap<String, ComponentMetadata> = serde_json::from_str(content)?;
        Ok(Self { entries })
    }

    /// Loads a catalog from a JSON file.
    pub fn load(path: &Path) -> ParseResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&content)?;
        tracing::debug!(path = %path.display(), entries = catalog.len(), "loaded metadata catalog");
        Ok(catalog)
    }

    /// Adds or replaces the metadata for one component.
    pub fn insert(&mut self, name: impl Into<String>, metadata: ComponentMetadata) {
        self.entries.insert(name.into(), metadata);
    }

    /// Metadata for `name`, empty when the catalog has no entry.
    pub fn lookup(&self, name: &str) -> ComponentMetadata {
        self.entries.get(name).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
