//! Errors raised while reading or parsing manifests.

use std::path::PathBuf;

/// Errors that can occur during manifest parsing.
///
/// Every variant is non-fatal to an analysis run: the graph builder logs the
/// failure, records it in the report and moves on to the next manifest.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to read the manifest from disk.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse JSON content.
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to parse TOML content.
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A line does not match the manifest's line grammar.
    #[error("Malformed line {line}: '{content}' ({reason})")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        content: String,
        reason: String,
    },

    /// The manifest structure is invalid as a whole.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// No registered parser accepts this file.
    #[error("No parser registered for '{0}'")]
    Unsupported(String),
}

impl ParseError {
    /// Builds a [`ParseError::MalformedLine`].
    pub fn malformed(line: usize, content: &str, reason: impl Into<String>) -> Self {
        ParseError::MalformedLine {
            line,
            content: content.trim().to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;
