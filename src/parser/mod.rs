//! Manifest parsing for chainscope.
//!
//! Each supported file format has a [`ManifestParser`] implementation;
//! the [`ParserRegistry`] maps ecosystem tags to parsers and picks one by
//! file name.
//!
//! # Supported Formats
//!
//! - **requirements*.txt**, **pyproject.toml**, **setup.py** (Python)
//! - **package.json** (Node.js) - standard dependency maps only
//! - **pom.xml**, **build.gradle(.kts)** (Java) - best effort
//! - **go.mod** (Go)
//! - **Cargo.toml** (Rust)
//!
//! # Example
//!
//! ```
//! use chainscope::parser::{Ecosystem, ManifestFile, ParserRegistry};
//!
//! let registry = ParserRegistry::with_defaults();
//! let file = ManifestFile::new("requirements.txt", "foo==1.2\nbar>=2.0\n");
//! let parsed = registry.parse(&file).unwrap();
//!
//! assert_eq!(parsed.ecosystem, Ecosystem::Python);
//! assert_eq!(parsed.entries[0].as_pair(), ("foo", "==1.2"));
//! ```

pub mod cargo_toml;
pub mod error;
pub mod go_mod;
pub mod java;
pub mod package_json;
pub mod python;
pub mod registry;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{ParseError, ParseResult};
pub use registry::{ManifestParser, ParsedManifest, ParserRegistry};
pub use types::{DependencyKind, Ecosystem, ManifestEntry, ManifestFile, ANY_VERSION};
