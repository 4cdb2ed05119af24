//! Parser for Go `go.mod` files.

use super::error::{ParseError, ParseResult};
use super::registry::ManifestParser;
use super::types::{Ecosystem, ManifestEntry};

/// Directives that carry no dependency declarations.
const IGNORED_DIRECTIVES: [&str; 9] = [
    "module", "go", "toolchain", "replace", "exclude", "retract", "godebug", "tool", "ignore",
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Require,
    Ignored,
}

/// Parser for `go.mod`.
///
/// Understands single-line `require path version` directives and
/// parenthesized `require ( ... )` blocks. `// indirect` requirements are
/// kept; other directives, including ones newer than this parser, are
/// skipped.
pub struct GoModParser;

impl GoModParser {
    fn parse_require(line_no: usize, raw: &str, spec: &str) -> ParseResult<ManifestEntry> {
        let mut parts = spec.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(path), Some(version), None) => Ok(ManifestEntry::new(path, version)),
            (Some(_), None, _) => Err(ParseError::malformed(line_no, raw, "missing module version")),
            _ => Err(ParseError::malformed(line_no, raw, "expected 'path version'")),
        }
    }
}

impl ManifestParser for GoModParser {
    fn name(&self) -> &'static str {
        "go.mod"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Go
    }

    fn supports_file(&self, file_name: &str) -> bool {
        file_name == "go.mod"
    }

    fn parse(&self, content: &str) -> ParseResult<Vec<ManifestEntry>> {
        let mut entries = Vec::new();
        let mut block = Block::None;
        let mut block_start = 0;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.split("//").next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            if block != Block::None {
                if line == ")" {
                    block = Block::None;
                } else if block == Block::Require {
                    entries.push(Self::parse_require(line_no, raw, line)?);
                }
                continue;
            }

            let (directive, rest) = match line.split_once(char::is_whitespace) {
                Some((directive, rest)) => (directive, rest.trim()),
                None => (line, ""),
            };

            if directive == "require" {
                if rest == "(" {
                    block = Block::Require;
                    block_start = line_no;
                } else {
                    entries.push(Self::parse_require(line_no, raw, rest)?);
                }
            } else {
                if !IGNORED_DIRECTIVES.contains(&directive) {
                    tracing::debug!(line = line_no, directive, "skipping unknown go.mod directive");
                }
                if rest == "(" {
                    block = Block::Ignored;
                    block_start = line_no;
                }
            }
        }

        if block != Block::None {
            return Err(ParseError::malformed(block_start, "(", "unterminated block"));
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_GO_MOD: &str = r#"module github.com/example/app

go 1.21

require github.com/spf13/cobra v1.8.0

require (
	github.com/stretchr/testify v1.9.0
	golang.org/x/sys v0.15.0 // indirect
)

replace (
	github.com/old/dep => github.com/new/dep v1.0.0
)
"#;

    #[test]
    fn test_parse_go_mod() {
        let entries = GoModParser.parse(SAMPLE_GO_MOD).unwrap();
        let pairs: Vec<_> = entries.iter().map(|e| e.as_pair()).collect();
        assert_eq!(
            pairs,
            vec![
                ("github.com/spf13/cobra", "v1.8.0"),
                ("github.com/stretchr/testify", "v1.9.0"),
                ("golang.org/x/sys", "v0.15.0"),
            ]
        );
    }

    #[test]
    fn test_missing_version_is_malformed() {
        let content = "module x\n\nrequire (\n\tgithub.com/a/b\n)\n";
        match GoModParser.parse(content).unwrap_err() {
            ParseError::MalformedLine { line, reason, .. } => {
                assert_eq!(line, 4);
                assert_eq!(reason, "missing module version");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unterminated_block() {
        let content = "module x\nrequire (\n\tgithub.com/a/b v1.0.0\n";
        assert!(matches!(
            GoModParser.parse(content),
            Err(ParseError::MalformedLine { line: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_directives_are_skipped() {
        let content = "module x\n\ngo 1.24\n\ntool golang.org/x/tools/cmd/stringer\n\nignore (\n\t./node_modules\n\t./third_party\n)\n\nfrobnicate y\n\nrequire github.com/a/b v1.0.0\n";
        let entries = GoModParser.parse(content).unwrap();
        let pairs: Vec<_> = entries.iter().map(|e| e.as_pair()).collect();
        assert_eq!(pairs, vec![("github.com/a/b", "v1.0.0")]);
    }

    #[test]
    fn test_malformed_require_still_rejected() {
        assert!(GoModParser.parse("module x\nfrobnicate y\nrequire\n").is_err());
    }
}
