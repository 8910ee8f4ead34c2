use regex::{Regex, RegexBuilder};
use thiserror::Error;

const REGEXP_PREFIX: &str = "regexp:";
const REGEXP_IGNORE_CASE_PREFIX: &str = "regexpIgnoreCase:";

/// Error raised when a configured pattern cannot be compiled.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The regular expression failed to compile.
    #[error("invalid pattern {pattern:?}: {source}")]
    Regex {
        /// The pattern as written in the configuration.
        pattern: String,
        /// Compiler diagnostics.
        #[source]
        source: regex::Error,
    },
    /// A `%XX` escape in a regex pattern was malformed or decoded to
    /// invalid UTF-8.
    #[error("invalid percent-escape in pattern {pattern:?}")]
    Escape {
        /// The pattern as written in the configuration.
        pattern: String,
    },
}

/// One compiled include or exclude pattern.
#[derive(Clone, Debug)]
pub enum Pattern {
    /// Literal path prefix.
    Prefix(String),
    /// Regular expression, searched anywhere in the path.
    Regex(Regex),
}

impl Pattern {
    /// Compiles a configuration string into a pattern.
    pub fn parse(spec: &str) -> Result<Self, PatternError> {
        if let Some(raw) = spec.strip_prefix(REGEXP_PREFIX) {
            Self::compile(spec, raw, false)
        } else if let Some(raw) = spec.strip_prefix(REGEXP_IGNORE_CASE_PREFIX) {
            Self::compile(spec, raw, true)
        } else {
            Ok(Self::Prefix(spec.to_owned()))
        }
    }

    fn compile(spec: &str, raw: &str, ignore_case: bool) -> Result<Self, PatternError> {
        let decoded = percent_decode(raw).ok_or_else(|| PatternError::Escape {
            pattern: spec.to_owned(),
        })?;
        // multi_line stays off: `^`/`$` anchor the whole path, so embedded
        // line separators cannot cut matching short.
        let regex = RegexBuilder::new(&decoded)
            .multi_line(false)
            .case_insensitive(ignore_case)
            .build()
            .map_err(|source| PatternError::Regex {
                pattern: spec.to_owned(),
                source,
            })?;
        Ok(Self::Regex(regex))
    }

    /// Tests the pattern against a path.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Prefix(prefix) => path.starts_with(prefix),
            Self::Regex(regex) => regex.is_match(path),
        }
    }
}

/// Decodes `%XX` escapes to bytes and re-validates the result as UTF-8.
///
/// Returns `None` on a truncated or non-hex escape, or when the decoded
/// byte sequence is not valid UTF-8.
fn percent_decode(raw: &str) -> Option<String> {
    if !raw.contains('%') {
        return Some(raw.to_owned());
    }
    let mut bytes = Vec::with_capacity(raw.len());
    let mut iter = raw.bytes();
    while let Some(byte) = iter.next() {
        if byte == b'%' {
            let hi = iter.next()?;
            let lo = iter.next()?;
            let hex = [hi, lo];
            let hex = std::str::from_utf8(&hex).ok()?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
        } else {
            bytes.push(byte);
        }
    }
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_pattern_is_a_prefix() {
        let pattern = Pattern::parse("/foo/bar/").unwrap();
        assert!(pattern.matches("/foo/bar/baz.txt"));
        assert!(!pattern.matches("/bar/foo/baz.txt"));
    }

    #[test]
    fn regexp_prefix_selects_regex_syntax() {
        let pattern = Pattern::parse("regexp:\\.txt$").unwrap();
        assert!(pattern.matches("/foo/a.txt"));
        assert!(!pattern.matches("/foo/a.txt.bak"));
    }

    #[test]
    fn regexp_ignore_case_is_case_insensitive() {
        let pattern = Pattern::parse("regexpIgnoreCase:smb://FOO.com/").unwrap();
        assert!(pattern.matches("smb://foo.com/baz"));
    }

    #[test]
    fn percent_escapes_decode_before_compilation() {
        let pattern = Pattern::parse("regexp:/b%0d%0ar/").unwrap();
        assert!(pattern.matches("/b\r\nr/baz.txt"));

        // Multi-byte escape: U+0085 (NEL) is %c2%85 in UTF-8.
        let pattern = Pattern::parse("regexp:/b%c2%85r/").unwrap();
        assert!(pattern.matches("/b\u{0085}r/baz.txt"));
    }

    #[test]
    fn malformed_escapes_are_rejected() {
        assert!(matches!(
            Pattern::parse("regexp:/b%0/"),
            Err(PatternError::Escape { .. })
        ));
        assert!(matches!(
            Pattern::parse("regexp:/b%zz/"),
            Err(PatternError::Escape { .. })
        ));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(matches!(
            Pattern::parse("regexp:("),
            Err(PatternError::Regex { .. })
        ));
    }

    #[test]
    fn plain_patterns_never_percent_decode() {
        let pattern = Pattern::parse("/foo/%41/").unwrap();
        assert!(pattern.matches("/foo/%41/x"));
        assert!(!pattern.matches("/foo/A/x"));
    }
}
