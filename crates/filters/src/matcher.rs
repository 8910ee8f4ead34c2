use std::sync::Arc;

use crate::pattern::{Pattern, PatternError};

/// Glob- and regex-based path admission filter.
///
/// Cheap to clone; the compiled pattern lists are shared.
#[derive(Clone, Debug)]
pub struct FilePatternMatcher {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    includes: Vec<Pattern>,
    excludes: Vec<Pattern>,
}

impl FilePatternMatcher {
    /// Compiles include and exclude pattern lists.
    pub fn new<I, E>(includes: I, excludes: E) -> Result<Self, PatternError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Ok(Self {
            inner: Arc::new(Inner {
                includes: compile(includes)?,
                excludes: compile(excludes)?,
            }),
        })
    }

    /// A matcher that accepts every path.
    #[must_use]
    pub fn accept_all() -> Self {
        Self {
            inner: Arc::new(Inner {
                includes: vec![Pattern::Prefix(String::new())],
                excludes: Vec::new(),
            }),
        }
    }

    /// Returns true iff at least one include pattern matches `path` and no
    /// exclude pattern does.
    #[must_use]
    pub fn accepts(&self, path: &str) -> bool {
        self.inner.includes.iter().any(|p| p.matches(path))
            && !self.inner.excludes.iter().any(|p| p.matches(path))
    }
}

fn compile<I>(specs: I) -> Result<Vec<Pattern>, PatternError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    specs.into_iter().map(|s| Pattern::parse(s.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_requires_include_and_no_exclude() {
        let matcher = FilePatternMatcher::new(
            vec!["smb://foo.com/", "/foo/bar/"],
            vec!["smb://foo.com/secret/", "/foo/bar/hidden/"],
        )
        .unwrap();

        assert!(matcher.accepts("smb://foo.com/baz.txt"));
        assert!(matcher.accepts("/foo/bar/baz.txt"));
        assert!(!matcher.accepts("smb://notfoo/com/zippy"));
        assert!(!matcher.accepts("smb://foo.com/secret/private_key"));
        assert!(!matcher.accepts("/foo/bar/hidden/leak.png"));
        assert!(!matcher.accepts("/bar/foo/public/knowledge"));
    }

    #[test]
    fn accept_all_accepts_everything() {
        let matcher = FilePatternMatcher::accept_all();
        assert!(matcher.accepts("/anything"));
        assert!(matcher.accepts("smb://host/share/file"));
        assert!(matcher.accepts(""));
    }

    #[test]
    fn empty_include_list_rejects_everything() {
        let matcher =
            FilePatternMatcher::new(Vec::<&str>::new(), Vec::<&str>::new()).unwrap();
        assert!(!matcher.accepts("/foo"));
    }
}
