use std::collections::VecDeque;

use fscrawl_filters::FilePatternMatcher;
use fscrawl_vfs::{ReadonlyFile, VfsError};
use tracing::{debug, warn};

struct Frame {
    // Children in traversal order, cheapest removal at the front.
    children: VecDeque<ReadonlyFile>,
}

/// Lazy depth-first walk of one root.
///
/// `next` returns accepted nodes in traversal order; `push_back` parks one
/// already-returned node so the consumer can retry it after a transient
/// failure downstream.
pub struct FileIterator {
    stack: Vec<Frame>,
    pushback: Option<ReadonlyFile>,
    matcher: FilePatternMatcher,
    if_modified_since: i64,
    return_directories: bool,
}

impl FileIterator {
    /// Creates an iterator over `root`.
    ///
    /// Regular files are admitted when the matcher accepts their full path
    /// and their last-modified time is at or after `if_modified_since`
    /// (pass `0` for a full traversal). With `return_directories` set, every
    /// traversed directory (the root included) is surfaced before its
    /// children so inheritance ACL documents can be emitted for it.
    #[must_use]
    pub fn new(
        root: ReadonlyFile,
        matcher: FilePatternMatcher,
        if_modified_since: i64,
        return_directories: bool,
    ) -> Self {
        Self {
            stack: vec![Frame {
                children: VecDeque::from([root]),
            }],
            pushback: None,
            matcher,
            if_modified_since,
            return_directories,
        }
    }

    /// Parks `file` to be returned by the next call to [`Self::next`].
    ///
    /// # Panics
    ///
    /// Panics if a pushed-back file is already pending; callers must
    /// interleave `push_back` with `next`.
    pub fn push_back(&mut self, file: ReadonlyFile) {
        assert!(
            self.pushback.is_none(),
            "push_back called while a pushed-back file is pending"
        );
        self.pushback = Some(file);
    }

    /// Returns the next accepted node, or `None` at end of stream.
    ///
    /// # Errors
    ///
    /// Transient repository failures surface as `Err`; the iterator stays
    /// positioned on the failing node, so calling `next` again retries it.
    pub fn next(&mut self) -> Result<Option<ReadonlyFile>, VfsError> {
        if let Some(file) = self.pushback.take() {
            return Ok(Some(file));
        }

        loop {
            let Some(frame) = self.stack.last_mut() else {
                return Ok(None);
            };
            let Some(file) = frame.children.pop_front() else {
                self.stack.pop();
                continue;
            };

            match self.process(&file) {
                Ok(Step::Return) => return Ok(Some(file)),
                Ok(Step::Skip) => {}
                Err(e) if e.is_transient() => {
                    // Reprocess the same node after the caller's pause.
                    if let Some(frame) = self.stack.last_mut() {
                        frame.children.push_front(file);
                    }
                    return Err(e);
                }
                Err(e) if e.is_listing() => {
                    warn!(path = %file.path(), error = %e, "skipping forbidden subtree");
                }
                Err(e) => {
                    warn!(path = %file.path(), error = %e, "skipping unreadable node");
                }
            }
        }
    }

    /// Classifies one node and, for directories, pushes its child frame.
    fn process(&mut self, file: &ReadonlyFile) -> Result<Step, VfsError> {
        if file.is_hidden()? {
            debug!(path = %file.path(), "skipping hidden node");
            return Ok(Step::Skip);
        }
        if !file.can_read()? {
            debug!(path = %file.path(), "skipping unreadable node");
            return Ok(Step::Skip);
        }

        if file.is_directory()? {
            let children = file.list_files()?;
            self.stack.push(Frame {
                children: children.into(),
            });
            return Ok(if self.return_directories {
                Step::Return
            } else {
                Step::Skip
            });
        }

        if !file.is_regular_file()? {
            debug!(path = %file.path(), "skipping special node");
            return Ok(Step::Skip);
        }
        if !self.matcher.accepts(&file.path()) {
            debug!(path = %file.path(), "skipping excluded file");
            return Ok(Step::Skip);
        }
        if self.if_modified_since > 0 && !file.is_modified_since(self.if_modified_since)? {
            debug!(path = %file.path(), "skipping unmodified file");
            return Ok(Step::Skip);
        }
        Ok(Step::Return)
    }
}

enum Step {
    Return,
    Skip,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fscrawl_vfs::{InjectedError, MemoryFileSystem};

    fn collect_paths(iter: &mut FileIterator) -> Vec<String> {
        let mut paths = Vec::new();
        while let Some(file) = iter.next().expect("next") {
            paths.push(file.path());
        }
        paths
    }

    fn sample() -> MemoryFileSystem {
        let fs = MemoryFileSystem::new("/root");
        fs.add_file("/root/abc", b"1");
        fs.add_dir("/root/foo");
        fs.add_file("/root/foo/x", b"2");
        fs.add_file("/root/foo.bar", b"3");
        fs
    }

    fn iterator(fs: &MemoryFileSystem, return_directories: bool) -> FileIterator {
        FileIterator::new(
            fs.open("/root", None),
            FilePatternMatcher::accept_all(),
            0,
            return_directories,
        )
    }

    #[test]
    fn emits_depth_first_order() {
        let fs = sample();
        let mut iter = iterator(&fs, false);
        assert_eq!(
            collect_paths(&mut iter),
            vec!["/root/abc", "/root/foo/x", "/root/foo.bar"]
        );
    }

    #[test]
    fn directories_returned_mode_surfaces_directories_first() {
        let fs = sample();
        let mut iter = iterator(&fs, true);
        assert_eq!(
            collect_paths(&mut iter),
            vec![
                "/root/",
                "/root/abc",
                "/root/foo/",
                "/root/foo/x",
                "/root/foo.bar"
            ]
        );
    }

    #[test]
    fn pushback_returns_the_same_file_next() {
        let fs = sample();
        let mut iter = iterator(&fs, false);
        let first = iter.next().expect("next").expect("file");
        assert_eq!(first.path(), "/root/abc");

        iter.push_back(first);
        let again = iter.next().expect("next").expect("file");
        assert_eq!(again.path(), "/root/abc");

        // Stream then continues where it left off.
        let following = iter.next().expect("next").expect("file");
        assert_eq!(following.path(), "/root/foo/x");
    }

    #[test]
    #[should_panic(expected = "push_back called while a pushed-back file is pending")]
    fn double_pushback_is_a_programming_error() {
        let fs = sample();
        let mut iter = iterator(&fs, false);
        let first = iter.next().expect("next").expect("file");
        iter.push_back(first.clone());
        iter.push_back(first);
    }

    #[test]
    fn hidden_file_is_skipped() {
        let fs = sample();
        fs.set_hidden("/root/abc", true);
        let mut iter = iterator(&fs, false);
        assert_eq!(
            collect_paths(&mut iter),
            vec!["/root/foo/x", "/root/foo.bar"]
        );
    }

    #[test]
    fn hidden_directory_prunes_its_subtree() {
        let fs = sample();
        fs.set_hidden("/root/foo", true);
        let mut iter = iterator(&fs, false);
        assert_eq!(collect_paths(&mut iter), vec!["/root/abc", "/root/foo.bar"]);
    }

    #[test]
    fn unreadable_file_is_skipped() {
        let fs = sample();
        fs.set_readable("/root/foo.bar", false);
        let mut iter = iterator(&fs, false);
        assert_eq!(collect_paths(&mut iter), vec!["/root/abc", "/root/foo/x"]);
    }

    #[test]
    fn modified_since_filters_old_files() {
        let fs = sample();
        fs.set_last_modified("/root/abc", 1_000);
        fs.set_last_modified("/root/foo/x", 5_000);
        fs.set_last_modified("/root/foo.bar", 2_000);

        let mut iter = FileIterator::new(
            fs.open("/root", None),
            FilePatternMatcher::accept_all(),
            2_000,
            false,
        );
        assert_eq!(
            collect_paths(&mut iter),
            vec!["/root/foo/x", "/root/foo.bar"]
        );
    }

    #[test]
    fn matcher_rejects_files_but_not_directories() {
        let fs = sample();
        let matcher =
            FilePatternMatcher::new(vec!["/root/"], vec!["/root/foo/"]).expect("matcher");
        let mut iter = FileIterator::new(fs.open("/root", None), matcher, 0, false);
        // The exclusion applies to files under /root/foo/, while the
        // directory itself is still traversed.
        assert_eq!(collect_paths(&mut iter), vec!["/root/abc", "/root/foo.bar"]);
    }

    #[test]
    fn forbidden_listing_prunes_one_subtree() {
        let fs = sample();
        fs.fail_always("/root/foo", InjectedError::Listing);
        let mut iter = iterator(&fs, false);
        assert_eq!(collect_paths(&mut iter), vec!["/root/abc", "/root/foo.bar"]);
    }

    #[test]
    fn transient_failure_is_resumable() {
        let fs = sample();
        fs.fail_once("/root/foo", InjectedError::Transient);
        let mut iter = iterator(&fs, false);

        assert_eq!(
            iter.next().expect("next").expect("file").path(),
            "/root/abc"
        );
        // The directory fails transiently once...
        assert!(iter.next().expect_err("transient").is_transient());
        // ...and the retry picks it up again, in order.
        assert_eq!(
            collect_paths(&mut iter),
            vec!["/root/foo/x", "/root/foo.bar"]
        );
    }

    #[test]
    fn permanent_failure_skips_the_node() {
        let fs = sample();
        fs.fail_always("/root/abc", InjectedError::Document);
        let mut iter = iterator(&fs, false);
        assert_eq!(
            collect_paths(&mut iter),
            vec!["/root/foo/x", "/root/foo.bar"]
        );
    }
}
