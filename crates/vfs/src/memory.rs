//! In-memory filesystem for tests and fixtures.
//!
//! Supports directories, file content, hidden and unreadable nodes, the full
//! ACL surface, and per-node error injection so traversal error handling can
//! be exercised without a network.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use fscrawl_acl::Acl;

use crate::file::{ContentStream, Node};
use crate::order::traversal_cmp;
use crate::{Credentials, FileSystemKind, ReadonlyFile, VfsError};

/// Which error tier an injected failure reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InjectedError {
    /// Transient repository failure; fires on any access.
    Transient,
    /// Permanent document failure; fires on any access.
    Document,
    /// Listing-not-authorized; fires only when the directory is listed.
    Listing,
    /// Bare I/O failure, fired only when content is opened. Metadata reads
    /// are unaffected.
    Open,
}

#[derive(Clone, Debug, Default)]
struct MemEntry {
    directory: bool,
    content: Vec<u8>,
    last_modified: i64,
    hidden: bool,
    readable: bool,
    acl: Option<Acl>,
    inherited: Option<Acl>,
    container_inherit: Option<Acl>,
    file_inherit: Option<Acl>,
    share: Option<Acl>,
    error: Option<(InjectedError, bool)>,
}

impl MemEntry {
    fn dir() -> Self {
        Self {
            directory: true,
            readable: true,
            last_modified: 1,
            ..Self::default()
        }
    }

    fn file(content: &[u8]) -> Self {
        Self {
            content: content.to_vec(),
            readable: true,
            last_modified: 1,
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, MemEntry>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    // Without trailing separator.
    root: String,
}

/// A shared, mutable, in-memory tree exposed through [`ReadonlyFile`].
#[derive(Clone, Debug)]
pub struct MemoryFileSystem {
    shared: Arc<Shared>,
}

impl MemoryFileSystem {
    /// Creates a filesystem whose root directory is `root` (a POSIX-style
    /// absolute path or any URL-shaped prefix).
    #[must_use]
    pub fn new(root: &str) -> Self {
        let root = root.trim_end_matches('/').to_owned();
        let mut state = State::default();
        state.entries.insert(root.clone(), MemEntry::dir());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                root,
            }),
        }
    }

    /// The root path this filesystem claims.
    #[must_use]
    pub fn root(&self) -> String {
        format!("{}/", self.shared.root)
    }

    /// True if `path` falls under this filesystem's root.
    #[must_use]
    pub fn is_path(&self, path: &str) -> bool {
        let normalized = path.trim().trim_end_matches('/');
        normalized == self.shared.root
            || normalized
                .strip_prefix(self.shared.root.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Creates a node for `path`.
    #[must_use]
    pub fn open(&self, path: &str, _credentials: Option<&Credentials>) -> ReadonlyFile {
        ReadonlyFile::Memory(MemoryFile {
            shared: Arc::clone(&self.shared),
            path: normalize(path),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Adds a directory, creating missing ancestors.
    pub fn add_dir(&self, path: &str) {
        let path = normalize(path);
        let mut state = self.lock();
        insert_with_ancestors(&mut state, &path, MemEntry::dir());
    }

    /// Adds a regular file, creating missing ancestors.
    pub fn add_file(&self, path: &str, content: &[u8]) {
        let path = normalize(path);
        let mut state = self.lock();
        insert_with_ancestors(&mut state, &path, MemEntry::file(content));
    }

    /// Replaces a file's content without touching its timestamp.
    pub fn write_file(&self, path: &str, content: &[u8]) {
        if let Some(entry) = self.lock().entries.get_mut(&normalize(path)) {
            entry.content = content.to_vec();
        }
    }

    /// Removes a node and everything under it.
    pub fn remove(&self, path: &str) {
        let path = normalize(path);
        let prefix = format!("{path}/");
        self.lock()
            .entries
            .retain(|key, _| key != &path && !key.starts_with(&prefix));
    }

    /// Sets a node's last-modified millis.
    pub fn set_last_modified(&self, path: &str, millis: i64) {
        self.update(path, |entry| entry.last_modified = millis);
    }

    /// Marks a node hidden or visible.
    pub fn set_hidden(&self, path: &str, hidden: bool) {
        self.update(path, |entry| entry.hidden = hidden);
    }

    /// Marks a node readable or unreadable.
    pub fn set_readable(&self, path: &str, readable: bool) {
        self.update(path, |entry| entry.readable = readable);
    }

    /// Sets the node's own ACL.
    pub fn set_acl(&self, path: &str, acl: Acl) {
        self.update(path, |entry| entry.acl = Some(acl));
    }

    /// Sets the ACL the node inherits from its ancestors.
    pub fn set_inherited_acl(&self, path: &str, acl: Acl) {
        self.update(path, |entry| entry.inherited = Some(acl));
    }

    /// Sets the ACL subordinate directories would inherit.
    pub fn set_container_inherit_acl(&self, path: &str, acl: Acl) {
        self.update(path, |entry| entry.container_inherit = Some(acl));
    }

    /// Sets the ACL subordinate files would inherit.
    pub fn set_file_inherit_acl(&self, path: &str, acl: Acl) {
        self.update(path, |entry| entry.file_inherit = Some(acl));
    }

    /// Sets the share-level ACL reported at `path`.
    pub fn set_share_acl(&self, path: &str, acl: Acl) {
        self.update(path, |entry| entry.share = Some(acl));
    }

    /// Injects an error that fires once and then clears.
    pub fn fail_once(&self, path: &str, error: InjectedError) {
        self.update(path, |entry| entry.error = Some((error, true)));
    }

    /// Injects an error that fires on every access until cleared.
    pub fn fail_always(&self, path: &str, error: InjectedError) {
        self.update(path, |entry| entry.error = Some((error, false)));
    }

    /// Clears any injected error.
    pub fn clear_error(&self, path: &str) {
        self.update(path, |entry| entry.error = None);
    }

    fn update(&self, path: &str, f: impl FnOnce(&mut MemEntry)) {
        if let Some(entry) = self.lock().entries.get_mut(&normalize(path)) {
            f(entry);
        }
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn insert_with_ancestors(state: &mut State, path: &str, entry: MemEntry) {
    if let Some((parent, _)) = path.rsplit_once('/') {
        if !parent.is_empty() && !state.entries.contains_key(parent) {
            insert_with_ancestors(state, parent, MemEntry::dir());
        }
    }
    state.entries.insert(path.to_owned(), entry);
}

/// One path in a [`MemoryFileSystem`].
#[derive(Clone, Debug)]
pub struct MemoryFile {
    shared: Arc<Shared>,
    // Without trailing separator.
    path: String,
}

enum Access {
    Metadata,
    Listing,
}

impl MemoryFile {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Checks (and consumes, for one-shot injections) any injected error,
    /// then runs `f` over the entry if it exists.
    fn entry<T>(
        &self,
        access: Access,
        f: impl FnOnce(Option<&MemEntry>) -> Result<T, VfsError>,
    ) -> Result<T, VfsError> {
        let mut state = self.lock();
        if let Some(entry) = state.entries.get_mut(&self.path) {
            if let Some((kind, once)) = entry.error {
                let fired = match kind {
                    InjectedError::Transient => {
                        Some(VfsError::transient(&self.path, "injected transient failure"))
                    }
                    InjectedError::Document => {
                        Some(VfsError::document(&self.path, "injected document failure"))
                    }
                    InjectedError::Listing if matches!(access, Access::Listing) => {
                        Some(VfsError::listing(&self.path, None))
                    }
                    // `Open` is consumed by `open`, never by metadata paths.
                    InjectedError::Listing | InjectedError::Open => None,
                };
                if let Some(error) = fired {
                    if once {
                        entry.error = None;
                    }
                    return Err(error);
                }
            }
        }
        f(state.entries.get(&self.path))
    }

    fn require<T>(
        &self,
        access: Access,
        f: impl FnOnce(&MemEntry) -> T,
    ) -> Result<T, VfsError> {
        self.entry(access, |entry| {
            entry
                .map(f)
                .ok_or_else(|| VfsError::document(&self.path, "does not exist"))
        })
    }

    /// Checks (and consumes, for one-shot injections) an [`InjectedError::Open`].
    fn take_open_error(&self) -> bool {
        let mut state = self.lock();
        if let Some(entry) = state.entries.get_mut(&self.path) {
            if let Some((InjectedError::Open, once)) = entry.error {
                if once {
                    entry.error = None;
                }
                return true;
            }
        }
        false
    }
}

impl Node for MemoryFile {
    fn kind(&self) -> FileSystemKind {
        FileSystemKind::Memory
    }

    fn path(&self) -> String {
        let is_dir = self
            .lock()
            .entries
            .get(&self.path)
            .is_some_and(|e| e.directory);
        if is_dir {
            format!("{}/", self.path)
        } else {
            self.path.clone()
        }
    }

    fn name(&self) -> String {
        self.path.rsplit('/').next().unwrap_or("").to_owned()
    }

    fn parent(&self) -> Option<String> {
        if self.path == self.shared.root {
            return None;
        }
        let (parent, _) = self.path.rsplit_once('/')?;
        Some(format!("{parent}/"))
    }

    fn exists(&self) -> Result<bool, VfsError> {
        self.entry(Access::Metadata, |entry| Ok(entry.is_some()))
    }

    fn is_directory(&self) -> Result<bool, VfsError> {
        self.entry(Access::Metadata, |entry| {
            Ok(entry.is_some_and(|e| e.directory))
        })
    }

    fn is_regular_file(&self) -> Result<bool, VfsError> {
        self.entry(Access::Metadata, |entry| {
            Ok(entry.is_some_and(|e| !e.directory))
        })
    }

    fn can_read(&self) -> Result<bool, VfsError> {
        self.entry(Access::Metadata, |entry| {
            Ok(entry.is_some_and(|e| e.readable))
        })
    }

    fn is_hidden(&self) -> Result<bool, VfsError> {
        self.require(Access::Metadata, |e| e.hidden)
    }

    fn last_modified(&self) -> Result<i64, VfsError> {
        self.require(Access::Metadata, |e| e.last_modified)
    }

    fn length(&self) -> Result<u64, VfsError> {
        self.require(Access::Metadata, |e| {
            if e.directory { 0 } else { e.content.len() as u64 }
        })
    }

    fn display_url(&self) -> String {
        self.path()
    }

    fn open(&self) -> io::Result<ContentStream> {
        if self.take_open_error() {
            return Err(io::Error::other("injected content failure"));
        }
        let result = self.require(Access::Metadata, |e| e.content.clone());
        match result {
            Ok(content) => Ok(Box::new(io::Cursor::new(content))),
            Err(e) if e.is_transient() => {
                Err(io::Error::new(io::ErrorKind::ConnectionRefused, e.to_string()))
            }
            Err(e) => Err(io::Error::new(io::ErrorKind::PermissionDenied, e.to_string())),
        }
    }

    fn list_files(&self) -> Result<Vec<ReadonlyFile>, VfsError> {
        let prefix = format!("{}/", self.path);
        let children: Vec<String> = self.entry(Access::Listing, |entry| {
            let Some(entry) = entry else {
                return Err(VfsError::document(&self.path, "does not exist"));
            };
            if !entry.directory {
                return Err(VfsError::document(&self.path, "not a directory"));
            }
            Ok(())
        })
        .map(|()| {
            self.lock()
                .entries
                .keys()
                .filter(|key| {
                    key.strip_prefix(&prefix)
                        .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
                })
                .cloned()
                .collect()
        })?;

        let mut nodes: Vec<MemoryFile> = children
            .into_iter()
            .map(|path| MemoryFile {
                shared: Arc::clone(&self.shared),
                path,
            })
            .collect();
        nodes.sort_by(|a, b| traversal_cmp(&a.path(), &b.path(), '/'));
        Ok(nodes.into_iter().map(ReadonlyFile::Memory).collect())
    }

    fn acl(&self) -> Result<Acl, VfsError> {
        self.require(Access::Metadata, |e| {
            e.acl.clone().unwrap_or_else(Acl::public)
        })
    }

    fn has_inherited_acls(&self) -> Result<bool, VfsError> {
        self.require(Access::Metadata, |e| e.inherited.is_some())
    }

    fn inherited_acl(&self) -> Result<Option<Acl>, VfsError> {
        self.require(Access::Metadata, |e| e.inherited.clone())
    }

    fn container_inherit_acl(&self) -> Result<Option<Acl>, VfsError> {
        self.require(Access::Metadata, |e| e.container_inherit.clone())
    }

    fn file_inherit_acl(&self) -> Result<Option<Acl>, VfsError> {
        self.require(Access::Metadata, |e| e.file_inherit.clone())
    }

    fn share_acl(&self) -> Result<Option<Acl>, VfsError> {
        self.require(Access::Metadata, |e| e.share.clone())
    }

    fn is_modified_since(&self, millis: i64) -> Result<bool, VfsError> {
        let modified = self.last_modified()?;
        Ok(modified <= 0 || modified >= millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryFileSystem {
        let fs = MemoryFileSystem::new("/root");
        fs.add_file("/root/abc", b"abc");
        fs.add_dir("/root/foo");
        fs.add_file("/root/foo/x", b"x");
        fs.add_file("/root/foo.bar", b"fb");
        fs
    }

    #[test]
    fn listing_order_is_traversal_consistent() {
        let fs = sample();
        let root = fs.open("/root", None);
        let paths: Vec<String> = root
            .list_files()
            .expect("list")
            .iter()
            .map(ReadonlyFile::path)
            .collect();
        assert_eq!(paths, vec!["/root/abc", "/root/foo/", "/root/foo.bar"]);
    }

    #[test]
    fn ancestors_are_created_on_demand() {
        let fs = MemoryFileSystem::new("/root");
        fs.add_file("/root/a/b/c.txt", b"x");
        assert!(fs.open("/root/a", None).is_directory().expect("dir"));
        assert!(fs.open("/root/a/b", None).is_directory().expect("dir"));
        assert!(fs
            .open("/root/a/b/c.txt", None)
            .is_regular_file()
            .expect("file"));
    }

    #[test]
    fn one_shot_errors_clear_after_firing() {
        let fs = sample();
        fs.fail_once("/root/abc", InjectedError::Transient);

        let file = fs.open("/root/abc", None);
        let error = file.last_modified().unwrap_err();
        assert!(error.is_transient());
        assert_eq!(file.last_modified().expect("second read"), 1);
    }

    #[test]
    fn open_errors_fire_only_on_content_open() {
        let fs = sample();
        fs.fail_always("/root/abc", InjectedError::Open);

        let file = fs.open("/root/abc", None);
        assert_eq!(file.last_modified().expect("metadata unaffected"), 1);
        let error = file.open().err().unwrap();
        assert_eq!(error.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn listing_errors_fire_only_on_list() {
        let fs = sample();
        fs.fail_always("/root/foo", InjectedError::Listing);

        let dir = fs.open("/root/foo", None);
        assert!(dir.is_directory().expect("metadata unaffected"));
        assert!(dir.list_files().unwrap_err().is_listing());
    }

    #[test]
    fn content_round_trips() {
        use std::io::Read as _;
        let fs = sample();
        let mut content = String::new();
        fs.open("/root/abc", None)
            .open()
            .expect("open")
            .read_to_string(&mut content)
            .expect("read");
        assert_eq!(content, "abc");
    }

    #[test]
    fn is_path_respects_component_boundaries() {
        let fs = MemoryFileSystem::new("/root");
        assert!(fs.is_path("/root"));
        assert!(fs.is_path("/root/"));
        assert!(fs.is_path("/root/sub/file"));
        assert!(!fs.is_path("/rooted"));
        assert!(!fs.is_path("/other"));
    }
}
