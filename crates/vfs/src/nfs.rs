use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use fscrawl_acl::Acl;

use crate::file::{ContentStream, Node};
use crate::posix::PosixFile;
use crate::{Credentials, FileSystemKind, ReadonlyFile, VfsError};

const NFS_PREFIX: &str = "nfs://";

/// Maps `nfs://host/path` URLs to local mount points.
///
/// The crawler never mounts anything itself; the embedding application
/// registers its start paths with a manager at startup. Mounts live for the
/// process lifetime only.
pub trait MountManager: Send + Sync + fmt::Debug {
    /// Local path backing `url`, or `None` when the share is not mounted.
    fn resolve(&self, url: &str) -> Option<PathBuf>;
}

/// Mount manager over a fixed prefix table, for tests and simple setups.
#[derive(Debug, Default)]
pub struct StaticMountManager {
    mounts: HashMap<String, PathBuf>,
}

impl StaticMountManager {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a share URL prefix and its local mount point.
    pub fn register(&mut self, url_prefix: impl Into<String>, local: impl Into<PathBuf>) {
        self.mounts
            .insert(url_prefix.into().trim_end_matches('/').to_owned(), local.into());
    }
}

impl MountManager for StaticMountManager {
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let url = url.trim_end_matches('/');
        // Longest registered prefix wins so nested registrations behave.
        let mut best: Option<(&String, &PathBuf)> = None;
        for (prefix, local) in &self.mounts {
            let matches = url == prefix
                || url
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'));
            if matches && best.is_none_or(|(b, _)| prefix.len() > b.len()) {
                best = Some((prefix, local));
            }
        }
        let (prefix, local) = best?;
        let rest = url[prefix.len()..].trim_start_matches('/');
        Some(if rest.is_empty() {
            local.clone()
        } else {
            local.join(rest)
        })
    }
}

/// NFS exports reached through a [`MountManager`].
#[derive(Clone, Debug)]
pub struct NfsFileSystem {
    mounts: Arc<dyn MountManager>,
}

impl NfsFileSystem {
    /// Creates the filesystem type around a mount manager.
    #[must_use]
    pub fn new(mounts: Arc<dyn MountManager>) -> Self {
        Self { mounts }
    }

    /// True for `nfs://` URLs, matched case-insensitively.
    #[must_use]
    pub fn is_path(&self, path: &str) -> bool {
        let trimmed = path.trim();
        trimmed.len() >= NFS_PREFIX.len()
            && trimmed[..NFS_PREFIX.len()].eq_ignore_ascii_case(NFS_PREFIX)
    }

    /// Creates a node for `url`. Returns a permanent error when no mount
    /// point is registered for the share.
    pub fn open(
        &self,
        url: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<ReadonlyFile, VfsError> {
        let url = url.trim().trim_end_matches('/').to_owned();
        let local = self
            .mounts
            .resolve(&url)
            .ok_or_else(|| VfsError::document(&url, "no mount point registered for NFS share"))?;
        Ok(ReadonlyFile::Nfs(NfsFile {
            mounts: Arc::clone(&self.mounts),
            url,
            local,
        }))
    }
}

/// One path on an NFS export, backed by a local mount.
///
/// All I/O delegates to the POSIX node at the mounted location; paths and
/// display URLs stay in `nfs://` space so docids remain stable across
/// remount locations.
#[derive(Clone, Debug)]
pub struct NfsFile {
    mounts: Arc<dyn MountManager>,
    // Without trailing separator.
    url: String,
    local: PathBuf,
}

impl NfsFile {
    fn local_node(&self) -> PosixFile {
        PosixFile::new(&self.local.to_string_lossy())
    }
}

impl Node for NfsFile {
    fn kind(&self) -> FileSystemKind {
        FileSystemKind::Nfs
    }

    fn path(&self) -> String {
        if self.local_node().is_directory().unwrap_or(false) {
            format!("{}/", self.url)
        } else {
            self.url.clone()
        }
    }

    fn name(&self) -> String {
        self.url
            .strip_prefix(NFS_PREFIX)
            .unwrap_or(&self.url)
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_owned()
    }

    fn parent(&self) -> Option<String> {
        let rest = self.url.strip_prefix(NFS_PREFIX)?;
        let (parent, _) = rest.rsplit_once('/')?;
        Some(format!("{NFS_PREFIX}{parent}/"))
    }

    fn exists(&self) -> Result<bool, VfsError> {
        self.local_node().exists()
    }

    fn is_directory(&self) -> Result<bool, VfsError> {
        self.local_node().is_directory()
    }

    fn is_regular_file(&self) -> Result<bool, VfsError> {
        self.local_node().is_regular_file()
    }

    fn can_read(&self) -> Result<bool, VfsError> {
        self.local_node().can_read()
    }

    fn is_hidden(&self) -> Result<bool, VfsError> {
        self.local_node().is_hidden()
    }

    fn last_modified(&self) -> Result<i64, VfsError> {
        self.local_node().last_modified()
    }

    fn length(&self) -> Result<u64, VfsError> {
        self.local_node().length()
    }

    fn display_url(&self) -> String {
        self.url.clone()
    }

    fn open(&self) -> io::Result<ContentStream> {
        self.local_node().open()
    }

    fn list_files(&self) -> Result<Vec<ReadonlyFile>, VfsError> {
        // List through the POSIX node for its error mapping, then re-wrap
        // the child names into nfs:// space.
        let children = self.local_node().list_files()?;
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            let name = child.name();
            out.push(ReadonlyFile::Nfs(NfsFile {
                mounts: Arc::clone(&self.mounts),
                url: format!("{}/{name}", self.url),
                local: self.local.join(&name),
            }));
        }
        Ok(out)
    }

    fn acl(&self) -> Result<Acl, VfsError> {
        Ok(Acl::public())
    }

    fn has_inherited_acls(&self) -> Result<bool, VfsError> {
        Ok(false)
    }

    fn inherited_acl(&self) -> Result<Option<Acl>, VfsError> {
        Ok(None)
    }

    fn container_inherit_acl(&self) -> Result<Option<Acl>, VfsError> {
        Ok(None)
    }

    fn file_inherit_acl(&self) -> Result<Option<Acl>, VfsError> {
        Ok(None)
    }

    fn share_acl(&self) -> Result<Option<Acl>, VfsError> {
        Ok(None)
    }

    fn is_modified_since(&self, millis: i64) -> Result<bool, VfsError> {
        self.local_node().is_modified_since(millis)
    }
}
