use std::fs;
use std::io;
use std::path::Path;

use fscrawl_acl::Acl;

use crate::file::{ContentStream, Node};
use crate::order::traversal_cmp;
use crate::{millis_since_epoch, Credentials, FileSystemKind, ReadonlyFile, VfsError};

/// Local POSIX filesystem: absolute `/` paths.
#[derive(Clone, Debug, Default)]
pub struct PosixFileSystem;

impl PosixFileSystem {
    /// True if `path` looks like an absolute POSIX path.
    #[must_use]
    pub fn is_path(&self, path: &str) -> bool {
        path.starts_with('/')
    }

    /// Creates a node for `path`. POSIX access needs no credentials.
    #[must_use]
    pub fn open(&self, path: &str, _credentials: Option<&Credentials>) -> ReadonlyFile {
        ReadonlyFile::Posix(PosixFile::new(path))
    }
}

/// One path on the local POSIX filesystem.
#[derive(Clone, Debug)]
pub struct PosixFile {
    // Without trailing separator, except for the root itself.
    path: String,
}

impl PosixFile {
    pub(crate) fn new(path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        Self {
            path: if trimmed.is_empty() {
                "/".to_owned()
            } else {
                trimmed.to_owned()
            },
        }
    }

    fn fs_path(&self) -> &Path {
        Path::new(&self.path)
    }

    fn metadata(&self) -> Result<Option<fs::Metadata>, VfsError> {
        match fs::metadata(self.fs_path()) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VfsError::from_io(&self.path, e)),
        }
    }
}

impl Node for PosixFile {
    fn kind(&self) -> FileSystemKind {
        FileSystemKind::Posix
    }

    fn path(&self) -> String {
        if self.path != "/" && self.is_directory().unwrap_or(false) {
            format!("{}/", self.path)
        } else {
            self.path.clone()
        }
    }

    fn name(&self) -> String {
        self.path
            .rsplit('/')
            .find(|part| !part.is_empty())
            .unwrap_or("")
            .to_owned()
    }

    fn parent(&self) -> Option<String> {
        if self.path == "/" {
            return None;
        }
        match self.path.rsplit_once('/') {
            Some(("", _)) => Some("/".to_owned()),
            Some((parent, _)) => Some(format!("{parent}/")),
            None => None,
        }
    }

    fn exists(&self) -> Result<bool, VfsError> {
        Ok(self.metadata()?.is_some())
    }

    fn is_directory(&self) -> Result<bool, VfsError> {
        Ok(self.metadata()?.is_some_and(|m| m.is_dir()))
    }

    fn is_regular_file(&self) -> Result<bool, VfsError> {
        Ok(self.metadata()?.is_some_and(|m| m.is_file()))
    }

    #[cfg(unix)]
    fn can_read(&self) -> Result<bool, VfsError> {
        Ok(rustix::fs::access(self.fs_path(), rustix::fs::Access::READ_OK).is_ok())
    }

    #[cfg(not(unix))]
    fn can_read(&self) -> Result<bool, VfsError> {
        self.exists()
    }

    fn is_hidden(&self) -> Result<bool, VfsError> {
        Ok(self.name().starts_with('.'))
    }

    fn last_modified(&self) -> Result<i64, VfsError> {
        let Some(metadata) = self.metadata()? else {
            return Err(VfsError::document(&self.path, "does not exist"));
        };
        let modified = metadata
            .modified()
            .map_err(|e| VfsError::from_io(&self.path, e))?;
        Ok(millis_since_epoch(modified))
    }

    fn length(&self) -> Result<u64, VfsError> {
        Ok(self
            .metadata()?
            .filter(fs::Metadata::is_file)
            .map_or(0, |m| m.len()))
    }

    fn display_url(&self) -> String {
        format!("file://{}", self.path)
    }

    fn open(&self) -> io::Result<ContentStream> {
        Ok(Box::new(fs::File::open(self.fs_path())?))
    }

    fn list_files(&self) -> Result<Vec<ReadonlyFile>, VfsError> {
        let read_dir = fs::read_dir(self.fs_path()).map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                VfsError::listing(&self.path, Some(e))
            } else {
                VfsError::from_io(&self.path, e)
            }
        })?;

        let mut children = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| VfsError::from_io(&self.path, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let base = self.path.trim_end_matches('/');
            children.push(PosixFile::new(&format!("{base}/{name}")));
        }
        children.sort_by(|a, b| traversal_cmp(&a.path(), &b.path(), '/'));
        Ok(children.into_iter().map(ReadonlyFile::Posix).collect())
    }

    fn acl(&self) -> Result<Acl, VfsError> {
        // POSIX trees carry no feed-visible ACLs; content is gated by the
        // downstream index's own policy.
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
        match self.last_modified() {
            Ok(modified) if modified > 0 => Ok(modified >= millis),
            // Unknown timestamps count as modified.
            Ok(_) => Ok(true),
            Err(e) if e.is_transient() => Err(e),
            Err(_) => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn paths_names_and_parents() {
        let file = PosixFile::new("/foo/bar/baz.txt");
        assert_eq!(file.name(), "baz.txt");
        assert_eq!(file.parent().as_deref(), Some("/foo/bar/"));

        let root = PosixFile::new("/");
        assert_eq!(root.parent(), None);

        let top = PosixFile::new("/foo");
        assert_eq!(top.parent().as_deref(), Some("/"));
    }

    #[test]
    fn directory_paths_carry_trailing_separator() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).expect("mkdir");
        fs::write(sub.join("a.txt"), b"a").expect("write");

        let node = PosixFile::new(&sub.to_string_lossy());
        assert!(node.path().ends_with('/'));

        let file = PosixFile::new(&sub.join("a.txt").to_string_lossy());
        assert!(!file.path().ends_with('/'));
    }

    #[test]
    fn listing_is_sorted_in_traversal_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("r");
        fs::create_dir(&root).expect("mkdir");
        fs::write(root.join("abc"), b"x").expect("write");
        fs::create_dir(root.join("foo")).expect("mkdir");
        fs::write(root.join("foo.bar"), b"x").expect("write");

        let node = PosixFile::new(&root.to_string_lossy());
        let names: Vec<String> = node
            .list_files()
            .expect("list")
            .iter()
            .map(ReadonlyFile::name)
            .collect();
        assert_eq!(names, vec!["abc", "foo", "foo.bar"]);
    }

    #[test]
    fn metadata_of_missing_file() {
        let file = PosixFile::new("/nonexistent/for/fscrawl/tests");
        assert!(!file.exists().expect("exists"));
        assert!(!file.is_directory().expect("is_directory"));
        assert!(file.last_modified().is_err());
        assert!(file.is_modified_since(0).expect("modified"));
    }

    #[test]
    fn hidden_files_are_dot_files() {
        assert!(PosixFile::new("/tmp/.hidden").is_hidden().expect("hidden"));
        assert!(!PosixFile::new("/tmp/plain").is_hidden().expect("hidden"));
    }
}
