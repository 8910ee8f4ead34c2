use tracing::debug;

use crate::memory::MemoryFileSystem;
use crate::nfs::NfsFileSystem;
use crate::posix::PosixFileSystem;
use crate::smb::SmbFileSystem;
use crate::windows::WindowsFileSystem;
use crate::{Credentials, FileSystemKind, ReadonlyFile, VfsError};

/// One registered filesystem type.
#[derive(Clone, Debug)]
pub enum FileSystemType {
    /// Local POSIX paths.
    Posix(PosixFileSystem),
    /// Local Windows paths.
    Windows(WindowsFileSystem),
    /// SMB shares.
    Smb(SmbFileSystem),
    /// NFS exports.
    Nfs(NfsFileSystem),
    /// In-memory trees.
    Memory(MemoryFileSystem),
}

impl FileSystemType {
    /// The filesystem family this type produces nodes for.
    #[must_use]
    pub const fn kind(&self) -> FileSystemKind {
        match self {
            Self::Posix(_) => FileSystemKind::Posix,
            Self::Windows(_) => FileSystemKind::WindowsLocal,
            Self::Smb(_) => FileSystemKind::Smb,
            Self::Nfs(_) => FileSystemKind::Nfs,
            Self::Memory(_) => FileSystemKind::Memory,
        }
    }

    /// True if this type claims `path`.
    #[must_use]
    pub fn is_path(&self, path: &str) -> bool {
        match self {
            Self::Posix(fs) => fs.is_path(path),
            Self::Windows(fs) => fs.is_path(path),
            Self::Smb(fs) => fs.is_path(path),
            Self::Nfs(fs) => fs.is_path(path),
            Self::Memory(fs) => fs.is_path(path),
        }
    }

    fn open(
        &self,
        path: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ReadonlyFile, VfsError> {
        match self {
            Self::Posix(fs) => Ok(fs.open(path, credentials)),
            Self::Windows(fs) => Ok(fs.open(path, credentials)),
            Self::Smb(fs) => Ok(fs.open(path, credentials)),
            Self::Nfs(fs) => fs.open(path, credentials),
            Self::Memory(fs) => Ok(fs.open(path, credentials)),
        }
    }
}

/// Picks the filesystem type for a path by URL prefix or path shape.
///
/// Types are consulted in registration order; the first claimer wins.
#[derive(Clone, Debug)]
pub struct PathParser {
    types: Vec<FileSystemType>,
}

impl PathParser {
    /// Creates a parser over an ordered type list.
    #[must_use]
    pub fn new(types: Vec<FileSystemType>) -> Self {
        Self { types }
    }

    /// Resolves `path` to a readable node.
    ///
    /// Fails with [`VfsError::UnknownFileSystem`] when no registered type
    /// claims the path, and with a permanent [`VfsError::Document`] when the
    /// node resolves but does not exist or cannot be read.
    pub fn get_file(
        &self,
        path: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ReadonlyFile, VfsError> {
        let fs_type = self
            .types
            .iter()
            .find(|t| t.is_path(path))
            .ok_or_else(|| VfsError::UnknownFileSystem {
                path: path.to_owned(),
            })?;
        debug!(path, kind = fs_type.kind().name(), "resolved filesystem type");

        let file = fs_type.open(path, credentials)?;
        if !file.exists()? {
            return Err(VfsError::document(path, "does not exist"));
        }
        if !file.can_read()? {
            return Err(VfsError::document(path, "exists but cannot be read"));
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> (PathParser, MemoryFileSystem) {
        let memory = MemoryFileSystem::new("/root");
        memory.add_file("/root/f.txt", b"data");
        let parser = PathParser::new(vec![
            FileSystemType::Memory(memory.clone()),
            FileSystemType::Posix(PosixFileSystem),
        ]);
        (parser, memory)
    }

    #[test]
    fn first_registered_claimer_wins() {
        let (parser, _memory) = parser();
        // "/root/f.txt" is claimed by the memory type even though the POSIX
        // type would also accept it.
        let file = parser.get_file("/root/f.txt", None).expect("resolve");
        assert_eq!(file.kind(), FileSystemKind::Memory);
    }

    #[test]
    fn unknown_prefix_is_its_own_error() {
        let (parser, _memory) = parser();
        let error = parser.get_file("smb://host/share/", None).unwrap_err();
        assert!(matches!(error, VfsError::UnknownFileSystem { .. }));
    }

    #[test]
    fn missing_and_unreadable_nodes_are_permanent_errors() {
        let (parser, memory) = parser();

        let error = parser.get_file("/root/missing.txt", None).unwrap_err();
        assert!(matches!(error, VfsError::Document { .. }));

        memory.set_readable("/root/f.txt", false);
        let error = parser.get_file("/root/f.txt", None).unwrap_err();
        assert!(matches!(error, VfsError::Document { .. }));
    }
}
