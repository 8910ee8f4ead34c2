use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use fscrawl_acl::Acl;

use crate::atime::AccessTimePreservingReader;
use crate::file::{AclConfig, ContentStream, Node};
use crate::order::traversal_cmp;
use crate::smb::{build_node_acls, build_share_acl, AclSource};
use crate::{millis_since_epoch, Credentials, FileSystemKind, ReadonlyFile, VfsError};

/// Local Windows filesystem: drive-letter (`C:\`) and UNC (`\\host\share`)
/// paths. I/O goes through `std::fs`; security descriptors are read through
/// an optional [`AclSource`] since descriptor decoding is host-specific.
#[derive(Clone, Debug)]
pub struct WindowsFileSystem {
    acl_source: Option<Arc<dyn AclSource>>,
    acl_config: AclConfig,
    preserve_access_time: bool,
}

impl WindowsFileSystem {
    /// Creates the filesystem type.
    #[must_use]
    pub fn new(
        acl_source: Option<Arc<dyn AclSource>>,
        acl_config: AclConfig,
        preserve_access_time: bool,
    ) -> Self {
        Self {
            acl_source,
            acl_config,
            preserve_access_time,
        }
    }

    /// True for drive-letter and UNC path shapes.
    #[must_use]
    pub fn is_path(&self, path: &str) -> bool {
        let trimmed = path.trim();
        let bytes = trimmed.as_bytes();
        let drive_letter = bytes.len() >= 3
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && bytes[2] == b'\\';
        drive_letter || trimmed.starts_with("\\\\")
    }

    /// Creates a node for `path`. Local access needs no credentials.
    #[must_use]
    pub fn open(&self, path: &str, _credentials: Option<&Credentials>) -> ReadonlyFile {
        let mut normalized = path.trim().trim_end_matches('\\').to_owned();
        // Keep drive roots (`C:\`) intact; `C:` alone is cwd-relative.
        if normalized.ends_with(':') {
            normalized.push('\\');
        }
        ReadonlyFile::Windows(WindowsFile {
            path: normalized,
            acl_source: self.acl_source.clone(),
            acl_config: self.acl_config.clone(),
            preserve_access_time: self.preserve_access_time,
        })
    }
}

/// One path on a local Windows filesystem.
#[derive(Clone, Debug)]
pub struct WindowsFile {
    // Without trailing separator.
    path: String,
    acl_source: Option<Arc<dyn AclSource>>,
    acl_config: AclConfig,
    preserve_access_time: bool,
}

impl WindowsFile {
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

    fn source(&self) -> Result<&dyn AclSource, VfsError> {
        self.acl_source.as_deref().ok_or_else(|| {
            VfsError::document(&self.path, "no ACL source configured for local Windows paths")
        })
    }
}

impl Node for WindowsFile {
    fn kind(&self) -> FileSystemKind {
        FileSystemKind::WindowsLocal
    }

    fn path(&self) -> String {
        if !self.path.ends_with('\\') && self.is_directory().unwrap_or(false) {
            format!("{}\\", self.path)
        } else {
            self.path.clone()
        }
    }

    fn name(&self) -> String {
        self.path.rsplit('\\').next().unwrap_or("").to_owned()
    }

    fn parent(&self) -> Option<String> {
        if self.path.ends_with(":\\") {
            return None;
        }
        let (parent, _) = self.path.rsplit_once('\\')?;
        if parent.is_empty() || parent == "\\" {
            return None;
        }
        Some(format!("{parent}\\"))
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

    fn can_read(&self) -> Result<bool, VfsError> {
        self.exists()
    }

    #[cfg(windows)]
    fn is_hidden(&self) -> Result<bool, VfsError> {
        use std::os::windows::fs::MetadataExt;
        const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
        Ok(self
            .metadata()?
            .is_some_and(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0))
    }

    #[cfg(not(windows))]
    fn is_hidden(&self) -> Result<bool, VfsError> {
        Ok(false)
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
        format!("file:///{}", self.path.replace('\\', "/"))
    }

    fn open(&self) -> io::Result<ContentStream> {
        let file = fs::File::open(self.fs_path())?;
        if self.preserve_access_time {
            Ok(Box::new(AccessTimePreservingReader::capturing(
                self.fs_path(),
                file,
            )?))
        } else {
            Ok(Box::new(file))
        }
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
            children.push(WindowsFile {
                path: format!("{}\\{name}", self.path),
                acl_source: self.acl_source.clone(),
                acl_config: self.acl_config.clone(),
                preserve_access_time: self.preserve_access_time,
            });
        }
        children.sort_by(|a, b| traversal_cmp(&a.path(), &b.path(), '\\'));
        Ok(children.into_iter().map(ReadonlyFile::Windows).collect())
    }

    fn acl(&self) -> Result<Acl, VfsError> {
        match self.source() {
            Ok(source) => {
                let path = self.path();
                Ok(build_node_acls(source, &self.acl_config, &path)?.own)
            }
            // No descriptor reader: defer every decision to authorization.
            Err(_) => Ok(Acl::use_head_request()),
        }
    }

    fn has_inherited_acls(&self) -> Result<bool, VfsError> {
        match self.source() {
            Ok(source) => {
                let path = self.path();
                Ok(build_node_acls(source, &self.acl_config, &path)?.has_inherited)
            }
            Err(_) => Ok(false),
        }
    }

    fn inherited_acl(&self) -> Result<Option<Acl>, VfsError> {
        match self.source() {
            Ok(source) => {
                let path = self.path();
                Ok(build_node_acls(source, &self.acl_config, &path)?.inherited)
            }
            Err(_) => Ok(None),
        }
    }

    fn container_inherit_acl(&self) -> Result<Option<Acl>, VfsError> {
        match self.source() {
            Ok(source) => {
                let path = self.path();
                Ok(build_node_acls(source, &self.acl_config, &path)?.container_inherit)
            }
            Err(_) => Ok(None),
        }
    }

    fn file_inherit_acl(&self) -> Result<Option<Acl>, VfsError> {
        match self.source() {
            Ok(source) => {
                let path = self.path();
                Ok(build_node_acls(source, &self.acl_config, &path)?.file_inherit)
            }
            Err(_) => Ok(None),
        }
    }

    fn share_acl(&self) -> Result<Option<Acl>, VfsError> {
        match self.source() {
            Ok(source) => {
                let path = self.path();
                build_share_acl(source, &self.acl_config, &path)
            }
            Err(_) => Ok(None),
        }
    }

    fn is_modified_since(&self, millis: i64) -> Result<bool, VfsError> {
        // Copying a file refreshes its create time without touching mtime,
        // so both timestamps are consulted.
        let Some(metadata) = self.metadata()? else {
            return Ok(true);
        };
        let modified = metadata.modified().map(millis_since_epoch).unwrap_or(0);
        let created = metadata.created().map(millis_since_epoch).unwrap_or(0);
        let newest = modified.max(created);
        Ok(newest <= 0 || newest >= millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filesystem() -> WindowsFileSystem {
        WindowsFileSystem::new(None, AclConfig::default(), false)
    }

    #[test]
    fn recognizes_drive_letter_and_unc_shapes() {
        let fs = filesystem();
        assert!(fs.is_path("C:\\data"));
        assert!(fs.is_path("z:\\"));
        assert!(fs.is_path("\\\\host\\share\\dir"));
        assert!(!fs.is_path("/posix/path"));
        assert!(!fs.is_path("smb://host/share"));
        assert!(!fs.is_path("C:relative"));
    }

    #[test]
    fn names_and_parents() {
        let fs = filesystem();
        let file = fs.open("C:\\data\\reports\\q1.xlsx", None);
        assert_eq!(file.name(), "q1.xlsx");
        assert_eq!(file.parent().as_deref(), Some("C:\\data\\reports\\"));

        let top = fs.open("C:\\data", None);
        assert_eq!(top.parent().as_deref(), Some("C:\\"));

        let root = fs.open("C:\\", None);
        assert_eq!(root.parent(), None);
    }

    #[test]
    fn acl_without_source_defers_to_authorization() {
        let fs = filesystem();
        let file = fs.open("C:\\data\\f.txt", None);
        let acl = file.acl().expect("acl");
        assert!(!acl.is_determinate());
    }
}
