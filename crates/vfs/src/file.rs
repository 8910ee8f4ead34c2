use std::io::Read;

use fscrawl_acl::{AceSecurityLevel, Acl, AclFormat};

use crate::memory::MemoryFile;
use crate::nfs::NfsFile;
use crate::posix::PosixFile;
use crate::smb::SmbFile;
use crate::windows::WindowsFile;
use crate::{FileSystemKind, VfsError};

/// Byte stream produced for a file's content.
pub type ContentStream = Box<dyn Read + Send>;

/// ACL handling knobs shared by the ACL-capable filesystem types.
#[derive(Clone, Debug)]
pub struct AclConfig {
    /// Rendering notation for user principals.
    pub user_format: AclFormat,
    /// Rendering notation for group principals.
    pub group_format: AclFormat,
    /// Which ACLs gate access, per `aceSecurityLevel`.
    pub security_level: AceSecurityLevel,
    /// Inheritance-aware feeds carry deny sets; legacy feeds do not.
    pub supports_inherited_acls: bool,
    /// On an ACL read failure, fall back to per-request authorization
    /// instead of failing the document.
    pub use_authz_on_acl_error: bool,
    /// Identity namespace stamped on every principal, when configured.
    pub global_namespace: Option<String>,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            user_format: AclFormat::DomainBackslashUser,
            group_format: AclFormat::DomainBackslashGroup,
            security_level: AceSecurityLevel::default(),
            supports_inherited_acls: true,
            use_authz_on_acl_error: false,
            global_namespace: None,
        }
    }
}

/// Uniform operations over one concrete file node.
///
/// `ReadonlyFile` dispatches to this; the trait stays crate-private so the
/// public surface is the sum type alone.
pub(crate) trait Node {
    fn kind(&self) -> FileSystemKind;
    /// Full path; directories carry a trailing separator.
    fn path(&self) -> String;
    /// Last component of the path, without any trailing separator.
    fn name(&self) -> String;
    /// Parent directory path (with trailing separator), if any.
    fn parent(&self) -> Option<String>;
    fn exists(&self) -> Result<bool, VfsError>;
    fn is_directory(&self) -> Result<bool, VfsError>;
    fn is_regular_file(&self) -> Result<bool, VfsError>;
    fn can_read(&self) -> Result<bool, VfsError>;
    fn is_hidden(&self) -> Result<bool, VfsError>;
    /// Millis since epoch; values `<= 0` mean unknown.
    fn last_modified(&self) -> Result<i64, VfsError>;
    /// Length in bytes for regular files, `0` otherwise.
    fn length(&self) -> Result<u64, VfsError>;
    fn display_url(&self) -> String;
    /// Opens the content stream. I/O errors propagate unclassified; the
    /// caller decides how an open failure affects the document.
    fn open(&self) -> std::io::Result<ContentStream>;
    /// Children sorted in traversal order.
    fn list_files(&self) -> Result<Vec<ReadonlyFile>, VfsError>;
    fn acl(&self) -> Result<Acl, VfsError>;
    fn has_inherited_acls(&self) -> Result<bool, VfsError>;
    fn inherited_acl(&self) -> Result<Option<Acl>, VfsError>;
    fn container_inherit_acl(&self) -> Result<Option<Acl>, VfsError>;
    fn file_inherit_acl(&self) -> Result<Option<Acl>, VfsError>;
    fn share_acl(&self) -> Result<Option<Acl>, VfsError>;
    fn is_modified_since(&self, millis: i64) -> Result<bool, VfsError>;
}

/// One path on some filesystem: metadata, children, content, and ACLs.
///
/// Nodes are immutable value objects. Traversal synthesizes children from a
/// parent node plus a name; nothing is cached, so two reads of the same
/// attribute may observe a live filesystem change.
#[derive(Clone, Debug)]
pub enum ReadonlyFile {
    /// Local POSIX node.
    Posix(PosixFile),
    /// Local Windows node.
    Windows(WindowsFile),
    /// SMB share node.
    Smb(SmbFile),
    /// NFS node backed by a local mount.
    Nfs(NfsFile),
    /// In-memory node.
    Memory(MemoryFile),
}

impl ReadonlyFile {
    fn node(&self) -> &dyn Node {
        match self {
            Self::Posix(n) => n,
            Self::Windows(n) => n,
            Self::Smb(n) => n,
            Self::Nfs(n) => n,
            Self::Memory(n) => n,
        }
    }

    /// The filesystem family this node belongs to.
    #[must_use]
    pub fn kind(&self) -> FileSystemKind {
        self.node().kind()
    }

    /// Full path to this node. Directory paths end with the filesystem's
    /// separator, which keeps full-path ordering consistent with a
    /// depth-first walk (see [`crate::order`]).
    #[must_use]
    pub fn path(&self) -> String {
        self.node().path()
    }

    /// Last path component.
    #[must_use]
    pub fn name(&self) -> String {
        self.node().name()
    }

    /// Parent directory path, with trailing separator.
    #[must_use]
    pub fn parent(&self) -> Option<String> {
        self.node().parent()
    }

    /// True if the node currently exists.
    pub fn exists(&self) -> Result<bool, VfsError> {
        self.node().exists()
    }

    /// True if the node is a directory.
    pub fn is_directory(&self) -> Result<bool, VfsError> {
        self.node().is_directory()
    }

    /// True if the node is a regular file.
    pub fn is_regular_file(&self) -> Result<bool, VfsError> {
        self.node().is_regular_file()
    }

    /// True if the node exists and its content or listing is readable.
    pub fn can_read(&self) -> Result<bool, VfsError> {
        self.node().can_read()
    }

    /// True if the node is hidden under its filesystem's conventions.
    pub fn is_hidden(&self) -> Result<bool, VfsError> {
        self.node().is_hidden()
    }

    /// Last-modified time in millis since the epoch; `<= 0` means unknown.
    pub fn last_modified(&self) -> Result<i64, VfsError> {
        self.node().last_modified()
    }

    /// Length in bytes for regular files, `0` otherwise.
    pub fn length(&self) -> Result<u64, VfsError> {
        self.node().length()
    }

    /// URL shown to end users for this node.
    #[must_use]
    pub fn display_url(&self) -> String {
        self.node().display_url()
    }

    /// Opens the node's content for reading.
    pub fn open(&self) -> std::io::Result<ContentStream> {
        self.node().open()
    }

    /// Children of this directory, sorted in traversal order.
    pub fn list_files(&self) -> Result<Vec<ReadonlyFile>, VfsError> {
        self.node().list_files()
    }

    /// The node's own ACL.
    pub fn acl(&self) -> Result<Acl, VfsError> {
        self.node().acl()
    }

    /// True if the node inherits any ACLs from an ancestor, even ones the
    /// inherit accessors would not return.
    pub fn has_inherited_acls(&self) -> Result<bool, VfsError> {
        self.node().has_inherited_acls()
    }

    /// ACL inherited from ancestors, if any.
    pub fn inherited_acl(&self) -> Result<Option<Acl>, VfsError> {
        self.node().inherited_acl()
    }

    /// ACL that subordinate directories would inherit from this directory.
    pub fn container_inherit_acl(&self) -> Result<Option<Acl>, VfsError> {
        self.node().container_inherit_acl()
    }

    /// ACL that subordinate regular files would inherit from this directory.
    pub fn file_inherit_acl(&self) -> Result<Option<Acl>, VfsError> {
        self.node().file_inherit_acl()
    }

    /// Share-level ACL; `None` outside SMB-style shares.
    pub fn share_acl(&self) -> Result<Option<Acl>, VfsError> {
        self.node().share_acl()
    }

    /// True if the node (or its metadata) changed at or after `millis`, or
    /// if its timestamps are unknown.
    pub fn is_modified_since(&self, millis: i64) -> Result<bool, VfsError> {
        self.node().is_modified_since(millis)
    }
}
