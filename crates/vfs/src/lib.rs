#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `fscrawl_vfs` is the crawler's uniform view over heterogeneous
//! filesystems: local POSIX trees, local Windows paths (drive-letter and
//! UNC), remote SMB/CIFS shares, and NFS exports reached through a mount
//! manager. A [`ReadonlyFile`] is an immutable value describing one path;
//! traversal synthesizes child nodes from a parent plus a name, and every
//! metadata read can fail with a tiered [`VfsError`] so callers can
//! distinguish "skip this document" from "pause and retry".
//!
//! The [`PathParser`] picks the filesystem type for a start path by URL
//! prefix or path shape, in registration order. Concrete I/O for SMB and for
//! ACL sources is injected behind the [`SmbDelegate`] and [`AclSource`]
//! traits; native interop lives outside this crate.
//!
//! # Ordering
//!
//! Directory listings are sorted so a depth-first walk emits full paths in
//! [`order::traversal_cmp`] order: directory paths carry a trailing
//! separator and the separator ranks below every other character. See the
//! module documentation of [`order`] for why raw lexicographic order is not
//! usable.

mod atime;
mod error;
mod file;
mod memory;
mod nfs;
pub mod order;
mod parser;
mod posix;
mod smb;
mod windows;

pub use atime::AccessTimePreservingReader;
pub use error::VfsError;
pub use file::{AclConfig, ContentStream, ReadonlyFile};
pub use memory::{InjectedError, MemoryFile, MemoryFileSystem};
pub use nfs::{MountManager, NfsFile, NfsFileSystem, StaticMountManager};
pub use parser::{FileSystemType, PathParser};
pub use posix::{PosixFile, PosixFileSystem};
pub use smb::{AclSource, NodeAcls, SmbDelegate, SmbFile, SmbFileSystem, SmbStat};
pub use windows::{WindowsFile, WindowsFileSystem};

use std::time::{SystemTime, UNIX_EPOCH};

/// The filesystem families the crawler understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileSystemKind {
    /// Local POSIX filesystem.
    Posix,
    /// Local Windows filesystem (drive-letter or UNC path).
    WindowsLocal,
    /// Remote SMB/CIFS share.
    Smb,
    /// NFS export reached through a local mount point.
    Nfs,
    /// In-memory filesystem used by tests and fixtures.
    Memory,
}

impl FileSystemKind {
    /// Short identifier used in logs and display strings.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Posix => "posix",
            Self::WindowsLocal => "windows",
            Self::Smb => "smb",
            Self::Nfs => "nfs",
            Self::Memory => "memory",
        }
    }

    /// True if files on this filesystem carry readable ACLs.
    #[must_use]
    pub const fn supports_acls(&self) -> bool {
        matches!(self, Self::Smb | Self::WindowsLocal | Self::Memory)
    }

    /// True if access decisions can be delegated to a live authorizer.
    #[must_use]
    pub const fn supports_authz(&self) -> bool {
        matches!(self, Self::Smb | Self::WindowsLocal)
    }

    /// True if opening paths requires credentials.
    #[must_use]
    pub const fn requires_credentials(&self) -> bool {
        matches!(self, Self::Smb)
    }

    /// Path separator character for this filesystem.
    #[must_use]
    pub const fn separator(&self) -> char {
        match self {
            Self::WindowsLocal => '\\',
            _ => '/',
        }
    }

    /// Compares two paths under this filesystem's equality rules.
    ///
    /// Windows local paths compare case-insensitively; everything else is
    /// exact.
    #[must_use]
    pub fn paths_equal(&self, a: &str, b: &str) -> bool {
        match self {
            Self::WindowsLocal => a.eq_ignore_ascii_case(b),
            _ => a == b,
        }
    }
}

/// SMB authentication material, immutable after startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    domain: Option<String>,
    user: String,
    password: String,
}

impl Credentials {
    /// Creates a credential triple.
    #[must_use]
    pub fn new(domain: Option<&str>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            domain: domain.map(str::to_owned),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Authentication domain, if any.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// User name.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

// Keep passwords out of debug output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("domain", &self.domain)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Converts a [`SystemTime`] to millis since the Unix epoch.
#[must_use]
pub fn millis_since_epoch(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        // Pre-epoch timestamps surface as negative millis.
        Err(e) => -i64::try_from(e.duration().as_millis()).unwrap_or(i64::MAX),
    }
}
