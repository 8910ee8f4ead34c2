use std::io;

use thiserror::Error;

/// Error taxonomy for filesystem access.
///
/// The crawler reacts differently per tier: permanent document failures are
/// logged and skipped, transient failures pause and retry, and forbidden
/// directory listings prune one subtree without disturbing its siblings.
#[derive(Debug, Error)]
pub enum VfsError {
    /// No registered filesystem type accepts the path. Not retried.
    #[error("no registered filesystem accepts path '{path}'")]
    UnknownFileSystem {
        /// The unmatched path.
        path: String,
    },

    /// This document cannot be produced now or in the foreseeable future:
    /// missing, access denied, malformed metadata.
    #[error("cannot produce document for '{path}': {detail}")]
    Document {
        /// Path of the failing document.
        path: String,
        /// Human-readable cause.
        detail: String,
        /// Underlying I/O failure, when one exists.
        #[source]
        source: Option<io::Error>,
    },

    /// The repository is temporarily unreachable: server down, timeout,
    /// network partition. The caller pauses and retries.
    #[error("transient failure at '{path}': {detail}")]
    Transient {
        /// Path being accessed when the failure occurred.
        path: String,
        /// Human-readable cause.
        detail: String,
        /// Underlying I/O failure, when one exists.
        #[source]
        source: Option<io::Error>,
    },

    /// The caller is not authorized to enumerate a directory. Distinct from
    /// [`VfsError::Document`] so traversal can skip the subtree and continue.
    #[error("not authorized to list directory '{path}'")]
    DirectoryListing {
        /// The forbidden directory.
        path: String,
        /// Underlying I/O failure, when one exists.
        #[source]
        source: Option<io::Error>,
    },
}

impl VfsError {
    /// Permanent per-document failure.
    pub fn document(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Document {
            path: path.into(),
            detail: detail.into(),
            source: None,
        }
    }

    /// Transient repository failure.
    pub fn transient(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Transient {
            path: path.into(),
            detail: detail.into(),
            source: None,
        }
    }

    /// Forbidden directory listing.
    pub fn listing(path: impl Into<String>, source: Option<io::Error>) -> Self {
        Self::DirectoryListing {
            path: path.into(),
            source,
        }
    }

    /// Classifies an [`io::Error`] into the taxonomy.
    ///
    /// Only connection and timeout failures map to the transient tier;
    /// everything else, including unclassified errors, is permanent for the
    /// document. A bare error with no network shape would otherwise be
    /// retried forever.
    pub fn from_io(path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        let detail = source.to_string();
        match source.kind() {
            io::ErrorKind::TimedOut
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock => Self::Transient {
                path,
                detail,
                source: Some(source),
            },
            _ => Self::Document {
                path,
                detail,
                source: Some(source),
            },
        }
    }

    /// True for the transient tier.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// True for the skip-one-subtree tier.
    #[must_use]
    pub const fn is_listing(&self) -> bool {
        matches!(self, Self::DirectoryListing { .. })
    }

    /// Path the error is about.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::UnknownFileSystem { path }
            | Self::Document { path, .. }
            | Self::Transient { path, .. }
            | Self::DirectoryListing { path, .. } => path,
        }
    }
}
