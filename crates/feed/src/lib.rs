#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `fscrawl_feed` turns filesystem nodes into the documents a downstream
//! acceptor indexes. A regular file becomes one content document; with ACL
//! push enabled, each directory additionally becomes two synthetic ACL
//! documents (one inherited by subordinate directories, one by subordinate
//! files), and each crawl root gets a share-ACL document. Together these
//! form an inheritance tree rooted at the share document that lets the
//! downstream index reproduce Windows-style permission composition.
//!
//! Content and MIME type are exposed as lazy accessors on
//! [`FileDocument`]: the acceptor may never ask for them (for example when
//! an if-modified-since check shows nothing changed), so the filesystem is
//! only touched on demand.
//!
//! The [`FileRetriever`] is the parallel read path: given a document id it
//! re-opens the path and produces fresh metadata or bytes for the acceptor.

mod acceptor;
mod document;
mod factory;
mod mime;
mod retriever;

pub use acceptor::{AcceptorError, DocumentAcceptor, TraversalContext, VecAcceptor};
pub use document::{
    DocumentKind, FileDocument, InheritFrom, InheritanceType, PropName, PropertyValue,
    CONTAINER_INHERIT_ACL_PREFIX, FILE_INHERIT_ACL_PREFIX, SHARE_ACL_PREFIX,
};
pub use factory::{create_root_share_acl, get_documents, DocumentContext, FeedOptions};
pub use mime::{ExtensionMimeDetector, MimeTypeDetector};
pub use retriever::FileRetriever;
