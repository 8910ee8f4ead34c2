#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `fscrawl_walk` produces the stream of files a traversal cycle feeds
//! downstream. A [`FileIterator`] walks one root depth-first with an explicit
//! frame stack (no call-stack recursion), so a transient failure leaves the
//! iterator in a resumable state and a consumer can push one item back for
//! retry after a pause.
//!
//! Directory listings arrive pre-sorted from the filesystem layer, which
//! makes emission order equal to the adjusted lexicographic order of full
//! paths (see `fscrawl_vfs::order`).
//!
//! # Error behavior
//!
//! - A forbidden directory listing prunes that subtree with a warning;
//!   siblings continue.
//! - A permanent per-node failure skips the node with a warning.
//! - A transient failure surfaces to the caller with the iterator positioned
//!   to reprocess the same node on the next call.

mod iterator;

pub use iterator::FileIterator;
