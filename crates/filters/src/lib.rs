#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `fscrawl_filters` decides which paths a crawl admits. A
//! [`FilePatternMatcher`] is built from two ordered lists of patterns:
//! a path is accepted iff at least one include pattern matches and no
//! exclude pattern matches.
//!
//! Each pattern is a literal path prefix by default. The prefixes
//! `regexp:` and `regexpIgnoreCase:` switch a pattern to regular-expression
//! syntax; regex patterns may carry `%XX` percent-escapes, which are decoded
//! to bytes (and then UTF-8) before compilation so that line-separator
//! characters can be written into patterns without appearing literally in a
//! configuration file.
//!
//! # Invariants
//!
//! - Patterns are never compiled in multi-line mode: CR, LF, CR-LF, NEL
//!   (U+0085), LS (U+2028), and PS (U+2029) embedded in a path are ordinary
//!   characters and never terminate matching.
//! - The accept decision depends only on the path string; callers match
//!   regular files on their full path and never consult the matcher for
//!   directories.

mod matcher;
mod pattern;

pub use matcher::FilePatternMatcher;
pub use pattern::{Pattern, PatternError};
