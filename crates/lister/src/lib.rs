#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `fscrawl_lister` runs the crawl. A [`FileLister`] owns one [`Traverser`]
//! per configured start path and drives them through repeated cycles under
//! an externally supplied [`TraversalSchedule`]: sleep until the schedule
//! window opens, run every traverser on a bounded worker pool, then sleep
//! the retry delay (or a shorter error delay when a cycle had failures) and
//! go again.
//!
//! The first pass over a root feeds everything. Later passes are
//! incremental: only files modified since the previous pass (minus a
//! configurable cushion for clock skew) are re-fed, with a periodic forced
//! full pass so the downstream index cannot drift from reality. With ACL
//! push enabled, directories are always fed so their inheritance documents
//! stay current.
//!
//! Control is message-based: a [`ListerHandle`] delivers schedule changes
//! and shutdown to the lister, waking it mid-sleep. Shutdown is sticky and
//! cooperative; traversers observe it between steps and the lister finishes
//! by cancelling the document acceptor exactly once.

mod lister;
mod schedule;
mod service;
mod traverser;

pub use lister::{FileLister, ListerHandle, ListerSettings};
pub use schedule::{Clock, SystemClock, TraversalSchedule};
pub use traverser::{CycleError, Traverser, TraverserConfig};
