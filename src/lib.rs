#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `fscrawl` crawls directory trees on heterogeneous filesystems — local
//! POSIX, local Windows, SMB/CIFS shares, NFS exports — and feeds documents
//! describing their files, metadata, and access-control lists to a
//! downstream document acceptor. Crawls are scheduled and incremental:
//! after a first full pass only changed files are re-fed, with a periodic
//! forced full pass, and with synthetic ACL documents that let the consumer
//! reproduce Windows-style permission inheritance.
//!
//! This crate is the assembly point: it loads the [`config`] file, builds
//! the filesystem registry, and hands out the crawl engine
//! ([`FileLister`]) and the on-demand read path ([`FileRetriever`]). The
//! moving parts live in the member crates:
//!
//! - `fscrawl-vfs` — filesystem types and the readonly-file abstraction
//! - `fscrawl-filters` — include/exclude path admission
//! - `fscrawl-acl` — principals, ACLs, and rendering formats
//! - `fscrawl-walk` — the depth-first file iterator
//! - `fscrawl-feed` — documents, the document factory, and the retriever
//! - `fscrawl-lister` — traversers and the schedule-aware lister
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fscrawl::{Connector, CrawlerConfig, IntervalSchedule, JsonLinesAcceptor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CrawlerConfig::from_toml(r#"
//!     [crawl]
//!     start_paths = ["/srv/documents"]
//!     [acl]
//!     push_acls = false
//!     mark_all_documents_public = true
//! "#)?;
//! let schedule = Arc::new(IntervalSchedule::new(&config.schedule));
//! let connector = Connector::from_config(config)?;
//! let (mut lister, _handle) =
//!     connector.lister(Arc::new(JsonLinesAcceptor::stdout()), schedule);
//! lister.run_once();
//! # Ok(())
//! # }
//! ```

pub mod config;
mod schedule;
mod sink;

pub use config::{ConfigError, CrawlerConfig};
pub use schedule::IntervalSchedule;
pub use sink::JsonLinesAcceptor;

use std::sync::Arc;

use fscrawl_feed::{
    DocumentAcceptor, DocumentContext, ExtensionMimeDetector, FileRetriever, TraversalContext,
};
use fscrawl_filters::FilePatternMatcher;
use fscrawl_lister::{FileLister, ListerHandle, SystemClock, TraversalSchedule};
use fscrawl_vfs::{
    AclSource, Credentials, FileSystemType, NfsFileSystem, PathParser, PosixFileSystem,
    SmbDelegate, SmbFileSystem, StaticMountManager, WindowsFileSystem,
};

/// Assembled crawler: filesystem registry, document context, and the
/// configuration they were built from.
pub struct Connector {
    config: CrawlerConfig,
    parser: PathParser,
    context: DocumentContext,
    matcher: FilePatternMatcher,
    credentials: Option<Credentials>,
}

impl Connector {
    /// Builds a connector for local and NFS filesystems.
    pub fn from_config(config: CrawlerConfig) -> Result<Self, ConfigError> {
        Self::with_delegates(config, None, None)
    }

    /// Builds a connector with injected SMB and Windows-ACL access.
    pub fn with_delegates(
        config: CrawlerConfig,
        smb_delegate: Option<Arc<dyn SmbDelegate>>,
        windows_acl_source: Option<Arc<dyn AclSource>>,
    ) -> Result<Self, ConfigError> {
        let acl_config = config.acl_config()?;

        let mut types = Vec::new();
        if let Some(delegate) = smb_delegate {
            types.push(FileSystemType::Smb(SmbFileSystem::new(
                delegate,
                acl_config.clone(),
                config.crawl.last_access_reset_for_smb,
            )));
        } else if let Some(path) = config
            .crawl
            .start_paths
            .iter()
            .find(|p| p.to_ascii_lowercase().starts_with("smb://"))
        {
            return Err(ConfigError::Invalid(format!(
                "start path '{path}' needs an SMB delegate"
            )));
        }
        if !config.mounts.is_empty() {
            let mut mounts = StaticMountManager::new();
            for (url, local) in &config.mounts {
                mounts.register(url.clone(), local.clone());
            }
            types.push(FileSystemType::Nfs(NfsFileSystem::new(Arc::new(mounts))));
        }
        types.push(FileSystemType::Windows(WindowsFileSystem::new(
            windows_acl_source,
            acl_config,
            config.crawl.last_access_reset_for_local_windows,
        )));
        types.push(FileSystemType::Posix(PosixFileSystem));

        let context = DocumentContext::new(
            config.feed_options(),
            Arc::new(ExtensionMimeDetector),
            TraversalContext {
                max_document_size: config.crawl.max_document_size,
            },
        );
        let matcher = config.matcher()?;
        let credentials = config.credentials();

        Ok(Self {
            config,
            parser: PathParser::new(types),
            context,
            matcher,
            credentials,
        })
    }

    /// The configured start paths.
    #[must_use]
    pub fn start_paths(&self) -> &[String] {
        &self.config.crawl.start_paths
    }

    /// Creates the crawl engine and its control handle.
    #[must_use]
    pub fn lister(
        &self,
        acceptor: Arc<dyn DocumentAcceptor>,
        schedule: Arc<dyn TraversalSchedule>,
    ) -> (FileLister, ListerHandle) {
        FileLister::new(
            self.parser.clone(),
            self.context.clone(),
            self.credentials.clone(),
            self.matcher.clone(),
            acceptor,
            schedule,
            Arc::new(SystemClock),
            self.config.lister_settings(),
        )
    }

    /// Creates the on-demand metadata/content read path.
    #[must_use]
    pub fn retriever(&self) -> FileRetriever {
        FileRetriever::new(
            self.parser.clone(),
            self.context.clone(),
            self.credentials.clone(),
        )
    }
}
