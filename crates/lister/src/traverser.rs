use std::sync::Arc;
use std::time::Duration;

use fscrawl_feed::{
    create_root_share_acl, get_documents, AcceptorError, DocumentAcceptor, DocumentContext,
};
use fscrawl_filters::FilePatternMatcher;
use fscrawl_vfs::{Credentials, PathParser, ReadonlyFile, VfsError};
use fscrawl_walk::FileIterator;
use thiserror::Error;
use tracing::{debug, info_span, warn};

use crate::schedule::Clock;
use crate::service::TraversalService;

/// Failure that marks a traversal cycle as errored.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Repository-level failure that survived retrying.
    #[error(transparent)]
    Repository(#[from] VfsError),
    /// The document acceptor rejected a submission or flush.
    #[error(transparent)]
    Acceptor(#[from] AcceptorError),
}

/// Per-traverser tuning, fixed at startup.
#[derive(Clone, Debug)]
pub struct TraverserConfig {
    /// Safety margin subtracted from the incremental cutoff to tolerate
    /// server clock skew and coarse timestamps.
    pub if_modified_since_cushion_millis: i64,
    /// Forced-full-traversal period: negative never forces, zero forces
    /// every cycle, positive forces once the period has elapsed.
    pub full_traversal_interval_millis: i64,
    /// Pause after a transient failure before retrying the same file.
    pub error_delay: Duration,
}

impl Default for TraverserConfig {
    fn default() -> Self {
        Self {
            if_modified_since_cushion_millis: 60 * 60 * 1000,
            full_traversal_interval_millis: 24 * 60 * 60 * 1000,
            error_delay: Duration::from_secs(5 * 60),
        }
    }
}

/// One start path's scheduled crawl cycle.
///
/// Owns the incremental-traversal state for its root; the lister runs it
/// once per cycle from a worker thread.
pub struct Traverser {
    start_path: String,
    parser: PathParser,
    context: DocumentContext,
    credentials: Option<Credentials>,
    matcher: FilePatternMatcher,
    acceptor: Arc<dyn DocumentAcceptor>,
    service: Arc<TraversalService>,
    clock: Arc<dyn Clock>,
    config: TraverserConfig,
    last_full_traversal: i64,
    last_traversal: i64,
}

impl Traverser {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        start_path: String,
        parser: PathParser,
        context: DocumentContext,
        credentials: Option<Credentials>,
        matcher: FilePatternMatcher,
        acceptor: Arc<dyn DocumentAcceptor>,
        service: Arc<TraversalService>,
        clock: Arc<dyn Clock>,
        config: TraverserConfig,
    ) -> Self {
        Self {
            start_path,
            parser,
            context,
            credentials,
            matcher,
            acceptor,
            service,
            clock,
            config,
            last_full_traversal: 0,
            last_traversal: 0,
        }
    }

    /// The root this traverser crawls.
    #[must_use]
    pub fn start_path(&self) -> &str {
        &self.start_path
    }

    pub(crate) fn replace_service(&mut self, service: Arc<TraversalService>) {
        self.service = service;
    }

    /// Computes the incremental cutoff for a cycle starting at `start_time`,
    /// resetting the full-traversal timer when a full pass is due.
    fn if_modified_since(&mut self, start_time: i64) -> i64 {
        if self.config.full_traversal_interval_millis >= 0
            && (start_time - self.last_full_traversal)
                >= self.config.full_traversal_interval_millis
        {
            self.last_full_traversal = 0;
            0
        } else {
            (self.last_traversal - self.config.if_modified_since_cushion_millis).max(0)
        }
    }

    /// Records that the pass which started at `start_time` completed.
    fn finished_traversal(&mut self, start_time: i64) {
        if self.last_full_traversal == 0 {
            self.last_full_traversal = start_time;
        }
        self.last_traversal = start_time;
    }

    fn is_shutdown(&self) -> bool {
        self.service.is_shutdown()
    }

    /// Runs one traversal cycle over the root.
    pub(crate) fn run(&mut self) -> Result<(), CycleError> {
        let _span = info_span!("traverse", root = %self.start_path).entered();
        debug!("start traversal");

        let root = match self.parser.get_file(&self.start_path, self.credentials.as_ref()) {
            Ok(root) => root,
            Err(e) if e.is_transient() => return Err(e.into()),
            Err(e) => {
                // Permanent for now; the next scheduled cycle retries.
                warn!(error = %e, "failed to open start path");
                return Ok(());
            }
        };

        let result = self.traverse(&root);
        debug!("end traversal");
        let flushed = self.acceptor.flush();
        result?;
        flushed?;
        Ok(())
    }

    fn traverse(&mut self, root: &ReadonlyFile) -> Result<(), CycleError> {
        let start_time = self.clock.now_millis();
        let options = self.context.options;
        let return_directories = root.kind().supports_acls()
            && options.push_acls
            && options.supports_inherited_acls
            && !options.mark_all_documents_public;

        let if_modified_since = self.if_modified_since(start_time);
        let mut iter = FileIterator::new(
            root.clone(),
            self.matcher.clone(),
            if_modified_since,
            return_directories,
        );

        if return_directories {
            match create_root_share_acl(root) {
                Ok(Some(doc)) => self.acceptor.take(doc)?,
                Ok(None) => {}
                Err(e) => {
                    warn!(root = %root.path(), error = %e, "failed to feed root share ACL");
                    return Err(e.into());
                }
            }
        }

        loop {
            if self.is_shutdown() {
                // Interrupted pass: leave the incremental state untouched.
                return Ok(());
            }
            let file = match iter.next() {
                Ok(Some(file)) => file,
                Ok(None) => break,
                Err(e) => {
                    debug_assert!(e.is_transient());
                    warn!(error = %e, "transient failure; pausing before retry");
                    if self.service.sleep(self.config.error_delay) {
                        return Ok(());
                    }
                    continue;
                }
            };

            let path = file.path();
            match get_documents(&file, &self.context, root) {
                Ok(documents) => {
                    for document in documents {
                        if self.is_shutdown() {
                            return Ok(());
                        }
                        self.acceptor.take(document)?;
                    }
                }
                Err(e) if e.is_transient() => {
                    warn!(%path, error = %e, "transient failure; pausing before retry");
                    if self.is_shutdown() {
                        return Ok(());
                    }
                    iter.push_back(file);
                    if self.service.sleep(self.config.error_delay) {
                        return Ok(());
                    }
                }
                Err(e) => {
                    warn!(%path, error = %e, "failed to feed document");
                }
            }
        }

        self.finished_traversal(start_time);
        Ok(())
    }
}
