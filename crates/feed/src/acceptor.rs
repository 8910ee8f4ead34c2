use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use thiserror::Error as ThisError;

use crate::document::FileDocument;

/// Failure reported by the downstream document acceptor.
#[derive(Debug, ThisError)]
#[error("document acceptor failed: {message}")]
pub struct AcceptorError {
    message: String,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl AcceptorError {
    /// Creates an error from a message alone.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: Box<dyn Error + Send + Sync>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source),
        }
    }
}

/// The downstream sink the crawl feeds.
///
/// Implementations are invoked from multiple traverser threads and must be
/// reentrant. `take` may block for backpressure. A stream handed out through
/// [`FileDocument::content`] is owned by the acceptor, which must close it.
pub trait DocumentAcceptor: Send + Sync {
    /// Submits one document.
    fn take(&self, document: FileDocument) -> Result<(), AcceptorError>;

    /// Flushes buffered documents; called at the end of every traversal
    /// cycle, successful or not.
    fn flush(&self) -> Result<(), AcceptorError>;

    /// Tells the sink the crawl is shutting down; called exactly once.
    fn cancel(&self) -> Result<(), AcceptorError>;
}

/// Limits the crawl honors when producing documents.
#[derive(Clone, Copy, Debug)]
pub struct TraversalContext {
    /// Largest content size the acceptor will take, in bytes.
    pub max_document_size: u64,
}

impl Default for TraversalContext {
    fn default() -> Self {
        Self {
            max_document_size: 30 * 1024 * 1024,
        }
    }
}

/// Collecting acceptor for tests: records docids in arrival order.
#[derive(Debug, Default)]
pub struct VecAcceptor {
    documents: Mutex<Vec<FileDocument>>,
    flushes: AtomicUsize,
    cancels: AtomicUsize,
}

impl VecAcceptor {
    /// Creates an empty acceptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Docids taken so far, in order.
    #[must_use]
    pub fn docids(&self) -> Vec<String> {
        self.lock().iter().map(|d| d.docid().to_owned()).collect()
    }

    /// Runs `f` over the collected documents.
    pub fn with_documents<T>(&self, f: impl FnOnce(&[FileDocument]) -> T) -> T {
        f(&self.lock())
    }

    /// Number of documents taken.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing was taken.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clears collected documents.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of `flush` calls observed.
    #[must_use]
    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// Number of `cancel` calls observed.
    #[must_use]
    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<FileDocument>> {
        self.documents
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl DocumentAcceptor for VecAcceptor {
    fn take(&self, document: FileDocument) -> Result<(), AcceptorError> {
        self.lock().push(document);
        Ok(())
    }

    fn flush(&self) -> Result<(), AcceptorError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn cancel(&self) -> Result<(), AcceptorError> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
