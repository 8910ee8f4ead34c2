use fscrawl_vfs::{ContentStream, Credentials, PathParser, VfsError};
use tracing::{debug, warn};

use crate::document::FileDocument;
use crate::factory::{get_documents, DocumentContext};

/// On-demand lookup of fresh metadata and content by document id.
///
/// This is the acceptor's read path: after the crawl has fed a docid, the
/// acceptor calls back here (possibly much later, from arbitrary threads) to
/// fetch the document's current state. Content docids are exact paths, so
/// lookup is a fresh resolution through the path classifier.
#[derive(Clone, Debug)]
pub struct FileRetriever {
    parser: PathParser,
    context: DocumentContext,
    credentials: Option<Credentials>,
}

impl FileRetriever {
    /// Creates a retriever.
    #[must_use]
    pub fn new(
        parser: PathParser,
        context: DocumentContext,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            parser,
            context,
            credentials,
        }
    }

    /// Produces a fresh metadata document for `docid`.
    ///
    /// # Errors
    ///
    /// [`VfsError::UnknownFileSystem`] for an unregistered prefix, a
    /// permanent [`VfsError::Document`] when the file is missing or
    /// unreadable, and [`VfsError::Transient`] when the repository is
    /// temporarily unreachable.
    pub fn get_metadata(&self, docid: &str) -> Result<FileDocument, VfsError> {
        let file = self.parser.get_file(docid, self.credentials.as_ref())?;
        // The file stands in for its own root: the retriever serves point
        // lookups and does not walk an inheritance chain.
        let mut documents = get_documents(&file, &self.context, &file)?;
        Ok(documents.remove(0))
    }

    /// Produces the current content of `docid`, or `None` when the document
    /// carries none: directories, empty files, or content larger than the
    /// acceptor accepts.
    ///
    /// # Errors
    ///
    /// [`VfsError::UnknownFileSystem`] for an unregistered prefix and
    /// [`VfsError::Transient`] for repository outages. Missing and
    /// unreadable files yield `Ok(None)`.
    pub fn get_content(&self, docid: &str) -> Result<Option<ContentStream>, VfsError> {
        let file = match self.parser.get_file(docid, self.credentials.as_ref()) {
            Ok(file) => file,
            Err(e @ (VfsError::UnknownFileSystem { .. } | VfsError::Transient { .. })) => {
                return Err(e);
            }
            Err(e) => {
                debug!(docid, error = %e, "no content for document");
                return Ok(None);
            }
        };

        if file.is_directory()? {
            return Ok(None);
        }
        let length = file.length()?;
        if length == 0 {
            debug!(docid, "empty file has no content");
            return Ok(None);
        }
        if length > self.context.traversal.max_document_size {
            warn!(
                docid,
                length,
                limit = self.context.traversal.max_document_size,
                "content exceeds maximum document size"
            );
            return Ok(None);
        }

        match file.open() {
            Ok(stream) => Ok(Some(stream)),
            Err(e) => {
                let mapped = VfsError::from_io(docid, e);
                if mapped.is_transient() {
                    Err(mapped)
                } else {
                    debug!(docid, error = %mapped, "content unreadable");
                    Ok(None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acceptor::TraversalContext;
    use crate::document::PropName;
    use crate::factory::FeedOptions;
    use crate::mime::ExtensionMimeDetector;
    use fscrawl_vfs::{FileSystemType, InjectedError, MemoryFileSystem};
    use std::io::Read as _;
    use std::sync::Arc;

    const TEST_DATA: &str = "Test Data.";

    fn retriever_over(max_size: u64) -> (FileRetriever, MemoryFileSystem) {
        let fs = MemoryFileSystem::new("/root");
        fs.add_file("/root/test.txt", TEST_DATA.as_bytes());
        let parser = PathParser::new(vec![FileSystemType::Memory(fs.clone())]);
        let context = DocumentContext::new(
            FeedOptions {
                push_acls: false,
                mark_all_documents_public: true,
                supports_inherited_acls: true,
            },
            Arc::new(ExtensionMimeDetector),
            TraversalContext {
                max_document_size: max_size,
            },
        );
        (FileRetriever::new(parser, context, None), fs)
    }

    #[test]
    fn metadata_for_unknown_prefix() {
        let (retriever, _fs) = retriever_over(1024);
        let error = retriever.get_metadata("/nonexistent/test.txt").unwrap_err();
        assert!(matches!(error, VfsError::UnknownFileSystem { .. }));
    }

    #[test]
    fn metadata_for_missing_file() {
        let (retriever, _fs) = retriever_over(1024);
        let error = retriever.get_metadata("/root/nonexistent.txt").unwrap_err();
        assert!(matches!(error, VfsError::Document { .. }));
    }

    #[test]
    fn metadata_for_unreadable_file() {
        let (retriever, fs) = retriever_over(1024);
        fs.set_readable("/root/test.txt", false);
        let error = retriever.get_metadata("/root/test.txt").unwrap_err();
        assert!(matches!(error, VfsError::Document { .. }));
    }

    #[test]
    fn metadata_carries_the_docid() {
        let (retriever, _fs) = retriever_over(1024);
        let doc = retriever.get_metadata("/root/test.txt").expect("metadata");
        assert_eq!(doc.docid(), "/root/test.txt");
        assert_eq!(doc.string_property(PropName::DocId), Some("/root/test.txt"));
    }

    #[test]
    fn metadata_during_outage_is_transient() {
        let (retriever, fs) = retriever_over(1024);
        fs.fail_always("/root/test.txt", InjectedError::Transient);
        let error = retriever.get_metadata("/root/test.txt").unwrap_err();
        assert!(error.is_transient());
    }

    #[test]
    fn content_round_trips() {
        let (retriever, _fs) = retriever_over(1024);
        let mut stream = retriever
            .get_content("/root/test.txt")
            .expect("content")
            .expect("present");
        let mut body = String::new();
        stream.read_to_string(&mut body).expect("read");
        assert_eq!(body, TEST_DATA);
    }

    #[test]
    fn directories_and_empty_files_have_no_content() {
        let (retriever, fs) = retriever_over(1024);
        fs.add_dir("/root/dir");
        fs.add_file("/root/empty.txt", b"");

        assert!(retriever.get_content("/root/dir").expect("ok").is_none());
        assert!(retriever
            .get_content("/root/empty.txt")
            .expect("ok")
            .is_none());
    }

    #[test]
    fn oversize_content_is_withheld() {
        // Limit exactly at the content size admits it; one byte less does not.
        let (retriever, _fs) = retriever_over(TEST_DATA.len() as u64);
        assert!(retriever
            .get_content("/root/test.txt")
            .expect("ok")
            .is_some());

        let (retriever, _fs) = retriever_over(TEST_DATA.len() as u64 - 1);
        assert!(retriever
            .get_content("/root/test.txt")
            .expect("ok")
            .is_none());
    }

    #[test]
    fn content_open_failure_is_withheld_not_retried() {
        // A bare I/O failure from the content stream, with no network
        // shape, withholds the content permanently.
        let (retriever, fs) = retriever_over(1024);
        fs.fail_always("/root/test.txt", InjectedError::Open);
        assert!(retriever
            .get_content("/root/test.txt")
            .expect("not transient")
            .is_none());
    }

    #[test]
    fn missing_content_is_none_not_error() {
        let (retriever, _fs) = retriever_over(1024);
        assert!(retriever
            .get_content("/root/gone.txt")
            .expect("ok")
            .is_none());
    }
}
