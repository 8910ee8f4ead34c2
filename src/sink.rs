//! JSON-lines document acceptor used by the CLI.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde_json::{json, Map, Value};

use fscrawl_feed::{AcceptorError, DocumentAcceptor, DocumentKind, FileDocument, PropertyValue};

/// Writes one JSON object per document to the wrapped writer.
///
/// Property values serialize as strings, numbers, and booleans; principals
/// serialize as their rendered names. Content is never inlined — the feed
/// mode is `contenturl`, so consumers fetch bytes through the retriever.
pub struct JsonLinesAcceptor<W: Write + Send> {
    writer: Mutex<W>,
    cancelled: AtomicBool,
}

impl JsonLinesAcceptor<io::Stdout> {
    /// Acceptor writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesAcceptor<W> {
    /// Acceptor writing to `writer`.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            cancelled: AtomicBool::new(false),
        }
    }

    fn render(document: &FileDocument) -> Value {
        let mut properties = Map::new();
        for (name, values) in document.properties() {
            let rendered: Vec<Value> = values
                .iter()
                .map(|value| match value {
                    PropertyValue::String(s) => Value::String(s.clone()),
                    PropertyValue::Long(n) => Value::from(*n),
                    PropertyValue::Bool(b) => Value::from(*b),
                    PropertyValue::Principal(p) => Value::String(p.name().to_owned()),
                })
                .collect();
            properties.insert(name.as_str().to_owned(), Value::Array(rendered));
        }
        json!({
            "docid": document.docid(),
            "kind": match document.kind() {
                DocumentKind::Content => "content",
                DocumentKind::Acl => "acl",
            },
            "properties": properties,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, W> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> DocumentAcceptor for JsonLinesAcceptor<W> {
    fn take(&self, document: FileDocument) -> Result<(), AcceptorError> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(AcceptorError::new("acceptor is cancelled"));
        }
        let line = Self::render(&document);
        let mut writer = self.lock();
        writeln!(writer, "{line}")
            .map_err(|e| AcceptorError::with_source("failed to write document", Box::new(e)))
    }

    fn flush(&self) -> Result<(), AcceptorError> {
        self.lock()
            .flush()
            .map_err(|e| AcceptorError::with_source("failed to flush feed", Box::new(e)))
    }

    fn cancel(&self) -> Result<(), AcceptorError> {
        self.cancelled.store(true, Ordering::SeqCst);
        self.flush()
    }
}
