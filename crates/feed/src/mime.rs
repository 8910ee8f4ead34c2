use std::fmt;
use std::io::{self, Read};

use fscrawl_vfs::ReadonlyFile;

/// Pluggable MIME detection.
///
/// The acceptor may substitute its own detector; the crawl only promises to
/// call it lazily, when a document's MIME type is actually requested.
pub trait MimeTypeDetector: Send + Sync + fmt::Debug {
    /// Detects the MIME type of `file`, using its `name` as a hint.
    fn mime_type(&self, name: &str, file: &ReadonlyFile) -> io::Result<String>;
}

/// Default detector: magic-byte sniffing with an extension fallback.
#[derive(Debug, Default)]
pub struct ExtensionMimeDetector;

const SNIFF_LEN: usize = 8192;

impl MimeTypeDetector for ExtensionMimeDetector {
    fn mime_type(&self, name: &str, file: &ReadonlyFile) -> io::Result<String> {
        let mut head = vec![0_u8; SNIFF_LEN];
        let mut reader = file.open()?;
        let mut filled = 0;
        while filled < head.len() {
            let n = reader.read(&mut head[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        head.truncate(filled);

        if let Some(kind) = infer::get(&head) {
            return Ok(kind.mime_type().to_owned());
        }
        Ok(by_extension(name).to_owned())
    }
}

fn by_extension(name: &str) -> &'static str {
    let extension = name.rsplit('.').next().unwrap_or("");
    match extension.to_ascii_lowercase().as_str() {
        "txt" | "log" | "cfg" | "conf" | "ini" => "text/plain",
        "htm" | "html" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "xml" => "text/xml",
        "js" => "text/javascript",
        "json" => "application/json",
        "md" => "text/markdown",
        _ => "application/octet-stream",
    }
}
