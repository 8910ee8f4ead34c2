use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use filetime::FileTime;
use tracing::warn;

/// Content reader that restores the file's last-access time on drop.
///
/// Reading bytes off Windows and SMB filesystems bumps the last-accessed
/// timestamp as a side effect, which defeats retention tooling keyed on
/// access recency. The reader captures the pre-read access time when it is
/// constructed and writes it back when the stream is dropped. Restoration is
/// best effort: a failure is logged at warning level and never surfaces.
pub struct AccessTimePreservingReader<R> {
    inner: R,
    path: PathBuf,
    atime: FileTime,
}

impl<R: Read> AccessTimePreservingReader<R> {
    /// Wraps `inner`, capturing the current access time of `path`.
    pub fn capturing(path: &Path, inner: R) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            inner,
            path: path.to_path_buf(),
            atime: FileTime::from_last_access_time(&metadata),
        })
    }
}

impl<R: Read> Read for AccessTimePreservingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R> Drop for AccessTimePreservingReader<R> {
    fn drop(&mut self) {
        if let Err(error) = filetime::set_file_atime(&self.path, self.atime) {
            warn!(
                path = %self.path.display(),
                %error,
                "failed to restore last-access time"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;

    #[test]
    fn restores_access_time_after_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("file.txt");
        fs::write(&path, b"contents").expect("write");

        let before = FileTime::from_last_access_time(&fs::metadata(&path).expect("metadata"));

        {
            let file = fs::File::open(&path).expect("open");
            let mut reader = AccessTimePreservingReader::capturing(&path, file).expect("capture");
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).expect("read");
            assert_eq!(buf, b"contents");
        }

        let after = FileTime::from_last_access_time(&fs::metadata(&path).expect("metadata"));
        assert_eq!(before, after);
    }
}
