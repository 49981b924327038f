//! Output sinks the renderer writes to.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::sync::lock_recover;

/// In-memory sink shared between the renderer and a reader.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

impl CaptureBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&lock_recover(&self.0)).into_owned()
    }

    /// Take the captured bytes, leaving the buffer empty.
    #[must_use]
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *lock_recover(&self.0));
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn clear(&self) {
        lock_recover(&self.0).clear();
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock_recover(&self.0).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Destination of rendered output.
#[derive(Debug, Default)]
pub enum OutputSink {
    /// The process standard error stream.
    #[default]
    Stderr,
    /// A file opened by [`OutputSink::file`].
    File { path: PathBuf, writer: BufWriter<File> },
    /// An in-memory buffer.
    Capture(CaptureBuffer),
}

impl OutputSink {
    /// Create (or truncate) `path` and write to it.
    ///
    /// # Errors
    ///
    /// Propagates the error from creating the file.
    pub fn file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self::File { path, writer })
    }

    #[must_use]
    pub fn is_console(&self) -> bool {
        matches!(self, Self::Stderr)
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stderr => io::stderr().write(buf),
            Self::File { writer, .. } => writer.write(buf),
            Self::Capture(buffer) => buffer.write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Self::Stderr => io::stderr().lock().write_all(buf),
            Self::File { writer, .. } => writer.write_all(buf),
            Self::Capture(buffer) => buffer.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stderr => io::stderr().flush(),
            Self::File { writer, .. } => writer.flush(),
            Self::Capture(buffer) => buffer.flush(),
        }
    }
}
