//! Output sinks for captured child streams.

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;

/// Destination for one captured stream of a child process.
#[derive(Debug, Clone, Default)]
pub enum Sink {
    /// This process's standard output.
    #[default]
    Stdout,
    /// This process's standard error.
    Stderr,
    /// Discard everything.
    Null,
    /// Append to an in-memory buffer.
    Buffer(SharedBuffer),
}

impl Sink {
    /// Opens a writer for this sink.
    pub(crate) fn writer(&self) -> Box<dyn AsyncWrite + Send + Unpin> {
        match self {
            Sink::Stdout => Box::new(tokio::io::stdout()),
            Sink::Stderr => Box::new(tokio::io::stderr()),
            Sink::Null => Box::new(tokio::io::sink()),
            Sink::Buffer(buffer) => Box::new(BufferWriter(buffer.clone())),
        }
    }
}

/// Cloneable in-memory byte buffer shared between a sink and its reader.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the collected bytes.
    pub fn bytes(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Returns the collected bytes as (lossy) UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    /// Returns true if nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Discards the collected bytes.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // A panic while holding the lock cannot leave a Vec<u8> half-updated.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl From<SharedBuffer> for Sink {
    fn from(buffer: SharedBuffer) -> Self {
        Sink::Buffer(buffer)
    }
}

struct BufferWriter(SharedBuffer);

impl AsyncWrite for BufferWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.0.lock().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
