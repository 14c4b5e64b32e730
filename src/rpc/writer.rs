//! Serialized access to the output stream.
//!
//! Every protocol line (response or chunk notification) goes through one
//! `OutputWriter`. The line is encoded before the lock is taken; the lock is
//! then held across `write_all` + `flush` so concurrent writers can never
//! interleave partial lines.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::codec::{self, Notification};
use crate::error::ToolError;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Cloneable handle to the single output stream.
#[derive(Clone)]
pub struct OutputWriter {
    inner: Arc<Mutex<BoxedWriter>>,
}

impl OutputWriter {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Write one message as a single newline-terminated line and flush.
    pub async fn write_message<T: Serialize>(&self, message: &T) -> Result<(), std::io::Error> {
        let mut line = codec::encode(message).map_err(|e| {
            error!("[rpc] Failed to serialize message: {}", e);
            std::io::Error::new(std::io::ErrorKind::InvalidData, e)
        })?;
        line.push('\n');

        let mut out = self.inner.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }
}

/// Emission callback handed to streaming tools.
///
/// Each emitted value is wrapped as a `chunk` notification and written before
/// `emit` returns, so the tool only continues once its chunk is on the wire.
pub struct ChunkEmitter {
    writer: OutputWriter,
    emitted: AtomicUsize,
}

impl ChunkEmitter {
    pub fn new(writer: OutputWriter) -> Self {
        Self {
            writer,
            emitted: AtomicUsize::new(0),
        }
    }

    pub async fn emit(&self, value: Value) -> Result<(), ToolError> {
        self.writer.write_message(&Notification::chunk(value)).await?;
        let n = self.emitted.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("[rpc] Emitted chunk #{}", n);
        Ok(())
    }

    /// Number of chunks written so far.
    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Relaxed)
    }
}
