//! Buffered byte streams over live blobs.

use bytes::{Buf, Bytes, BytesMut};
use futures::stream::{self, Stream};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::constants::*;

use super::channel::BlobChannel;
use super::live::LiveBlob;

fn buffer_size(requested: usize) -> usize {
    requested.clamp(1, MAX_BLOB_SEGMENT_SIZE)
}

/// Buffered reader over an input blob.
///
/// Once the blob is closed, either by [`close`](Self::close) or because its
/// transaction ended, reads fail with [`Error::StreamClosed`].
#[derive(Debug)]
pub struct BlobInputStream<'c, C: BlobChannel> {
    blob: LiveBlob<'c, C>,
    buffer: Bytes,
    buffer_size: usize,
    closed: bool,
}

impl<'c, C: BlobChannel + Send> BlobInputStream<'c, C> {
    pub fn new(blob: LiveBlob<'c, C>, buffer_size: usize) -> Self {
        Self {
            blob,
            buffer: Bytes::new(),
            buffer_size: self::buffer_size(buffer_size),
            closed: false,
        }
    }

    pub fn blob(&self) -> &LiveBlob<'c, C> {
        &self.blob
    }

    /// Bytes readable without a round trip.
    pub fn available(&self) -> usize {
        if self.closed {
            0
        } else {
            self.buffer.len()
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed || !self.blob.is_open() {
            return Err(Error::StreamClosed);
        }
        Ok(())
    }

    /// Refill the buffer; returns false at end of blob.
    async fn fill(&mut self) -> Result<bool> {
        if !self.buffer.is_empty() {
            return Ok(true);
        }
        self.buffer = self.blob.get_segment(self.buffer_size).await.map_err(|e| match e {
            Error::BlobClosed => Error::StreamClosed,
            other => other,
        })?;
        Ok(!self.buffer.is_empty())
    }

    /// Read into `buf`, returning the number of bytes read; 0 at end of
    /// blob.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() || !self.fill().await? {
            return Ok(0);
        }
        let n = buf.len().min(self.buffer.len());
        self.buffer.copy_to_slice(&mut buf[..n]);
        Ok(n)
    }

    /// Fill `buf` completely, failing if the blob ends first.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("Blob ended after {} of {} bytes", filled, buf.len()),
                )));
            }
            filled += n;
        }
        Ok(())
    }

    /// Read everything that remains.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let mut out = Vec::new();
        while self.fill().await? {
            out.extend_from_slice(&self.buffer);
            self.buffer.clear();
            self.ensure_open()?;
        }
        Ok(out)
    }

    /// Skip up to `n` bytes, returning the number skipped.
    pub async fn skip(&mut self, n: u64) -> Result<u64> {
        self.ensure_open()?;
        let mut skipped = 0u64;
        while skipped < n && self.fill().await? {
            let step = (n - skipped).min(self.buffer.len() as u64) as usize;
            self.buffer.advance(step);
            skipped += step as u64;
        }
        Ok(skipped)
    }

    /// Close the stream and the blob.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.buffer.clear();
        self.blob.close().await
    }

    /// Stream of buffer-sized chunks until end of blob.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes>> + 'c
    where
        C: 'c,
    {
        stream::unfold(Some(self), |state| async move {
            let mut input = state?;
            let chunk = match input.ensure_open() {
                Ok(()) => input.fill().await.map(|_| std::mem::take(&mut input.buffer)),
                Err(e) => Err(e),
            };
            match chunk {
                Ok(chunk) if chunk.is_empty() => None,
                Ok(chunk) => Some((Ok(chunk), Some(input))),
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

/// Buffered writer into an output blob.
#[derive(Debug)]
pub struct BlobOutputStream<'c, C: BlobChannel> {
    blob: LiveBlob<'c, C>,
    buffer: BytesMut,
    buffer_size: usize,
    written: u64,
    closed: bool,
}

impl<'c, C: BlobChannel + Send> BlobOutputStream<'c, C> {
    pub fn new(blob: LiveBlob<'c, C>, buffer_size: usize) -> Self {
        let buffer_size = self::buffer_size(buffer_size);
        Self {
            blob,
            buffer: BytesMut::with_capacity(buffer_size),
            buffer_size,
            written: 0,
            closed: false,
        }
    }

    pub fn blob_id(&self) -> u64 {
        self.blob.blob_id()
    }

    /// Bytes accepted so far, flushed or not.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed || !self.blob.is_open() {
            return Err(Error::StreamClosed);
        }
        Ok(())
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if self.buffer.is_empty() && data.len() >= self.buffer_size {
            // large writes bypass the buffer
            self.blob.put_segment(data).await?;
        } else {
            self.buffer.extend_from_slice(data);
            if self.buffer.len() >= self.buffer_size {
                self.flush().await?;
            }
        }
        self.written += data.len() as u64;
        Ok(())
    }

    /// Send buffered bytes to the server.
    pub async fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.buffer.is_empty() {
            return Ok(());
        }
        let data = self.buffer.split().freeze();
        self.blob.put_segment(&data).await
    }

    /// Copy up to `length` bytes from `source`.
    ///
    /// Stops early when `source` reaches end of file, so a source shorter
    /// than announced completes instead of waiting for bytes that never
    /// come. Returns the number of bytes copied.
    pub async fn write_from<R>(&mut self, source: &mut R, length: u64) -> Result<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.ensure_open()?;
        let mut chunk = vec![0u8; self.buffer_size];
        let mut copied = 0u64;
        while copied < length {
            let want = (length - copied).min(chunk.len() as u64) as usize;
            let n = source.read(&mut chunk[..want]).await?;
            if n == 0 {
                debug!(
                    target: "firebird_core::blob",
                    "source ended after {} of {} announced bytes", copied, length
                );
                break;
            }
            self.write(&chunk[..n]).await?;
            copied += n as u64;
        }
        Ok(copied)
    }

    /// Flush, close the blob and return its id.
    pub async fn close(&mut self) -> Result<u64> {
        if !self.closed {
            self.flush().await?;
            self.closed = true;
            self.blob.close().await?;
        }
        Ok(self.blob.blob_id())
    }
}
