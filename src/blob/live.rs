//! Live segmented blob bound to a server transaction.

use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::info::{BlobInfo, BLOB_INFO_ITEMS, BLOB_LENGTH_ITEMS};
use crate::transaction::{ResourceBinding, TransactionRegistry};

use super::channel::{unpack_segments, with_timeout, BlobChannel, BlobHandle, SeekMode, SegmentStatus};

/// Direction a blob was opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobMode {
    /// Existing blob opened for reading.
    Input,
    /// New blob being written.
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlobState {
    Open,
    Closed,
}

/// A blob open on the server.
///
/// The blob holds the channel mutably for its lifetime, so at most one
/// blob round trip is in flight per channel. Ending the owning transaction
/// closes the blob: every later operation fails with
/// [`Error::BlobClosed`].
pub struct LiveBlob<'c, C: BlobChannel> {
    channel: &'c mut C,
    binding: ResourceBinding,
    handle: BlobHandle,
    blob_id: u64,
    mode: BlobMode,
    state: BlobState,
    eof: bool,
    position: u64,
    length: Option<u64>,
    socket_timeout: Option<Duration>,
}

impl<C: BlobChannel> std::fmt::Debug for LiveBlob<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveBlob")
            .field("handle", &self.handle)
            .field("blob_id", &self.blob_id)
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("position", &self.position)
            .finish()
    }
}

impl<'c, C: BlobChannel + Send> LiveBlob<'c, C> {
    /// Open an existing blob for reading in the registry's active
    /// transaction.
    pub async fn open(
        channel: &'c mut C,
        registry: &TransactionRegistry,
        blob_id: u64,
        socket_timeout: Option<Duration>,
    ) -> Result<Self> {
        let binding = registry.register()?;
        let handle = with_timeout(
            socket_timeout,
            channel.open_blob(binding.transaction_id(), blob_id),
        )
        .await?;
        debug!(target: "firebird_core::blob", "opened blob {:#x} as handle {}", blob_id, handle);
        Ok(Self::new(channel, binding, handle, blob_id, BlobMode::Input, socket_timeout))
    }

    /// Create a new blob in the registry's active transaction.
    pub async fn create(
        channel: &'c mut C,
        registry: &TransactionRegistry,
        socket_timeout: Option<Duration>,
    ) -> Result<Self> {
        let binding = registry.register()?;
        let (handle, blob_id) =
            with_timeout(socket_timeout, channel.create_blob(binding.transaction_id())).await?;
        debug!(target: "firebird_core::blob", "created blob {:#x} as handle {}", blob_id, handle);
        let mut blob = Self::new(channel, binding, handle, blob_id, BlobMode::Output, socket_timeout);
        blob.length = Some(0);
        Ok(blob)
    }

    fn new(
        channel: &'c mut C,
        binding: ResourceBinding,
        handle: BlobHandle,
        blob_id: u64,
        mode: BlobMode,
        socket_timeout: Option<Duration>,
    ) -> Self {
        Self {
            channel,
            binding,
            handle,
            blob_id,
            mode,
            state: BlobState::Open,
            eof: false,
            position: 0,
            length: None,
            socket_timeout,
        }
    }

    pub fn blob_id(&self) -> u64 {
        self.blob_id
    }

    pub fn mode(&self) -> BlobMode {
        self.mode
    }

    /// Whether the blob is open and its transaction still active.
    pub fn is_open(&self) -> bool {
        self.state == BlobState::Open && self.binding.is_live()
    }

    /// Whether a read reached the end of the blob.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Current read or write position.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == BlobState::Closed {
            return Err(Error::BlobClosed);
        }
        self.binding.ensure_live()
    }

    fn ensure_mode(&self, mode: BlobMode) -> Result<()> {
        self.ensure_open()?;
        if self.mode == mode {
            return Ok(());
        }
        Err(match mode {
            BlobMode::Input => Error::blob_state(
                ISC_SEGSTR_NO_READ,
                "Attempted reading on a blob opened for writing",
            ),
            BlobMode::Output => Error::blob_state(
                ISC_SEGSTR_NO_WRITE,
                "Attempted writing on a blob opened for reading",
            ),
        })
    }

    /// Blob length in bytes.
    ///
    /// Fetched with an info round trip on first use and cached for the
    /// lifetime of the handle. Writes through this handle keep the cached
    /// value current.
    pub async fn length(&mut self) -> Result<u64> {
        self.ensure_open()?;
        if let Some(length) = self.length {
            return Ok(length);
        }
        let response = with_timeout(
            self.socket_timeout,
            self.channel.info(self.handle, BLOB_LENGTH_ITEMS),
        )
        .await?;
        let length = BlobInfo::parse(response)?.require_total_length()?;
        self.length = Some(length);
        Ok(length)
    }

    /// Full blob info (segment count, largest segment, length, type).
    pub async fn info(&mut self) -> Result<BlobInfo> {
        self.ensure_open()?;
        let response = with_timeout(
            self.socket_timeout,
            self.channel.info(self.handle, BLOB_INFO_ITEMS),
        )
        .await?;
        let info = BlobInfo::parse(response)?;
        if let Some(length) = info.total_length.filter(|l| *l >= 0) {
            self.length = Some(length as u64);
        }
        Ok(info)
    }

    /// Move the read position; returns the new absolute position.
    pub async fn seek(&mut self, offset: i64, mode: SeekMode) -> Result<u64> {
        self.ensure_mode(BlobMode::Input)?;
        if mode == SeekMode::Absolute && offset < 0 {
            return Err(Error::usage(
                ISC_BAD_SEGSTR_TYPE,
                format!("Cannot seek to negative absolute position {}", offset),
            ));
        }
        let offset = i32::try_from(offset).map_err(|_| {
            Error::usage(ISC_BAD_SEGSTR_TYPE, format!("Seek offset {} out of range", offset))
        })?;
        let position = with_timeout(
            self.socket_timeout,
            self.channel.seek(self.handle, mode, offset),
        )
        .await?;
        self.position = position;
        self.eof = self.length.is_some_and(|l| position >= l);
        Ok(position)
    }

    /// Read up to `max_length` bytes (capped at one segment).
    ///
    /// Returns an empty buffer at end of blob. Reading never goes past the
    /// cached length.
    pub async fn get_segment(&mut self, max_length: usize) -> Result<Bytes> {
        self.ensure_mode(BlobMode::Input)?;
        if self.eof || max_length == 0 {
            return Ok(Bytes::new());
        }
        if self.length.is_some_and(|l| self.position >= l) {
            self.eof = true;
            return Ok(Bytes::new());
        }
        let buffer_length = max_length.min(MAX_BLOB_SEGMENT_SIZE) + 2;
        let response = with_timeout(
            self.socket_timeout,
            self.channel.get_segment(self.handle, buffer_length),
        )
        .await?;
        let data = unpack_segments(response.data)?;
        trace!(
            target: "firebird_core::blob",
            "get segment on handle {}: {} bytes, {:?}", self.handle, data.len(), response.status
        );
        // An empty non-final response would otherwise loop forever.
        if response.status == SegmentStatus::EndOfBlob || data.is_empty() {
            self.eof = true;
        }
        self.position += data.len() as u64;
        Ok(data)
    }

    /// Write `data`, split into segments of at most
    /// [`MAX_BLOB_SEGMENT_SIZE`] bytes.
    pub async fn put_segment(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_mode(BlobMode::Output)?;
        for chunk in data.chunks(MAX_BLOB_SEGMENT_SIZE) {
            with_timeout(
                self.socket_timeout,
                self.channel.put_segment(self.handle, chunk),
            )
            .await?;
            trace!(target: "firebird_core::blob", "put segment on handle {}: {} bytes", self.handle, chunk.len());
            self.position += chunk.len() as u64;
        }
        self.length = Some(self.position);
        Ok(())
    }

    /// Close the blob.
    ///
    /// Closing twice is a no-op. A blob whose transaction already ended is
    /// closed server-side, so only the local state changes.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == BlobState::Closed {
            return Ok(());
        }
        self.state = BlobState::Closed;
        let live = self.binding.is_live();
        self.binding.release();
        if live {
            with_timeout(self.socket_timeout, self.channel.close_blob(self.handle)).await?;
        }
        debug!(target: "firebird_core::blob", "closed blob {:#x}", self.blob_id);
        Ok(())
    }

    /// Discard a blob being written.
    pub async fn cancel(&mut self) -> Result<()> {
        self.ensure_mode(BlobMode::Output)?;
        self.state = BlobState::Closed;
        self.binding.release();
        with_timeout(self.socket_timeout, self.channel.cancel_blob(self.handle)).await?;
        debug!(target: "firebird_core::blob", "cancelled blob {:#x}", self.blob_id);
        Ok(())
    }
}
