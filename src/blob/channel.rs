//! Transport seam for blob operations.
//!
//! A [`BlobChannel`] performs the blob round trips on the wire (open,
//! create, segment transfer, seek, info, close). The live blob state
//! machine sits on top of it and never touches a socket itself.

use std::future::Future;
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::buffer::{ReadBuffer, WriteBuffer};
use crate::protocol::constants::*;

/// Server-side handle of an open blob.
pub type BlobHandle = u32;

/// Outcome of a get-segment round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    /// Returned data ends on a segment boundary.
    Complete,
    /// The last segment did not fit in the buffer; more of it follows.
    Partial,
    /// No data is left in the blob.
    EndOfBlob,
}

/// Get-segment response: status plus packed `[u16 LE length][data]`
/// segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentResponse {
    pub status: SegmentStatus,
    pub data: Bytes,
}

/// Seek origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    Absolute,
    Relative,
    FromTail,
}

impl SeekMode {
    pub fn code(&self) -> i32 {
        match self {
            SeekMode::Absolute => BLOB_SEEK_ABSOLUTE,
            SeekMode::Relative => BLOB_SEEK_RELATIVE,
            SeekMode::FromTail => BLOB_SEEK_FROM_TAIL,
        }
    }
}

/// Blob round trips against a server connection.
///
/// Implementations translate server failures into [`Error::Server`] with
/// the ISC code the server reported.
pub trait BlobChannel {
    /// Open an existing blob for reading.
    fn open_blob(
        &mut self,
        transaction_id: u64,
        blob_id: u64,
    ) -> impl Future<Output = Result<BlobHandle>> + Send;

    /// Create a new blob for writing, returning its handle and id.
    fn create_blob(
        &mut self,
        transaction_id: u64,
    ) -> impl Future<Output = Result<(BlobHandle, u64)>> + Send;

    /// Fetch packed segments totalling at most `buffer_length` bytes.
    fn get_segment(
        &mut self,
        handle: BlobHandle,
        buffer_length: usize,
    ) -> impl Future<Output = Result<SegmentResponse>> + Send;

    /// Write one segment of at most [`MAX_BLOB_SEGMENT_SIZE`] bytes.
    fn put_segment(
        &mut self,
        handle: BlobHandle,
        data: &[u8],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Seek, returning the new absolute position.
    fn seek(
        &mut self,
        handle: BlobHandle,
        mode: SeekMode,
        offset: i32,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Raw info response for `items`.
    fn info(
        &mut self,
        handle: BlobHandle,
        items: &[u8],
    ) -> impl Future<Output = Result<Bytes>> + Send;

    fn close_blob(&mut self, handle: BlobHandle) -> impl Future<Output = Result<()>> + Send;

    /// Discard a blob being created.
    fn cancel_blob(&mut self, handle: BlobHandle) -> impl Future<Output = Result<()>> + Send;
}

/// Concatenate the payload of packed segments.
pub fn unpack_segments(data: Bytes) -> Result<Bytes> {
    let mut buf = ReadBuffer::new(data);
    let mut out = BytesMut::with_capacity(buf.remaining());
    while buf.remaining() > 0 {
        let segment = buf.read_segment()?;
        out.extend_from_slice(&segment);
    }
    Ok(out.freeze())
}

/// Pack `data` as `[u16 LE length][data]` segments of at most
/// [`MAX_BLOB_SEGMENT_SIZE`] bytes.
pub fn pack_segments(data: &[u8]) -> Bytes {
    let mut buf = WriteBuffer::with_capacity(data.len() + 2 * (data.len() / MAX_BLOB_SEGMENT_SIZE + 1));
    for chunk in data.chunks(MAX_BLOB_SEGMENT_SIZE) {
        buf.write_segment(chunk);
    }
    buf.freeze()
}

/// Bound a transport call by the socket timeout, if one is configured.
pub(crate) async fn with_timeout<T>(
    timeout: Option<Duration>,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| Error::SocketTimeout { timeout })?,
        None => call.await,
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory channel for unit tests.

    use std::collections::HashMap;

    use super::*;
    use crate::protocol::info::{encode_blob_info, BlobInfo};

    #[derive(Debug, Default)]
    pub struct MemoryChannel {
        pub blobs: HashMap<u64, Vec<u8>>,
        open: HashMap<BlobHandle, (u64, usize)>,
        next_handle: BlobHandle,
        pub info_calls: usize,
        pub put_calls: usize,
        pub delay: Option<Duration>,
        /// Length reported by `info` instead of the stored length.
        pub reported_length: Option<i64>,
    }

    impl MemoryChannel {
        pub fn with_blob(blob_id: u64, data: Vec<u8>) -> Self {
            let mut channel = Self::default();
            channel.blobs.insert(blob_id, data);
            channel
        }

        fn handle(&mut self, handle: BlobHandle) -> Result<&mut (u64, usize)> {
            self.open
                .get_mut(&handle)
                .ok_or_else(|| Error::server(ISC_BAD_SEGSTR_HANDLE, "invalid BLOB handle"))
        }
    }

    impl BlobChannel for MemoryChannel {
        async fn open_blob(&mut self, _transaction_id: u64, blob_id: u64) -> Result<BlobHandle> {
            if !self.blobs.contains_key(&blob_id) {
                return Err(Error::server(ISC_BAD_SEGSTR_ID, "invalid BLOB ID"));
            }
            self.next_handle += 1;
            self.open.insert(self.next_handle, (blob_id, 0));
            Ok(self.next_handle)
        }

        async fn create_blob(&mut self, _transaction_id: u64) -> Result<(BlobHandle, u64)> {
            let blob_id = self.blobs.len() as u64 + 1000;
            self.blobs.insert(blob_id, Vec::new());
            self.next_handle += 1;
            self.open.insert(self.next_handle, (blob_id, 0));
            Ok((self.next_handle, blob_id))
        }

        async fn get_segment(
            &mut self,
            handle: BlobHandle,
            buffer_length: usize,
        ) -> Result<SegmentResponse> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let (blob_id, position) = *self.handle(handle)?;
            let data = &self.blobs[&blob_id];
            let end = (position + buffer_length.saturating_sub(2)).min(data.len());
            let chunk = data[position..end].to_vec();
            self.handle(handle)?.1 = end;
            Ok(SegmentResponse {
                status: if chunk.is_empty() {
                    SegmentStatus::EndOfBlob
                } else {
                    SegmentStatus::Complete
                },
                data: pack_segments(&chunk),
            })
        }

        async fn put_segment(&mut self, handle: BlobHandle, data: &[u8]) -> Result<()> {
            self.put_calls += 1;
            let (blob_id, _) = *self.handle(handle)?;
            if let Some(blob) = self.blobs.get_mut(&blob_id) {
                blob.extend_from_slice(data);
            }
            Ok(())
        }

        async fn seek(&mut self, handle: BlobHandle, mode: SeekMode, offset: i32) -> Result<u64> {
            let (blob_id, position) = *self.handle(handle)?;
            let len = self.blobs[&blob_id].len() as i64;
            let base = match mode {
                SeekMode::Absolute => 0,
                SeekMode::Relative => position as i64,
                SeekMode::FromTail => len,
            };
            let target = (base + offset as i64).clamp(0, len) as usize;
            self.handle(handle)?.1 = target;
            Ok(target as u64)
        }

        async fn info(&mut self, handle: BlobHandle, _items: &[u8]) -> Result<Bytes> {
            self.info_calls += 1;
            let (blob_id, _) = *self.handle(handle)?;
            Ok(encode_blob_info(&BlobInfo {
                total_length: Some(
                    self.reported_length
                        .unwrap_or(self.blobs[&blob_id].len() as i64),
                ),
                ..Default::default()
            }))
        }

        async fn close_blob(&mut self, handle: BlobHandle) -> Result<()> {
            self.open.remove(&handle);
            Ok(())
        }

        async fn cancel_blob(&mut self, handle: BlobHandle) -> Result<()> {
            if let Some((blob_id, _)) = self.open.remove(&handle) {
                self.blobs.remove(&blob_id);
            }
            Ok(())
        }
    }
}
