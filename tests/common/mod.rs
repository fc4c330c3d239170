//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use firebird_core_rs::blob::{pack_segments, BlobChannel, BlobHandle, SeekMode, SegmentResponse, SegmentStatus};
use firebird_core_rs::protocol::constants::*;
use firebird_core_rs::protocol::info::{encode_blob_info, BlobInfo};
use firebird_core_rs::statement::StatementExecutor;
use firebird_core_rs::{Error, Result, TransactionRegistry};

/// Install a test subscriber once; `RUST_LOG` controls the output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Registry with a started transaction.
pub fn active_registry() -> TransactionRegistry {
    let registry = TransactionRegistry::new();
    registry.begin().expect("begin transaction");
    registry
}

/// Counted calls against a [`FakeServer`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub open: usize,
    pub create: usize,
    pub get_segment: usize,
    pub put_segment: usize,
    pub info: usize,
    pub close: usize,
}

/// Blob channel backed by a map of blob ids to content.
#[derive(Debug, Default)]
pub struct FakeServer {
    blobs: HashMap<u64, Vec<u8>>,
    open: HashMap<BlobHandle, (u64, usize)>,
    next_handle: BlobHandle,
    next_blob_id: u64,
    pub calls: CallCounts,
    /// Delay applied to every get-segment round trip.
    pub delay: Option<Duration>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            next_blob_id: 0x1_0000,
            ..Default::default()
        }
    }

    pub fn with_blob(mut self, blob_id: u64, data: Vec<u8>) -> Self {
        self.blobs.insert(blob_id, data);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn blob(&self, blob_id: u64) -> Option<&[u8]> {
        self.blobs.get(&blob_id).map(|b| b.as_slice())
    }

    fn handle(&mut self, handle: BlobHandle) -> Result<&mut (u64, usize)> {
        self.open
            .get_mut(&handle)
            .ok_or_else(|| Error::server(ISC_BAD_SEGSTR_HANDLE, "invalid BLOB handle"))
    }
}

impl BlobChannel for FakeServer {
    async fn open_blob(&mut self, _transaction_id: u64, blob_id: u64) -> Result<BlobHandle> {
        self.calls.open += 1;
        if !self.blobs.contains_key(&blob_id) {
            return Err(Error::server(ISC_BAD_SEGSTR_ID, "invalid BLOB ID"));
        }
        self.next_handle += 1;
        self.open.insert(self.next_handle, (blob_id, 0));
        Ok(self.next_handle)
    }

    async fn create_blob(&mut self, _transaction_id: u64) -> Result<(BlobHandle, u64)> {
        self.calls.create += 1;
        self.next_blob_id += 1;
        self.blobs.insert(self.next_blob_id, Vec::new());
        self.next_handle += 1;
        self.open.insert(self.next_handle, (self.next_blob_id, 0));
        Ok((self.next_handle, self.next_blob_id))
    }

    async fn get_segment(&mut self, handle: BlobHandle, buffer_length: usize) -> Result<SegmentResponse> {
        self.calls.get_segment += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let (blob_id, position) = *self.handle(handle)?;
        let data = &self.blobs[&blob_id];
        let end = (position + buffer_length.saturating_sub(2)).min(data.len());
        let chunk = data[position..end].to_vec();
        self.handle(handle)?.1 = end;
        let status = if chunk.is_empty() {
            SegmentStatus::EndOfBlob
        } else {
            SegmentStatus::Complete
        };
        Ok(SegmentResponse {
            status,
            data: pack_segments(&chunk),
        })
    }

    async fn put_segment(&mut self, handle: BlobHandle, data: &[u8]) -> Result<()> {
        self.calls.put_segment += 1;
        if data.len() > MAX_BLOB_SEGMENT_SIZE {
            return Err(Error::protocol("segment too long"));
        }
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
        self.calls.info += 1;
        let (blob_id, _) = *self.handle(handle)?;
        Ok(encode_blob_info(&BlobInfo {
            total_length: Some(self.blobs[&blob_id].len() as i64),
            ..Default::default()
        }))
    }

    async fn close_blob(&mut self, handle: BlobHandle) -> Result<()> {
        self.calls.close += 1;
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

/// Executor that records statements and fails on those containing `FAIL`.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    pub executed: Vec<String>,
}

impl StatementExecutor for RecordingExecutor {
    async fn execute_update(&mut self, sql: &str) -> Result<i64> {
        self.executed.push(sql.to_string());
        if sql.contains("FAIL") {
            return Err(Error::server(ISC_LOCK_CONFLICT, "lock conflict on no wait transaction"));
        }
        Ok(1)
    }
}
