//! Read-only blob held entirely in memory.

use bytes::Bytes;
use futures::stream::{self, Stream};

use crate::error::{Error, Result};
use crate::protocol::constants::*;

use super::channel::BlobChannel;
use super::live::LiveBlob;

/// Upper bound for the buffer reserved from the server-reported length.
const MAX_INITIAL_CAPACITY: usize = 64 * DEFAULT_BLOB_BUFFER_SIZE;

fn initial_capacity(reported_length: u64) -> usize {
    usize::try_from(reported_length)
        .unwrap_or(usize::MAX)
        .min(MAX_INITIAL_CAPACITY)
}

/// Blob content fetched once and detached from the transaction.
///
/// Unlike [`LiveBlob`] it stays readable after the transaction ends and
/// offers random access and pattern search, but cannot be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBlob {
    blob_id: Option<u64>,
    data: Bytes,
}

impl CachedBlob {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            blob_id: None,
            data: data.into(),
        }
    }

    /// Read a live input blob to the end and cache its content.
    pub async fn load<C: BlobChannel + Send>(blob: &mut LiveBlob<'_, C>) -> Result<Self> {
        let length = blob.length().await?;
        let mut data = Vec::with_capacity(initial_capacity(length));
        loop {
            let segment = blob.get_segment(MAX_BLOB_SEGMENT_SIZE).await?;
            if segment.is_empty() {
                break;
            }
            data.extend_from_slice(&segment);
        }
        Ok(Self {
            blob_id: Some(blob.blob_id()),
            data: data.into(),
        })
    }

    /// Id of the server blob the content came from.
    pub fn blob_id(&self) -> Option<u64> {
        self.blob_id
    }

    pub fn length(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Up to `length` bytes starting at the 0-based `offset`.
    pub fn get_bytes(&self, offset: u64, length: usize) -> Result<Bytes> {
        let start = usize::try_from(offset)
            .ok()
            .filter(|s| *s <= self.data.len())
            .ok_or_else(|| {
                Error::usage(
                    JB_INVALID_BLOB_OFFSET,
                    format!("Offset {} beyond blob length {}", offset, self.data.len()),
                )
            })?;
        let end = start.saturating_add(length).min(self.data.len());
        Ok(self.data.slice(start..end))
    }

    /// 0-based offset of the first occurrence of `pattern` at or after
    /// `start`.
    pub fn position(&self, pattern: &[u8], start: u64) -> Option<u64> {
        let start = usize::try_from(start).ok()?;
        if pattern.is_empty() {
            return (start <= self.data.len()).then_some(start as u64);
        }
        self.data
            .get(start..)?
            .windows(pattern.len())
            .position(|w| w == pattern)
            .map(|p| (start + p) as u64)
    }

    /// Content as a stream of segments of at most `segment_size` bytes.
    pub fn into_stream(self, segment_size: usize) -> impl Stream<Item = Result<Bytes>> {
        let segment_size = segment_size.clamp(1, MAX_BLOB_SEGMENT_SIZE);
        stream::unfold(self.data, move |mut rest| async move {
            if rest.is_empty() {
                return None;
            }
            let segment = rest.split_to(segment_size.min(rest.len()));
            Some((Ok(segment), rest))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::channel::mock::MemoryChannel;
    use crate::transaction::TransactionRegistry;
    use futures::TryStreamExt;

    #[test]
    fn test_get_bytes_and_position() {
        let blob = CachedBlob::new(&b"hello blob world"[..]);
        assert_eq!(blob.length(), 16);
        assert_eq!(&blob.get_bytes(6, 4).unwrap()[..], b"blob");
        assert_eq!(&blob.get_bytes(12, 100).unwrap()[..], b"orld");
        assert!(blob.get_bytes(17, 1).is_err());
        assert_eq!(blob.position(b"o", 0), Some(4));
        assert_eq!(blob.position(b"o", 5), Some(9));
        assert_eq!(blob.position(b"xyz", 0), None);
        assert_eq!(blob.position(b"", 3), Some(3));
    }

    #[tokio::test]
    async fn test_load_survives_transaction_end() {
        let registry = TransactionRegistry::new();
        registry.begin().unwrap();
        let data: Vec<u8> = (0..50_000u32).map(|i| (i * 7) as u8).collect();
        let mut channel = MemoryChannel::with_blob(9, data.clone());
        let mut live = LiveBlob::open(&mut channel, &registry, 9, None).await.unwrap();
        let cached = CachedBlob::load(&mut live).await.unwrap();
        registry.commit();
        assert!(!live.is_open());
        assert_eq!(cached.blob_id(), Some(9));
        assert_eq!(cached.as_bytes(), &Bytes::from(data));
    }

    #[tokio::test]
    async fn test_load_ignores_inflated_length() {
        let registry = TransactionRegistry::new();
        registry.begin().unwrap();
        let mut channel = MemoryChannel::with_blob(4, b"tiny".to_vec());
        channel.reported_length = Some(i32::MAX as i64);
        let mut live = LiveBlob::open(&mut channel, &registry, 4, None).await.unwrap();
        let cached = CachedBlob::load(&mut live).await.unwrap();
        assert_eq!(&cached.as_bytes()[..], b"tiny");

        assert_eq!(initial_capacity(u64::MAX), MAX_INITIAL_CAPACITY);
        assert_eq!(initial_capacity(10), 10);
    }

    #[tokio::test]
    async fn test_into_stream() {
        let blob = CachedBlob::new(vec![1u8; 10]);
        let segments: Vec<Bytes> = blob.into_stream(4).try_collect().await.unwrap();
        assert_eq!(segments.iter().map(|s| s.len()).collect::<Vec<_>>(), vec![4, 4, 2]);
    }
}
