//! Info request/response handling for blob info items.
//!
//! An info response is a sequence of `[item][u16 LE length][value]` clumps
//! terminated by `isc_info_end`. Values are little-endian integers.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::buffer::ReadBuffer;
use crate::protocol::constants::*;

/// Info items requested to learn a blob's length.
pub const BLOB_LENGTH_ITEMS: &[u8] = &[ISC_INFO_BLOB_TOTAL_LENGTH, ISC_INFO_END];

/// Info items requested for a full blob description.
pub const BLOB_INFO_ITEMS: &[u8] = &[
    ISC_INFO_BLOB_NUM_SEGMENTS,
    ISC_INFO_BLOB_MAX_SEGMENT,
    ISC_INFO_BLOB_TOTAL_LENGTH,
    ISC_INFO_BLOB_TYPE,
    ISC_INFO_END,
];

/// Parsed blob info response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobInfo {
    pub num_segments: Option<i64>,
    pub max_segment: Option<i64>,
    pub total_length: Option<i64>,
    /// 0 for segmented blobs, 1 for stream blobs.
    pub blob_type: Option<i64>,
}

impl BlobInfo {
    /// Parse an info response.
    ///
    /// Unknown items are skipped. A truncated response (`isc_info_truncated`)
    /// is a protocol error.
    pub fn parse(data: Bytes) -> Result<Self> {
        let mut info = BlobInfo::default();
        let mut buf = ReadBuffer::new(data);
        while buf.remaining() > 0 {
            let item = buf.read_u8()?;
            match item {
                ISC_INFO_END => break,
                ISC_INFO_TRUNCATED => {
                    return Err(Error::protocol("Blob info response truncated"));
                }
                ISC_INFO_ERROR => {
                    return Err(Error::protocol("Server reported an error in blob info response"));
                }
                _ => {}
            }
            let len = buf.read_u16_le()? as usize;
            let value = buf.read_vax_integer(len.min(8))?;
            if len > 8 {
                buf.skip(len - 8)?;
            }
            match item {
                ISC_INFO_BLOB_NUM_SEGMENTS => info.num_segments = Some(value),
                ISC_INFO_BLOB_MAX_SEGMENT => info.max_segment = Some(value),
                ISC_INFO_BLOB_TOTAL_LENGTH => info.total_length = Some(value),
                ISC_INFO_BLOB_TYPE => info.blob_type = Some(value),
                _ => {}
            }
        }
        Ok(info)
    }

    /// Total length, failing if the server omitted it.
    pub fn require_total_length(&self) -> Result<u64> {
        match self.total_length {
            Some(len) if len >= 0 => Ok(len as u64),
            _ => Err(Error::protocol(
                "Blob info response did not contain isc_info_blob_total_length",
            )),
        }
    }
}

/// Encode a blob info response; the inverse of [`BlobInfo::parse`].
pub fn encode_blob_info(info: &BlobInfo) -> Bytes {
    let mut buf = crate::protocol::buffer::WriteBuffer::new();
    let items = [
        (ISC_INFO_BLOB_NUM_SEGMENTS, info.num_segments),
        (ISC_INFO_BLOB_MAX_SEGMENT, info.max_segment),
        (ISC_INFO_BLOB_TOTAL_LENGTH, info.total_length),
        (ISC_INFO_BLOB_TYPE, info.blob_type),
    ];
    for (item, value) in items {
        if let Some(v) = value {
            buf.write_u8(item);
            buf.write_u16_le(4);
            buf.write_i32_le(v as i32);
        }
    }
    buf.write_u8(ISC_INFO_END);
    buf.freeze()
}
