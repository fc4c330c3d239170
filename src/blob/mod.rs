//! Segmented blob transfer.
//!
//! - [`LiveBlob`]: a blob open on the server, read or written segment by
//!   segment and closed when its transaction ends
//! - [`CachedBlob`]: read-only content held in memory
//! - [`BlobInputStream`] / [`BlobOutputStream`]: buffered streams over a
//!   live blob

pub mod cached;
pub mod channel;
pub mod live;
pub mod stream;

pub use cached::CachedBlob;
pub use channel::{
    pack_segments, unpack_segments, BlobChannel, BlobHandle, SeekMode, SegmentResponse,
    SegmentStatus,
};
pub use live::{BlobMode, LiveBlob};
pub use stream::{BlobInputStream, BlobOutputStream};
