//! Decoding of OP stack batcher data carried in blobs.
//!
//! blobs -> frames -> channel -> zlib -> RLP string -> span batch

mod blob;
mod compress;
mod frame;
mod rlp;
mod span_batch;

pub use blob::{decode_blob, decode_blobs, BLOB_SIZE, MAX_BLOB_DATA_SIZE};
pub use frame::{assemble_channel, parse_frames, Frame};
pub use span_batch::{parse_span_batch, SpanBatchSummary};

use std::{error::Error, fmt::Display, fs, io, path::Path};

use bytes::Bytes;
use log::debug;

#[derive(Debug)]
pub enum DecodeError {
    /// indicates input that is not a whole number of blobs
    ErrBlobSize(usize),
    /// indicates an unknown blob encoding version
    ErrBlobVersion(u8),
    /// indicates a declared payload length larger than a blob can hold
    ErrBlobLength(usize),
    /// indicates a field element with one of its two top bits set, by round
    ErrFieldElement(usize),
    /// indicates an unknown derivation version
    ErrDerivationVersion(u8),
    /// indicates an is_last flag other than 0 or 1
    ErrFrameFlag(u8),
    /// indicates input that ends inside the named field
    ErrTruncated(&'static str),
    ErrDecompress(io::Error),
    ErrRlp(&'static str),
    /// indicates a batch that is not a span batch
    ErrBatchType(u8),
    ErrUvarint(&'static str),
    ErrSpanBatch(&'static str),
    ErrRead(io::Error),
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DecodeError::ErrDecompress(err) | DecodeError::ErrRead(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ErrBlobSize(size) => {
                write!(f, "{} bytes is not a multiple of the blob size {}", size, BLOB_SIZE)
            }
            Self::ErrBlobVersion(version) => write!(f, "invalid blob encoding version: {}", version),
            Self::ErrBlobLength(length) => write!(
                f,
                "declared blob data length {} exceeds {}",
                length, MAX_BLOB_DATA_SIZE
            ),
            Self::ErrFieldElement(round) => write!(f, "invalid field element in round {}", round),
            Self::ErrDerivationVersion(version) => {
                write!(f, "invalid derivation version: {}", version)
            }
            Self::ErrFrameFlag(flag) => write!(f, "invalid frame is_last flag: {}", flag),
            Self::ErrTruncated(field) => write!(f, "unexpected end of data reading {}", field),
            Self::ErrDecompress(err) => write!(f, "failed to decompress channel: {}", err),
            Self::ErrRlp(err) => write!(f, "invalid rlp: {}", err),
            Self::ErrBatchType(batch_type) => {
                write!(f, "batch type {} is not a span batch", batch_type)
            }
            Self::ErrUvarint(field) => write!(f, "invalid uvarint for {}", field),
            Self::ErrSpanBatch(err) => write!(f, "invalid span batch: {}", err),
            Self::ErrRead(err) => write!(f, "failed to read blob file: {}", err),
        }
    }
}

/// decodes concatenated blobs into the span batch their channel carries
pub fn decode_batcher_data(data: &[u8]) -> Result<SpanBatchSummary, DecodeError> {
    let payloads = decode_blobs(data)?;
    if payloads.is_empty() {
        return Err(DecodeError::ErrTruncated("blob"));
    }

    let mut frames = Vec::new();
    for payload in payloads {
        frames.extend(parse_frames(Bytes::from(payload))?);
    }
    debug!("read {} frames", frames.len());

    let channel = assemble_channel(&frames);
    let decompressed = compress::decompress(channel.as_slice())?;
    debug!(
        "channel of {} bytes inflated to {} bytes",
        channel.len(),
        decompressed.len()
    );

    let (batch, _) = rlp::decode_string(&decompressed)?;
    parse_span_batch(batch)
}

/// reads a `.blob` file and decodes it
pub fn decode_file(path: &Path) -> Result<SpanBatchSummary, DecodeError> {
    let data = fs::read(path).map_err(DecodeError::ErrRead)?;
    decode_batcher_data(&data)
}
