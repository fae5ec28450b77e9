use flate2::read::ZlibDecoder;
use std::io::Read;

use super::DecodeError;

/// inflates a zlib compressed channel
pub fn decompress<R: Read>(data: R) -> Result<Vec<u8>, DecodeError> {
    let mut decompressed = ZlibDecoder::new(data);
    let mut ret = Vec::new();
    decompressed
        .read_to_end(&mut ret)
        .map_err(DecodeError::ErrDecompress)?;

    Ok(ret)
}
