use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};

use super::{AssembledBlobs, BlobBuffer, RetrieveError};

pub fn blob_file_path(dir: &Path, transaction: &str) -> PathBuf {
    dir.join(format!("{}.blob", transaction))
}

pub fn part_file_path(dir: &Path, transaction: &str, index: u64) -> PathBuf {
    dir.join(format!("{}_{}.blob", transaction, index))
}

/// decodes the buffer and writes it to `{transaction}.blob`, replacing any previous file
pub fn write_blob_file(
    dir: &Path,
    transaction: &str,
    buffer: &BlobBuffer,
) -> Result<PathBuf, RetrieveError> {
    let data = buffer.decode().map_err(RetrieveError::ErrDecode)?;
    let path = blob_file_path(dir, transaction);

    write(&path, &data)?;
    info!("Written {}", path.display());

    Ok(path)
}

/// decodes each blob for `{transaction}_{index}.blob`, rejecting indices that would share a file
pub(super) fn decode_parts(
    dir: &Path,
    transaction: &str,
    assembled: &AssembledBlobs,
) -> Result<Vec<(PathBuf, Vec<u8>)>, RetrieveError> {
    let mut seen = HashSet::new();
    let mut parts = Vec::with_capacity(assembled.descriptors.len());
    for (i, descriptor) in assembled.descriptors.iter().enumerate() {
        if !seen.insert(descriptor.index) {
            return Err(RetrieveError::ErrDuplicateIndex(descriptor.index));
        }

        let hex_part = assembled.buffer.part(i).unwrap_or_default();
        let data = hex::decode(hex_part).map_err(RetrieveError::ErrDecode)?;
        parts.push((part_file_path(dir, transaction, descriptor.index), data));
    }

    Ok(parts)
}

pub(super) fn write_parts(parts: Vec<(PathBuf, Vec<u8>)>) -> Result<(), RetrieveError> {
    for (path, data) in parts {
        write(&path, &data)?;
        info!("Written {}", path.display());
    }

    Ok(())
}

fn write(path: &Path, data: &[u8]) -> Result<(), RetrieveError> {
    debug!("writing {} bytes to {}", data.len(), path.display());
    fs::write(path, data).map_err(|source| RetrieveError::ErrWrite {
        path: path.to_path_buf(),
        source,
    })
}
