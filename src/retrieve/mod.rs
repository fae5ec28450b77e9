mod buffer;
mod output;

pub use buffer::{BlobBuffer, MissingMarkerError, HEX_MARKER};
pub use output::{blob_file_path, part_file_path, write_blob_file};

use std::{error::Error, fmt::Display, io, path::PathBuf};

use log::info;

use crate::{
    api::{ApiError, BlobDescriptor, BlobSource},
    config::{BlobOrder, Config},
};

#[derive(Debug)]
pub enum RetrieveError {
    /// indicates a transaction id that cannot name a file in the output directory
    ErrTransactionId(String),
    /// indicates the transaction lookup failed
    ErrLookup {
        transaction: String,
        source: ApiError,
    },
    /// indicates a blob body could not be fetched
    ErrFetch {
        index: u64,
        versioned_hash: String,
        source: ApiError,
    },
    /// indicates a blob payload without the hex marker
    ErrPayload {
        index: u64,
        versioned_hash: String,
    },
    /// indicates an index listed more than once, which would collide in part file names
    ErrDuplicateIndex(u64),
    /// indicates the accumulated hex could not be decoded
    ErrDecode(hex::FromHexError),
    /// indicates the output file could not be written
    ErrWrite { path: PathBuf, source: io::Error },
}

impl Error for RetrieveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetrieveError::ErrLookup { source, .. } => Some(source),
            RetrieveError::ErrFetch { source, .. } => Some(source),
            RetrieveError::ErrTransactionId(_) => None,
            RetrieveError::ErrPayload { .. } => None,
            RetrieveError::ErrDuplicateIndex(_) => None,
            RetrieveError::ErrDecode(err) => Some(err),
            RetrieveError::ErrWrite { source, .. } => Some(source),
        }
    }
}

impl Display for RetrieveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrieveError::ErrTransactionId(transaction) => {
                write!(f, "invalid transaction id: '{}'", transaction)
            }
            RetrieveError::ErrLookup { transaction, .. } => {
                write!(f, "failed to look up transaction {}", transaction)
            }
            RetrieveError::ErrFetch {
                index,
                versioned_hash,
                ..
            } => write!(
                f,
                "failed to fetch blob index={} {}",
                index, versioned_hash
            ),
            RetrieveError::ErrPayload {
                index,
                versioned_hash,
            } => write!(
                f,
                "blob index={} {} data is not prefixed with '{}'",
                index, versioned_hash, HEX_MARKER
            ),
            RetrieveError::ErrDuplicateIndex(index) => {
                write!(f, "blob index {} is listed more than once", index)
            }
            RetrieveError::ErrDecode(err) => write!(f, "invalid blob hex data: {}", err),
            RetrieveError::ErrWrite { path, .. } => {
                write!(f, "failed to write {}", path.display())
            }
        }
    }
}

/// blobs of a transaction, fetched and concatenated in fetch order
#[derive(Debug)]
pub struct AssembledBlobs {
    pub descriptors: Vec<BlobDescriptor>,
    pub buffer: BlobBuffer,
}

/// rejects ids that are empty or contain a path separator, since the id names the output file
pub fn validate_transaction(transaction: &str) -> Result<(), RetrieveError> {
    if transaction.is_empty() || transaction.contains(['/', '\\']) {
        return Err(RetrieveError::ErrTransactionId(transaction.to_string()));
    }

    Ok(())
}

/// looks up the blobs of `transaction` and appends each payload to a fresh buffer.
/// fetching is strictly sequential and stops at the first failure.
pub fn assemble<S: BlobSource>(
    source: &S,
    transaction: &str,
    order: BlobOrder,
) -> Result<AssembledBlobs, RetrieveError> {
    validate_transaction(transaction)?;

    let mut descriptors = source
        .blob_descriptors(transaction)
        .map_err(|source| RetrieveError::ErrLookup {
            transaction: transaction.to_string(),
            source,
        })?;

    info!("Transaction contains {} blobs", descriptors.len());

    if order == BlobOrder::ByIndex {
        descriptors.sort_by_key(|descriptor| descriptor.index);
    }

    let mut buffer = BlobBuffer::new();
    for descriptor in &descriptors {
        info!(
            "Retrieving blob index={} {}",
            descriptor.index, descriptor.versioned_hash
        );

        let data = source
            .blob_data(&descriptor.versioned_hash)
            .map_err(|source| RetrieveError::ErrFetch {
                index: descriptor.index,
                versioned_hash: descriptor.versioned_hash.clone(),
                source,
            })?;

        buffer
            .append(&data)
            .map_err(|_| RetrieveError::ErrPayload {
                index: descriptor.index,
                versioned_hash: descriptor.versioned_hash.clone(),
            })?;
    }

    Ok(AssembledBlobs {
        descriptors,
        buffer,
    })
}

/// fetches every blob of `transaction` and writes `{transaction}.blob` to the output directory.
/// nothing is written unless every blob was fetched and decoded.
pub fn retrieve<S: BlobSource>(
    source: &S,
    config: &Config,
    transaction: &str,
) -> Result<PathBuf, RetrieveError> {
    let assembled = assemble(source, transaction, config.order)?;

    let parts = if config.write_parts {
        output::decode_parts(&config.output_dir, transaction, &assembled)?
    } else {
        Vec::new()
    };

    let path = write_blob_file(&config.output_dir, transaction, &assembled.buffer)?;
    output::write_parts(parts)?;

    Ok(path)
}

#[cfg(test)]
mod test {
    use std::{cell::RefCell, collections::HashMap, fs};

    use super::*;

    struct FakeSource {
        blobs: Vec<BlobDescriptor>,
        data: HashMap<String, String>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn new(blobs: &[(u64, &str, &str)]) -> FakeSource {
            FakeSource {
                blobs: blobs
                    .iter()
                    .map(|(index, hash, _)| BlobDescriptor {
                        index: *index,
                        versioned_hash: hash.to_string(),
                    })
                    .collect(),
                data: blobs
                    .iter()
                    .map(|(_, hash, data)| (hash.to_string(), data.to_string()))
                    .collect(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl BlobSource for FakeSource {
        fn blob_descriptors(&self, transaction: &str) -> Result<Vec<BlobDescriptor>, ApiError> {
            self.calls.borrow_mut().push(format!("tx {}", transaction));
            Ok(self.blobs.clone())
        }

        fn blob_data(&self, versioned_hash: &str) -> Result<String, ApiError> {
            self.calls.borrow_mut().push(format!("blob {}", versioned_hash));
            self.data
                .get(versioned_hash)
                .cloned()
                .ok_or(ApiError::ErrStatus {
                    url: format!("blobs/{}", versioned_hash),
                    status: 404,
                })
        }
    }

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::new("http://localhost/").unwrap();
        config.output_dir = dir.to_path_buf();
        config
    }

    #[test]
    fn test_assemble_fetches_each_blob_in_order() {
        let source = FakeSource::new(&[(0, "0x01aa", "0x1234"), (1, "0x01bb", "0x5678")]);
        let assembled = assemble(&source, "0xABCD", BlobOrder::AsReturned).unwrap();

        assert_eq!(assembled.buffer.as_str(), "0x12345678");
        assert_eq!(
            *source.calls.borrow(),
            vec!["tx 0xABCD", "blob 0x01aa", "blob 0x01bb"]
        );
    }

    #[test]
    fn test_assemble_keeps_api_order() {
        let source = FakeSource::new(&[(1, "0x01bb", "0x5678"), (0, "0x01aa", "0x1234")]);
        let assembled = assemble(&source, "0xABCD", BlobOrder::AsReturned).unwrap();

        assert_eq!(assembled.buffer.as_str(), "0x56781234");
    }

    #[test]
    fn test_assemble_sorts_by_index() {
        let source = FakeSource::new(&[(1, "0x01bb", "0x5678"), (0, "0x01aa", "0x1234")]);
        let assembled = assemble(&source, "0xABCD", BlobOrder::ByIndex).unwrap();

        assert_eq!(assembled.buffer.as_str(), "0x12345678");
        assert_eq!(
            *source.calls.borrow(),
            vec!["tx 0xABCD", "blob 0x01aa", "blob 0x01bb"]
        );
    }

    #[test]
    fn test_assemble_stops_at_first_failure() {
        let mut source = FakeSource::new(&[
            (0, "0x01aa", "0x1234"),
            (1, "0x01bb", "0x5678"),
            (2, "0x01cc", "0x9abc"),
        ]);
        source.data.remove("0x01bb");

        let err = assemble(&source, "0xABCD", BlobOrder::AsReturned).unwrap_err();
        assert!(matches!(
            err,
            RetrieveError::ErrFetch { index: 1, ref versioned_hash, .. } if versioned_hash == "0x01bb"
        ));
        assert_eq!(
            *source.calls.borrow(),
            vec!["tx 0xABCD", "blob 0x01aa", "blob 0x01bb"]
        );
    }

    #[test]
    fn test_assemble_rejects_unmarked_payload() {
        let source = FakeSource::new(&[(0, "0x01aa", "1234")]);
        let err = assemble(&source, "0xABCD", BlobOrder::AsReturned).unwrap_err();
        assert!(matches!(err, RetrieveError::ErrPayload { index: 0, .. }));
    }

    #[test]
    fn test_retrieve_writes_concatenated_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(&[(0, "0x01aa", "0x1234"), (1, "0x01bb", "0x5678")]);

        let path = retrieve(&source, &config_in(dir.path()), "0xABCD").unwrap();

        assert_eq!(path, dir.path().join("0xABCD.blob"));
        assert_eq!(fs::read(path).unwrap(), vec![0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn test_retrieve_empty_transaction_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(&[]);

        let path = retrieve(&source, &config_in(dir.path()), "0xABCD").unwrap();

        assert_eq!(fs::read(path).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_retrieve_failure_leaves_existing_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("0xABCD.blob");
        fs::write(&existing, b"previous").unwrap();

        let mut source = FakeSource::new(&[(0, "0x01aa", "0x1234"), (1, "0x01bb", "0x5678")]);
        source.data.remove("0x01bb");

        assert!(retrieve(&source, &config_in(dir.path()), "0xABCD").is_err());
        assert_eq!(fs::read(existing).unwrap(), b"previous");
    }

    #[test]
    fn test_retrieve_invalid_hex_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(&[(0, "0x01aa", "0x12g4")]);

        let err = retrieve(&source, &config_in(dir.path()), "0xABCD").unwrap_err();

        assert!(matches!(err, RetrieveError::ErrDecode(_)));
        assert!(!dir.path().join("0xABCD.blob").exists());
    }

    #[test]
    fn test_retrieve_rejects_path_like_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let source = FakeSource::new(&[(0, "0x01aa", "0x1234")]);
        let escaping = outside.path().join("evil").display().to_string();

        for transaction in [escaping.as_str(), "../0xABCD", "0xAB\\CD", ""] {
            let err = retrieve(&source, &config_in(dir.path()), transaction).unwrap_err();
            assert!(matches!(err, RetrieveError::ErrTransactionId(_)));
        }

        assert!(source.calls.borrow().is_empty());
        assert!(fs::read_dir(outside.path()).unwrap().next().is_none());
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_retrieve_rejects_duplicate_part_index() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(&[(0, "0x01aa", "0x1234"), (0, "0x01bb", "0x5678")]);
        let mut config = config_in(dir.path());
        config.write_parts = true;

        let err = retrieve(&source, &config, "0xABCD").unwrap_err();

        assert!(matches!(err, RetrieveError::ErrDuplicateIndex(0)));
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_retrieve_duplicate_index_without_parts() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(&[(0, "0x01aa", "0x1234"), (0, "0x01bb", "0x5678")]);

        let path = retrieve(&source, &config_in(dir.path()), "0xABCD").unwrap();
        assert_eq!(fs::read(path).unwrap(), vec![0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn test_retrieve_writes_parts() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(&[(0, "0x01aa", "0x1234"), (1, "0x01bb", "0x5678")]);
        let mut config = config_in(dir.path());
        config.write_parts = true;

        retrieve(&source, &config, "0xABCD").unwrap();

        assert_eq!(
            fs::read(dir.path().join("0xABCD_0.blob")).unwrap(),
            vec![0x12, 0x34]
        );
        assert_eq!(
            fs::read(dir.path().join("0xABCD_1.blob")).unwrap(),
            vec![0x56, 0x78]
        );
        assert_eq!(
            fs::read(dir.path().join("0xABCD.blob")).unwrap(),
            vec![0x12, 0x34, 0x56, 0x78]
        );
    }
}
