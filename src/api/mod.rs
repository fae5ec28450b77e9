mod blobscan;

pub use blobscan::BlobscanClient;

use std::{error::Error, fmt::Display};

use serde::Deserialize;
use serde_json::Value;

/// a blob referenced by a transaction, as listed by the transaction lookup
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlobDescriptor {
    pub index: u64,
    #[serde(rename = "versionedHash")]
    pub versioned_hash: String,
}

/// source of transaction metadata and blob bodies
pub trait BlobSource {
    /// lists the blobs of a transaction, in the order the source enumerates them
    fn blob_descriptors(&self, transaction: &str) -> Result<Vec<BlobDescriptor>, ApiError>;

    /// returns the `0x` prefixed hex payload of a blob
    fn blob_data(&self, versioned_hash: &str) -> Result<String, ApiError>;
}

#[derive(Debug)]
pub enum ApiError {
    /// indicates an endpoint url could not be built
    ErrUrl(url::ParseError),
    /// indicates a connection, dns or timeout failure
    ErrTransport(reqwest::Error),
    /// indicates a non-2xx response
    ErrStatus { url: String, status: u16 },
    /// indicates a body that is not JSON
    ErrJson(serde_json::Error),
    /// indicates a missing key in the response body
    ErrMissingField(&'static str),
    /// indicates a key with an unexpected shape
    ErrInvalidField { field: &'static str, reason: String },
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApiError::ErrUrl(err) => Some(err),
            ApiError::ErrTransport(err) => Some(err),
            ApiError::ErrJson(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::ErrUrl(err) => write!(f, "invalid endpoint url: {}", err),
            ApiError::ErrTransport(err) => write!(f, "request failed: {}", err),
            ApiError::ErrStatus { url, status } => {
                write!(f, "unexpected status {} from {}", status, url)
            }
            ApiError::ErrJson(err) => write!(f, "malformed JSON response: {}", err),
            ApiError::ErrMissingField(field) => write!(f, "missing field '{}'", field),
            ApiError::ErrInvalidField { field, reason } => {
                write!(f, "invalid field '{}': {}", field, reason)
            }
        }
    }
}

/// extracts the `blobs` array from a transaction response body
pub fn parse_blob_descriptors(body: &str) -> Result<Vec<BlobDescriptor>, ApiError> {
    let mut response: Value = serde_json::from_str(body).map_err(ApiError::ErrJson)?;
    let blobs = response
        .get_mut("blobs")
        .ok_or(ApiError::ErrMissingField("blobs"))?
        .take();

    serde_json::from_value(blobs).map_err(|err| ApiError::ErrInvalidField {
        field: "blobs",
        reason: err.to_string(),
    })
}

/// extracts the `data` string from a blob response body
pub fn parse_blob_data(body: &str) -> Result<String, ApiError> {
    let response: Value = serde_json::from_str(body).map_err(ApiError::ErrJson)?;
    let data = response
        .get("data")
        .ok_or(ApiError::ErrMissingField("data"))?;

    data.as_str()
        .map(String::from)
        .ok_or_else(|| ApiError::ErrInvalidField {
            field: "data",
            reason: format!("expected a string, found {}", data),
        })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_blob_descriptors() {
        let body = r#"{
            "hash": "0xabcd",
            "blobs": [
                {"index": 0, "versionedHash": "0x01aa", "size": 131072},
                {"index": 1, "versionedHash": "0x01bb"}
            ]
        }"#;

        let blobs = parse_blob_descriptors(body).unwrap();
        assert_eq!(
            blobs,
            vec![
                BlobDescriptor {
                    index: 0,
                    versioned_hash: String::from("0x01aa")
                },
                BlobDescriptor {
                    index: 1,
                    versioned_hash: String::from("0x01bb")
                },
            ]
        );
    }

    #[test]
    fn test_parse_blob_descriptors_keeps_response_order() {
        let body = r#"{"blobs": [
            {"index": 2, "versionedHash": "0x03"},
            {"index": 0, "versionedHash": "0x01"}
        ]}"#;

        let blobs = parse_blob_descriptors(body).unwrap();
        let indices: Vec<u64> = blobs.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![2, 0]);
    }

    #[test]
    fn test_parse_blob_descriptors_empty() {
        let blobs = parse_blob_descriptors(r#"{"blobs": []}"#).unwrap();
        assert!(blobs.is_empty());
    }

    #[test]
    fn test_parse_blob_descriptors_missing_blobs() {
        let err = parse_blob_descriptors(r#"{"hash": "0xabcd"}"#).unwrap_err();
        assert!(matches!(err, ApiError::ErrMissingField("blobs")));
    }

    #[test]
    fn test_parse_blob_descriptors_missing_hash() {
        let err = parse_blob_descriptors(r#"{"blobs": [{"index": 0}]}"#).unwrap_err();
        assert!(matches!(err, ApiError::ErrInvalidField { field: "blobs", .. }));
    }

    #[test]
    fn test_parse_blob_descriptors_not_json() {
        let err = parse_blob_descriptors("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, ApiError::ErrJson(_)));
    }

    #[test]
    fn test_parse_blob_data() {
        let data = parse_blob_data(r#"{"versionedHash": "0x01aa", "data": "0x1234"}"#).unwrap();
        assert_eq!(data, "0x1234");
    }

    #[test]
    fn test_parse_blob_data_errors() {
        let err = parse_blob_data(r#"{"versionedHash": "0x01aa"}"#).unwrap_err();
        assert!(matches!(err, ApiError::ErrMissingField("data")));

        let err = parse_blob_data(r#"{"data": 12}"#).unwrap_err();
        assert!(matches!(err, ApiError::ErrInvalidField { field: "data", .. }));
    }
}
