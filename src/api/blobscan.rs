use log::debug;
use reqwest::blocking;
use url::Url;

use super::{parse_blob_data, parse_blob_descriptors, ApiError, BlobDescriptor, BlobSource};
use crate::config::Config;

/// blocking client for the Blobscan REST API
pub struct BlobscanClient {
    client: blocking::Client,
    base: Url,
}

impl BlobscanClient {
    pub fn new(config: &Config) -> Result<BlobscanClient, ApiError> {
        // reqwest defaults to a 30s timeout, an unset timeout must be passed explicitly
        let client = blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::ErrTransport)?;

        Ok(BlobscanClient {
            client,
            base: config.api_base.clone(),
        })
    }

    pub fn transaction_url(&self, transaction: &str) -> Result<Url, ApiError> {
        self.endpoint_url("transactions", transaction)
    }

    pub fn blob_url(&self, versioned_hash: &str) -> Result<Url, ApiError> {
        self.endpoint_url("blobs", versioned_hash)
    }

    /// appends `collection/key` to the base, percent-encoding the key as a single segment
    fn endpoint_url(&self, collection: &str, key: &str) -> Result<Url, ApiError> {
        let mut endpoint = self.base.clone();
        endpoint
            .path_segments_mut()
            .map_err(|_| ApiError::ErrUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(collection)
            .push(key);

        Ok(endpoint)
    }

    fn get(&self, url: Url) -> Result<String, ApiError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(ApiError::ErrTransport)?;

        if !response.status().is_success() {
            return Err(ApiError::ErrStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().map_err(ApiError::ErrTransport)?;
        debug!("received {} bytes from {}", body.len(), url);

        Ok(body)
    }
}

impl BlobSource for BlobscanClient {
    fn blob_descriptors(&self, transaction: &str) -> Result<Vec<BlobDescriptor>, ApiError> {
        let body = self.get(self.transaction_url(transaction)?)?;
        parse_blob_descriptors(&body)
    }

    fn blob_data(&self, versioned_hash: &str) -> Result<String, ApiError> {
        let body = self.get(self.blob_url(versioned_hash)?)?;
        parse_blob_data(&body)
    }
}
