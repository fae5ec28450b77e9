use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.blobscan.com/";

/// transaction used when none is given on the command line
pub const DEFAULT_TRANSACTION: &str =
    "0x353c6f31903147f8d490c28e556caafd7a9fad8b3bc4fd210ae800ee24749adb";

/// order in which blob descriptors are fetched and concatenated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobOrder {
    /// enumeration order of the transaction lookup response
    #[default]
    AsReturned,
    /// ascending `index`, stable for equal indices
    ByIndex,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// base of the `transactions/` and `blobs/` endpoints, must end with '/'
    pub api_base: Url,
    pub output_dir: PathBuf,
    /// `None` waits forever
    pub timeout: Option<Duration>,
    pub order: BlobOrder,
    /// also write every blob to its own `{tx}_{index}.blob` file
    pub write_parts: bool,
}

impl Config {
    pub fn new(api_base: &str) -> Result<Config> {
        Ok(Config {
            api_base: parse_api_base(api_base)?,
            output_dir: PathBuf::from("."),
            timeout: None,
            order: BlobOrder::default(),
            write_parts: false,
        })
    }
}

/// parses a base url, appending the trailing slash `Url::join` needs to keep the last segment
pub fn parse_api_base(raw: &str) -> Result<Url> {
    if raw.ends_with('/') {
        return Ok(Url::parse(raw)?);
    }

    Ok(Url::parse(format!("{}/", raw).as_str())?)
}
