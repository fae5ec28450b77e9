use std::{error::Error, fmt::Display, ops::Range};

pub const HEX_MARKER: &str = "0x";

#[derive(Debug, PartialEq, Eq)]
pub struct MissingMarkerError;

impl Error for MissingMarkerError {}

impl Display for MissingMarkerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "payload is not prefixed with '{}'", HEX_MARKER)
    }
}

/// hex text of every fetched blob, concatenated behind a single `0x` marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobBuffer {
    hex: String,
    parts: Vec<Range<usize>>,
}

impl BlobBuffer {
    pub fn new() -> BlobBuffer {
        BlobBuffer {
            hex: String::from(HEX_MARKER),
            parts: Vec::new(),
        }
    }

    /// strips the marker off `data` and appends the rest
    pub fn append(&mut self, data: &str) -> Result<(), MissingMarkerError> {
        let payload = data.strip_prefix(HEX_MARKER).ok_or(MissingMarkerError)?;

        let start = self.hex.len();
        self.hex.push_str(payload);
        self.parts.push(start..self.hex.len());

        Ok(())
    }

    /// the buffer including its leading marker
    pub fn as_str(&self) -> &str {
        &self.hex
    }

    /// the concatenated hex text without the marker
    pub fn payload(&self) -> &str {
        &self.hex[HEX_MARKER.len()..]
    }

    /// hex text contributed by the `i`th appended blob
    pub fn part(&self, i: usize) -> Option<&str> {
        self.parts.get(i).map(|range| &self.hex[range.clone()])
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn decode(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(self.payload())
    }
}

impl Default for BlobBuffer {
    fn default() -> Self {
        BlobBuffer::new()
    }
}
