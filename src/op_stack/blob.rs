use super::DecodeError;

/// 4096 field elements of 32 bytes
pub const BLOB_SIZE: usize = 131072;

const ROUND_SIZE: usize = 128;
const ROUND_OUTPUT: usize = 4 * 31 + 3;
const ROUNDS: usize = BLOB_SIZE / ROUND_SIZE;
const HEADER_SIZE: usize = 4;

/// largest payload a single blob can carry
pub const MAX_BLOB_DATA_SIZE: usize = ROUNDS * ROUND_OUTPUT - HEADER_SIZE;

const ENCODING_VERSION: u8 = 0;

/*
    every round of four field elements A, B, C, D:
        - the high byte of each element only uses its low 6 bits
        - the 31 byte tails are copied as is
        - the three bytes rebuilt from the high bytes follow the first three tails

    decoded stream:
        version (1) | length (3, big endian) | payload | zero padding
*/

/// splits concatenated blobs and decodes each into its payload
pub fn decode_blobs(data: &[u8]) -> Result<Vec<Vec<u8>>, DecodeError> {
    if data.len() % BLOB_SIZE != 0 {
        return Err(DecodeError::ErrBlobSize(data.len()));
    }

    data.chunks(BLOB_SIZE).map(decode_blob).collect()
}

/// decodes a single blob into the payload it carries
pub fn decode_blob(blob: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if blob.len() != BLOB_SIZE {
        return Err(DecodeError::ErrBlobSize(blob.len()));
    }

    let version = blob[1];
    if version != ENCODING_VERSION {
        return Err(DecodeError::ErrBlobVersion(version));
    }

    let declared_length = u32::from_be_bytes([0, blob[2], blob[3], blob[4]]) as usize;
    if declared_length > MAX_BLOB_DATA_SIZE {
        return Err(DecodeError::ErrBlobLength(declared_length));
    }

    let mut decoded = Vec::with_capacity(ROUNDS * ROUND_OUTPUT);
    for (round, chunk) in blob.chunks(ROUND_SIZE).enumerate() {
        decode_round(chunk, &mut decoded).map_err(|_| DecodeError::ErrFieldElement(round))?;
    }

    Ok(decoded[HEADER_SIZE..HEADER_SIZE + declared_length].to_vec())
}

fn decode_round(chunk: &[u8], out: &mut Vec<u8>) -> Result<(), ()> {
    let (a, b, c, d) = (chunk[0], chunk[32], chunk[64], chunk[96]);
    if (a | b | c | d) & 0b1100_0000 != 0 {
        return Err(());
    }

    let x = (a & 0b0011_1111) | ((b & 0b0011_0000) << 2);
    let y = (b & 0b0000_1111) | ((d & 0b0000_1111) << 4);
    let z = (c & 0b0011_1111) | ((d & 0b0011_0000) << 2);

    out.extend_from_slice(&chunk[1..32]);
    out.push(x);
    out.extend_from_slice(&chunk[33..64]);
    out.push(y);
    out.extend_from_slice(&chunk[65..96]);
    out.push(z);
    out.extend_from_slice(&chunk[97..128]);

    Ok(())
}

/// inverse of `decode_blob`, used to build fixtures
#[cfg(test)]
pub fn encode_blob(payload: &[u8]) -> Vec<u8> {
    assert!(payload.len() <= MAX_BLOB_DATA_SIZE);

    let mut stream = vec![ENCODING_VERSION];
    stream.extend_from_slice(&(payload.len() as u32).to_be_bytes()[1..]);
    stream.extend_from_slice(payload);
    stream.resize(ROUNDS * ROUND_OUTPUT, 0);

    let mut blob = Vec::with_capacity(BLOB_SIZE);
    for round in stream.chunks(ROUND_OUTPUT) {
        let (x, y, z) = (round[31], round[63], round[95]);
        let a = x & 0b0011_1111;
        let b = ((x >> 2) & 0b0011_0000) | (y & 0b0000_1111);
        let c = z & 0b0011_1111;
        let d = ((z >> 2) & 0b0011_0000) | ((y >> 4) & 0b0000_1111);

        blob.push(a);
        blob.extend_from_slice(&round[0..31]);
        blob.push(b);
        blob.extend_from_slice(&round[32..63]);
        blob.push(c);
        blob.extend_from_slice(&round[64..95]);
        blob.push(d);
        blob.extend_from_slice(&round[96..127]);
    }

    blob
}
