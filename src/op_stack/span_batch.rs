use std::fmt::Display;

use bytes::Buf;
use num_bigint::BigUint;

use super::DecodeError;

pub const SPAN_BATCH_TYPE: u8 = 0x01;

const CHECK_SIZE: usize = 20;
const MAX_UVARINT_LEN: usize = 10;

/*
    span batch:
        type (1)
        prefix:
            rel_timestamp           uvarint
            l1_origin_num           uvarint
            parent_check            20 bytes
            l1_origin_check         20 bytes
        payload:
            block_count             uvarint
            origin_bits             bitlist(block_count)
            block_tx_counts         uvarint * block_count
            ... transactions, starting with contract_creation_bits bitlist(total txs)
*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanBatchSummary {
    pub rel_timestamp: u64,
    pub l1_origin_num: u64,
    pub parent_check: [u8; CHECK_SIZE],
    pub l1_origin_check: [u8; CHECK_SIZE],
    pub block_count: u64,
    pub origin_bits: Vec<bool>,
    pub block_tx_counts: Vec<u64>,
    pub contract_creation_bits: Vec<bool>,
}

impl SpanBatchSummary {
    pub fn total_txs(&self) -> u64 {
        self.block_tx_counts.iter().sum()
    }
}

impl Display for SpanBatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let origin_changes = self.origin_bits.iter().filter(|b| **b).count();
        let contract_creations = self.contract_creation_bits.iter().filter(|b| **b).count();

        write!(
            f,
            "rel_timestamp {}\nl1_origin_num {}\nparent_check {}\nl1_origin_check {}\nblocks {}\nl1 origin changes {}\ntransactions {}\ncontract creations {}",
            self.rel_timestamp,
            self.l1_origin_num,
            hex::encode(self.parent_check),
            hex::encode(self.l1_origin_check),
            self.block_count,
            origin_changes,
            self.total_txs(),
            contract_creations
        )
    }
}

/// reads the span batch header and the per block counts of a decoded batch
pub fn parse_span_batch(mut data: &[u8]) -> Result<SpanBatchSummary, DecodeError> {
    if !data.has_remaining() {
        return Err(DecodeError::ErrTruncated("batch type"));
    }

    let batch_type = data.get_u8();
    if batch_type != SPAN_BATCH_TYPE {
        return Err(DecodeError::ErrBatchType(batch_type));
    }

    let rel_timestamp = read_uvarint(&mut data, "rel_timestamp")?;
    let l1_origin_num = read_uvarint(&mut data, "l1_origin_num")?;
    let parent_check = read_check(&mut data, "parent_check")?;
    let l1_origin_check = read_check(&mut data, "l1_origin_check")?;

    let block_count = read_uvarint(&mut data, "block_count")?;
    if block_count == 0 {
        return Err(DecodeError::ErrSpanBatch("empty span batch"));
    }
    // every block needs at least one tx count byte
    if block_count > data.remaining() as u64 {
        return Err(DecodeError::ErrTruncated("origin_bits"));
    }

    let origin_bits = read_bitlist(&mut data, block_count as usize, "origin_bits")?;

    let mut block_tx_counts = Vec::with_capacity(block_count as usize);
    for _ in 0..block_count {
        block_tx_counts.push(read_uvarint(&mut data, "block_tx_count")?);
    }

    let total_txs = block_tx_counts
        .iter()
        .try_fold(0u64, |acc, n| acc.checked_add(*n))
        .ok_or(DecodeError::ErrSpanBatch("transaction count overflow"))?;
    if total_txs > (data.remaining() as u64) * 8 {
        return Err(DecodeError::ErrTruncated("contract_creation_bits"));
    }

    let contract_creation_bits =
        read_bitlist(&mut data, total_txs as usize, "contract_creation_bits")?;

    Ok(SpanBatchSummary {
        rel_timestamp,
        l1_origin_num,
        parent_check,
        l1_origin_check,
        block_count,
        origin_bits,
        block_tx_counts,
        contract_creation_bits,
    })
}

/// unsigned LEB128
pub fn read_uvarint(data: &mut &[u8], field: &'static str) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    for i in 0..MAX_UVARINT_LEN {
        if !data.has_remaining() {
            return Err(DecodeError::ErrTruncated(field));
        }

        let byte = data.get_u8();
        if i == MAX_UVARINT_LEN - 1 && byte > 1 {
            return Err(DecodeError::ErrUvarint(field));
        }

        value |= ((byte & 0x7f) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }

    Err(DecodeError::ErrUvarint(field))
}

fn read_check(data: &mut &[u8], field: &'static str) -> Result<[u8; CHECK_SIZE], DecodeError> {
    if data.remaining() < CHECK_SIZE {
        return Err(DecodeError::ErrTruncated(field));
    }

    let mut check = [0u8; CHECK_SIZE];
    data.copy_to_slice(&mut check);
    Ok(check)
}

/// reads `n` bits stored as a big endian integer, bit i being item i
fn read_bitlist(
    data: &mut &[u8],
    n: usize,
    field: &'static str,
) -> Result<Vec<bool>, DecodeError> {
    let byte_len = (n + 7) / 8;
    if data.remaining() < byte_len {
        return Err(DecodeError::ErrTruncated(field));
    }

    let bits = BigUint::from_bytes_be(&data[..byte_len]);
    data.advance(byte_len);

    if bits.bits() > n as u64 {
        return Err(DecodeError::ErrSpanBatch("bitlist longer than its item count"));
    }

    Ok((0..n as u64).map(|i| bits.bit(i)).collect())
}

#[cfg(test)]
pub fn encode_uvarint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
    out
}

#[cfg(test)]
pub fn encode_bitlist(bits: &[bool]) -> Vec<u8> {
    let mut value = BigUint::default();
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            value.set_bit(i as u64, true);
        }
    }

    let byte_len = (bits.len() + 7) / 8;
    let raw = if value.bits() == 0 {
        Vec::new()
    } else {
        value.to_bytes_be()
    };

    let mut out = vec![0u8; byte_len - raw.len()];
    out.extend(raw);
    out
}

/// span batch with fixed header values, used to build fixtures
#[cfg(test)]
pub fn span_batch_bytes(origin_bits: &[bool], tx_counts: &[u64], creations: &[bool]) -> Vec<u8> {
    let mut data = vec![SPAN_BATCH_TYPE];
    data.extend(encode_uvarint(1_700));
    data.extend(encode_uvarint(19_538_908));
    data.extend([0xaa; CHECK_SIZE]);
    data.extend([0xbb; CHECK_SIZE]);
    data.extend(encode_uvarint(origin_bits.len() as u64));
    data.extend(encode_bitlist(origin_bits));
    for count in tx_counts {
        data.extend(encode_uvarint(*count));
    }
    data.extend(encode_bitlist(creations));
    // trailing transaction data is not read
    data.extend([0xde, 0xad]);
    data
}
