use super::DecodeError;

/*
    string item prefixes:
        - [0x00, 0x7f]  the byte itself
        - [0x80, 0xb7]  short string, length = prefix - 0x80
        - [0xb8, 0xbf]  long string, (prefix - 0xb7) big endian length bytes follow
        - [0xc0, 0xff]  list
*/

/// reads one RLP string item, returning its content and the remaining input
pub fn decode_string(data: &[u8]) -> Result<(&[u8], &[u8]), DecodeError> {
    let (&prefix, rest) = data
        .split_first()
        .ok_or(DecodeError::ErrTruncated("rlp prefix"))?;

    let (content_len, rest) = match prefix {
        0x00..=0x7f => return Ok((&data[..1], rest)),
        0x80..=0xb7 => ((prefix - 0x80) as usize, rest),
        0xb8..=0xbf => {
            let len_of_len = (prefix - 0xb7) as usize;
            if rest.len() < len_of_len {
                return Err(DecodeError::ErrTruncated("rlp length"));
            }
            let (len_bytes, rest) = rest.split_at(len_of_len);
            if len_bytes[0] == 0 {
                return Err(DecodeError::ErrRlp("non canonical length"));
            }
            let len = len_bytes
                .iter()
                .try_fold(0usize, |acc, b| acc.checked_mul(256).map(|v| v + *b as usize))
                .ok_or(DecodeError::ErrRlp("length overflow"))?;
            (len, rest)
        }
        _ => return Err(DecodeError::ErrRlp("expected a string, found a list")),
    };

    if rest.len() < content_len {
        return Err(DecodeError::ErrTruncated("rlp string"));
    }

    Ok(rest.split_at(content_len))
}

#[cfg(test)]
pub fn encode_string(content: &[u8]) -> Vec<u8> {
    if content.len() == 1 && content[0] < 0x80 {
        return content.to_vec();
    }

    let mut out = Vec::new();
    if content.len() <= 55 {
        out.push(0x80 + content.len() as u8);
    } else {
        let len_bytes: Vec<u8> = content
            .len()
            .to_be_bytes()
            .into_iter()
            .skip_while(|b| *b == 0)
            .collect();
        out.push(0xb7 + len_bytes.len() as u8);
        out.extend(len_bytes);
    }
    out.extend_from_slice(content);
    out
}
