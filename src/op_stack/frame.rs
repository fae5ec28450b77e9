use bytes::{Buf, Bytes};

use super::DecodeError;

const DERIVATION_VERSION: u8 = 0;

const CHANNEL_ID_SIZE: usize = 16;
const FRAME_OVERHEAD: usize = CHANNEL_ID_SIZE + 2 + 4 + 1;

/*
    frame:
        - 16 byte channel id
        - 2 byte frame number (big endian)
        - 4 byte frame data length (big endian)
        - frame data
        - 1 byte is_last flag, 0 or 1
*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub channel_id: [u8; CHANNEL_ID_SIZE],
    pub number: u16,
    pub data: Bytes,
    pub is_last: bool,
}

/// parses the frames carried by one blob payload
pub fn parse_frames(mut payload: Bytes) -> Result<Vec<Frame>, DecodeError> {
    if !payload.has_remaining() {
        return Err(DecodeError::ErrTruncated("derivation version"));
    }

    let version = payload.get_u8();
    if version != DERIVATION_VERSION {
        return Err(DecodeError::ErrDerivationVersion(version));
    }

    let mut frames = Vec::new();
    while payload.has_remaining() {
        frames.push(parse_frame(&mut payload)?);
    }

    if frames.is_empty() {
        return Err(DecodeError::ErrTruncated("frame"));
    }

    Ok(frames)
}

fn parse_frame(data: &mut Bytes) -> Result<Frame, DecodeError> {
    if data.remaining() < FRAME_OVERHEAD {
        return Err(DecodeError::ErrTruncated("frame header"));
    }

    let mut channel_id = [0u8; CHANNEL_ID_SIZE];
    data.copy_to_slice(&mut channel_id);
    let number = data.get_u16();
    let length = data.get_u32() as usize;

    if data.remaining() < length + 1 {
        return Err(DecodeError::ErrTruncated("frame data"));
    }

    let frame_data = data.split_to(length);
    let is_last = match data.get_u8() {
        0 => false,
        1 => true,
        flag => return Err(DecodeError::ErrFrameFlag(flag)),
    };

    Ok(Frame {
        channel_id,
        number,
        data: frame_data,
        is_last,
    })
}

/// concatenates frame data in the order given
pub fn assemble_channel(frames: &[Frame]) -> Vec<u8> {
    let mut channel = Vec::with_capacity(frames.iter().map(|f| f.data.len()).sum());
    for frame in frames {
        channel.extend_from_slice(&frame.data);
    }

    channel
}

#[cfg(test)]
pub fn encode_frame(channel_id: [u8; 16], number: u16, data: &[u8], is_last: bool) -> Vec<u8> {
    let mut frame = channel_id.to_vec();
    frame.extend_from_slice(&number.to_be_bytes());
    frame.extend_from_slice(&(data.len() as u32).to_be_bytes());
    frame.extend_from_slice(data);
    frame.push(is_last as u8);
    frame
}
