//! Frame format for messages on a stream connection: a 4-byte big-endian body
//! length followed by the bincode-encoded message.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub const HEADER_LEN: usize = 4;
pub const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame of {0} bytes exceeds the {max} byte limit", max = MAX_FRAME_LEN)]
    TooLarge(usize),
    #[error("empty frame")]
    Empty,
    #[error("malformed frame body: {0}")]
    Body(#[from] bincode::Error),
}

/// Encodes `message` as header plus body, ready to be written to the stream.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, CodecError> {
    let body = bincode::serialize(message)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(CodecError::TooLarge(body.len()));
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Reads the body length out of a frame header, rejecting oversized frames
/// before any body bytes are buffered.
pub fn frame_len(header: [u8; HEADER_LEN]) -> Result<usize, CodecError> {
    let len = u32::from_be_bytes(header) as usize;
    if len == 0 {
        return Err(CodecError::Empty);
    }
    if len > MAX_FRAME_LEN {
        return Err(CodecError::TooLarge(len));
    }
    Ok(len)
}

pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, CodecError> {
    Ok(bincode::deserialize(body)?)
}
