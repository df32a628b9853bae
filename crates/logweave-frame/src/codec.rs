use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::error::{FrameError, Result};
use crate::stream::StreamKind;

/// Frame header: selector (1) + padding (3) + length (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// One chunk of a multiplexed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The substream this chunk belongs to.
    pub stream: StreamKind,
    /// The chunk payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(stream: StreamKind, payload: impl Into<Bytes>) -> Self {
        Self {
            stream,
            payload: payload.into(),
        }
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────────┬───────────┬─────────────────┐
/// │ Selector │ Padding (3B) │ Length    │ Payload         │
/// │ (1B)     │ 0x00 0x00 00 │ (4B BE)   │ (Length bytes)  │
/// └──────────┴──────────────┴───────────┴─────────────────┘
/// ```
pub fn encode_frame(stream: StreamKind, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u8(stream.selector());
    dst.put_slice(&[0, 0, 0]);
    dst.put_u32(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let stream = StreamKind::from_selector(src[0]).ok_or(FrameError::UnknownStream(src[0]))?;
    let payload_len = u32::from_be_bytes([src[4], src[5], src[6], src[7]]) as usize;

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame { stream, payload }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// `tokio_util` codec for the multiplexed stream format.
#[derive(Debug, Clone, Default)]
pub struct MuxCodec {
    config: FrameConfig,
}

impl MuxCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self { config }
    }
}

impl Decoder for MuxCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        decode_frame(src, self.config.max_payload_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !src.is_empty() {
            debug!(remaining = src.len(), "discarding truncated frame at end of stream");
            src.clear();
        }
        Ok(None)
    }
}

impl Encoder<Frame> for MuxCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        if frame.payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: frame.payload.len(),
                max: self.config.max_payload_size,
            });
        }
        encode_frame(frame.stream, &frame.payload, dst)
    }
}
