//! Wire formats for multiplexed container log streams.
//!
//! A combined log stream interleaves two logical substreams. Every chunk is
//! framed with:
//! - A 1-byte stream selector (stdin, stdout, stderr, system error)
//! - 3 zero padding bytes
//! - A 4-byte big-endian payload length
//!
//! [`demux`] splits such a stream into two byte sinks ([`demux_frames`] does
//! the same for frames decoded elsewhere) and [`line_channel`]
//! turns a byte sink into a channel of source-tagged [`Line`]s.

pub mod codec;
pub mod demux;
pub mod error;
pub mod lines;
pub mod stream;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, MuxCodec, DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
};
pub use demux::{demux, demux_frames, demux_with_config, DemuxStats};
pub use error::{FrameError, Result};
pub use lines::{
    line_channel, line_channel_with_config, Line, LineCodec, LineConfig, LineReceiver,
    LineSender, LineSink, DEFAULT_LINE_CAPACITY, DEFAULT_MAX_LINE_LENGTH,
};
pub use stream::{StreamKind, STDERR, STDIN, STDOUT, SYSTEMERR};
