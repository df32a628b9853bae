use std::fmt;
use std::sync::Arc;

use bytes::BytesMut;
use futures_util::StreamExt;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{FrameError, Result};

/// Default maximum length of a single record: 64 KiB.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Default number of framed lines buffered per channel.
pub const DEFAULT_LINE_CAPACITY: usize = 64;

const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

/// One newline-delimited record, tagged with the source it came from.
///
/// Renders as `source:text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    source: Arc<str>,
    text: String,
}

impl Line {
    pub fn new(source: impl Into<Arc<str>>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    /// Identifier of the source that produced this line.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Line content without terminator.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.text)
    }
}

pub type LineSender = mpsc::Sender<Line>;
pub type LineReceiver = mpsc::Receiver<Line>;

/// Byte sink feeding a line channel. Shut it down (or drop it) to end the channel.
pub type LineSink = DuplexStream;

/// Splits bytes on `\n`, stripping an optional trailing `\r`.
///
/// Unlike `tokio_util::codec::LinesCodec`, an unterminated fragment at end of
/// stream is discarded rather than emitted.
#[derive(Debug, Clone)]
pub struct LineCodec {
    max_length: usize,
    next_index: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        let newline = src[self.next_index..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| self.next_index + offset);

        match newline {
            Some(index) if index > self.max_length => Err(FrameError::LineTooLong {
                max: self.max_length,
            }),
            Some(index) => {
                self.next_index = 0;
                let record = src.split_to(index + 1);
                let mut body = &record[..index];
                if let [rest @ .., b'\r'] = body {
                    body = rest;
                }
                Ok(Some(String::from_utf8_lossy(body).into_owned()))
            }
            None if src.len() > self.max_length => Err(FrameError::LineTooLong {
                max: self.max_length,
            }),
            None => {
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if !src.is_empty() {
            trace!(len = src.len(), "discarding unterminated fragment");
            src.clear();
            self.next_index = 0;
        }
        Ok(None)
    }
}

/// Configuration for [`line_channel_with_config`].
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Maximum record length before the scan stops. Default: 64 KiB.
    pub max_line_length: usize,
    /// Lines buffered in the channel. Default: 64.
    pub channel_capacity: usize,
    /// Bytes buffered between the sink and the scanner. Default: 64 KiB.
    pub pipe_capacity: usize,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            channel_capacity: DEFAULT_LINE_CAPACITY,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }
}

/// Create a line channel fed by a byte sink.
///
/// Bytes written to the returned [`LineSink`] are split into records, tagged
/// with `source` and sent on the returned [`LineReceiver`]. One scanner task is
/// spawned per call; it ends, closing the channel, when the sink is closed,
/// when `token` is cancelled, or when the receiver is dropped.
///
/// Must be called from within a Tokio runtime.
pub fn line_channel(
    source: impl Into<Arc<str>>,
    token: CancellationToken,
) -> (LineReceiver, LineSink) {
    line_channel_with_config(source, token, &LineConfig::default())
}

/// [`line_channel`] with explicit buffering limits.
pub fn line_channel_with_config(
    source: impl Into<Arc<str>>,
    token: CancellationToken,
    config: &LineConfig,
) -> (LineReceiver, LineSink) {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let (sink, pipe) = tokio::io::duplex(config.pipe_capacity.max(1));
    let codec = LineCodec::with_max_length(config.max_line_length);

    tokio::spawn(scan_lines(pipe, codec, source.into(), tx, token));

    (rx, sink)
}

async fn scan_lines(
    pipe: DuplexStream,
    codec: LineCodec,
    source: Arc<str>,
    tx: LineSender,
    token: CancellationToken,
) {
    let mut records = FramedRead::new(pipe, codec);
    let mut emitted = 0u64;

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = records.next() => next,
        };

        let text = match next {
            Some(Ok(text)) => text,
            Some(Err(err)) => {
                warn!(source = %source, error = %err, "line scan stopped");
                break;
            }
            None => break,
        };

        if token.is_cancelled() {
            break;
        }

        let line = Line::new(Arc::clone(&source), text);
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            sent = tx.send(line) => {
                if sent.is_err() {
                    break;
                }
            }
        }
        emitted += 1;
    }

    debug!(source = %source, emitted, "line channel closed");
}
