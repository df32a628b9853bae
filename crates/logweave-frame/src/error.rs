/// Errors that can occur while decoding a multiplexed stream or framing lines.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header carries a stream selector outside the known set.
    #[error("unrecognized stream selector {0} in frame header")]
    UnknownStream(u8),

    /// The source reported an error through the system-error stream.
    #[error("error from log source: {0}")]
    SystemError(String),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A line exceeds the configured maximum length without a terminator.
    #[error("line too long (max {max} bytes)")]
    LineTooLong { max: usize },

    /// The source of a frame stream failed before the stream ended.
    #[error("log source failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An I/O error occurred while reading or writing the stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
