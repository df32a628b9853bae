use logweave_frame::FrameError;
use logweave_transport::TransportError;

/// Errors that can occur while running the log pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The combined stream for a source could not be opened.
    #[error("failed to open log stream for {source_id}: {source}")]
    Connection {
        source_id: String,
        source: TransportError,
    },

    /// Splitting a source's combined stream failed part-way.
    #[error("demultiplexing failed for {source_id}: {source}")]
    Copy {
        source_id: String,
        source: FrameError,
    },

    /// Writing or flushing an output device failed.
    #[error("failed to write to {device}: {source}")]
    Serialization {
        device: &'static str,
        source: std::io::Error,
    },

    /// Setup was cancelled before every source was opened.
    #[error("cancelled before all log streams were opened")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SessionError>;
