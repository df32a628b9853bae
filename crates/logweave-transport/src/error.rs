/// Errors that can occur while opening a log stream.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host URL uses a scheme this provider cannot reach.
    #[error("unsupported host {0:?} (expected unix://, tcp://, http:// or https://)")]
    UnsupportedHost(String),

    /// The log request could not be built.
    #[error("invalid log request: {0}")]
    InvalidRequest(String),

    /// The engine answered with a non-success status.
    #[error("log request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The engine could not be reached or its response could not be read.
    #[error("docker engine error: {0}")]
    Docker(#[source] bollard::errors::Error),
}

impl From<bollard::errors::Error> for TransportError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code,
                message,
            } => Self::Status {
                status: status_code,
                message,
            },
            other => Self::Docker(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
