use std::fmt;
use std::io;

use logweave_session::SessionError;
use logweave_transport::TransportError;

// Process exit codes. 64 follows sysexits(3), 130 is the shell convention for SIGINT.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;
pub const INTERRUPTED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_code(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_code(&err), format!("{context}: {err}"))
}

/// First I/O error in the source chain, if the failure came from the socket.
fn root_io_error<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a io::Error> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<io::Error>() {
            return Some(io);
        }
        current = err.source();
    }
    None
}

fn docker_io_error(err: &bollard::errors::Error) -> Option<&io::Error> {
    match err {
        bollard::errors::Error::IOError { err } => Some(err),
        other => root_io_error(other),
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match &err {
        TransportError::UnsupportedHost(_) | TransportError::InvalidRequest(_) => USAGE,
        TransportError::Docker(source) => match docker_io_error(source) {
            Some(io) if io.kind() == io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
            _ => TRANSPORT_ERROR,
        },
        TransportError::Status { .. } => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Connection { source_id, source } => {
            transport_error(&format!("{context}: {source_id}"), source)
        }
        SessionError::Cancelled => CliError::new(INTERRUPTED, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
