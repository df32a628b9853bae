//! Log stream providers.
//!
//! A provider turns a source id plus [`LogsOptions`] into a live stream of
//! decoded frames, each tagged with the substream it belongs to. See
//! `logweave-frame` for the frame type and the demultiplexer.
//!
//! The built-in provider is [`DockerEngine`], a Docker Engine API client
//! reachable over a Unix socket or TCP (optionally with TLS).

pub mod docker;
pub mod error;
pub mod options;
pub mod traits;

pub use docker::{DockerEngine, Endpoint, LogStream, TlsSettings};
pub use error::{Result, TransportError};
pub use options::{parse_time_bound, LogsOptions, DEFAULT_DOCKER_HOST};
pub use traits::LogStreamProvider;
