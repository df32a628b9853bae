//! Merge the logs of many containers into one stdout and one stderr stream.
//!
//! Every source's combined log stream is split into its two substreams,
//! framed into lines tagged with the source id, and fanned in to two global
//! channels that end up on the process's stdout and stderr.
//!
//! # Crate Structure
//!
//! - [`frame`]: Multiplexed stream codec, demultiplexer and line framing
//! - [`transport`]: Log stream providers (Docker Engine over a Unix socket or TCP)
//! - [`session`]: Per-source sessions, fan-in and console output

/// Re-export frame types.
pub mod frame {
    pub use logweave_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use logweave_transport::*;
}

/// Re-export session types.
pub mod session {
    pub use logweave_session::*;
}
