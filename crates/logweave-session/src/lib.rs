//! Per-source log sessions and the fan-in pipeline.
//!
//! N sources → N [`SourceSession`]s (two line channels each) → [`fan_in`]
//! (two global channels) → [`ConsoleSink`].

pub mod barrier;
pub mod config;
pub mod error;
pub mod fanin;
pub mod run;
pub mod session;
pub mod sink;

#[cfg(test)]
pub(crate) mod testutil;

pub use barrier::{BarrierSignal, CompletionBarrier};
pub use config::{PipelineConfig, DEFAULT_GLOBAL_CAPACITY};
pub use error::{Result, SessionError};
pub use fanin::{fan_in, fan_in_with_capacity, GlobalChannels};
pub use run::{open_sessions, stream_to_console};
pub use session::{SessionState, SourceSession};
pub use sink::{drain_lines, ConsoleSink, DrainReport};
