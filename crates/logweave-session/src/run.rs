use logweave_transport::{LogStreamProvider, LogsOptions};
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{Result, SessionError};
use crate::fanin::fan_in_with_capacity;
use crate::session::SourceSession;
use crate::sink::{ConsoleSink, DrainReport};

/// Open one session per id, in order.
///
/// Fails on the first source that cannot be opened; sessions opened so far
/// are dropped, which stops their tasks. An open still in flight when `token`
/// is cancelled is abandoned and reported as [`SessionError::Cancelled`].
pub async fn open_sessions<P>(
    provider: &P,
    ids: &[String],
    options: &LogsOptions,
    token: &CancellationToken,
    config: &PipelineConfig,
) -> Result<Vec<SourceSession>>
where
    P: LogStreamProvider,
{
    let mut sessions = Vec::with_capacity(ids.len());
    for id in ids {
        let session = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(SessionError::Cancelled),
            opened = SourceSession::open_with_config(provider, id, options, token, config) => opened?,
        };
        info!(source = %id, "streaming logs");
        sessions.push(session);
    }
    Ok(sessions)
}

/// Stream every source's logs to `sink` until all streams end or `token` is cancelled.
///
/// Setup errors are returned before any output is written. Errors after setup
/// are logged and isolated to their source or device.
pub async fn stream_to_console<P, O, E>(
    provider: &P,
    ids: &[String],
    options: &LogsOptions,
    token: &CancellationToken,
    sink: &mut ConsoleSink<O, E>,
    config: &PipelineConfig,
) -> Result<DrainReport>
where
    P: LogStreamProvider,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let sessions = open_sessions(provider, ids, options, token, config).await?;
    let channels = fan_in_with_capacity(sessions, token.clone(), config.global_capacity);
    Ok(sink.drain(channels).await)
}
