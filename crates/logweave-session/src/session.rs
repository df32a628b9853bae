use std::sync::Arc;

use futures_util::Stream;
use logweave_frame::{demux_frames, line_channel_with_config, Frame, LineReceiver, LineSink};
use logweave_transport::{LogStreamProvider, LogsOptions};
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::error::{Result, SessionError};

/// Lifecycle of a [`SourceSession`].
///
/// `Opening → Streaming → Closed` when the stream ends or is cancelled, and
/// `Streaming → Failed` when it breaks off with an error. A stream that cannot
/// be opened never yields a session; `open` returns
/// [`SessionError::Connection`] instead. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Opening,
    Streaming,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

/// One source's live log stream, split into primary and secondary line channels.
///
/// Dropping a session cancels its background tasks and releases the stream.
pub struct SourceSession {
    id: Arc<str>,
    stdout: LineReceiver,
    stderr: LineReceiver,
    state: watch::Receiver<SessionState>,
    guard: DropGuard,
}

/// A session taken apart for forwarding. The guard stops the session when dropped.
pub(crate) struct SessionParts {
    pub id: Arc<str>,
    pub stdout: LineReceiver,
    pub stderr: LineReceiver,
    pub guard: DropGuard,
}

impl SourceSession {
    /// Open the log stream for `id` and start splitting it into lines.
    pub async fn open<P>(
        provider: &P,
        id: &str,
        options: &LogsOptions,
        token: &CancellationToken,
    ) -> Result<Self>
    where
        P: LogStreamProvider,
    {
        Self::open_with_config(provider, id, options, token, &PipelineConfig::default()).await
    }

    /// [`open`](Self::open) with explicit buffering limits.
    pub async fn open_with_config<P>(
        provider: &P,
        id: &str,
        options: &LogsOptions,
        token: &CancellationToken,
        config: &PipelineConfig,
    ) -> Result<Self>
    where
        P: LogStreamProvider,
    {
        let (state_tx, state) = watch::channel(SessionState::Opening);
        debug!(source = id, "opening log stream");

        let input = provider
            .open(id, options)
            .await
            .map_err(|source| SessionError::Connection {
                source_id: id.to_string(),
                source,
            })?;

        let id: Arc<str> = Arc::from(id);
        let session_token = token.child_token();
        let (stdout, stdout_sink) =
            line_channel_with_config(Arc::clone(&id), session_token.clone(), &config.line);
        let (stderr, stderr_sink) =
            line_channel_with_config(Arc::clone(&id), session_token.clone(), &config.line);

        state_tx.send_replace(SessionState::Streaming);
        tokio::spawn(pump(
            Arc::clone(&id),
            input,
            stdout_sink,
            stderr_sink,
            session_token.clone(),
            state_tx,
        ));

        Ok(Self {
            id,
            stdout,
            stderr,
            state,
            guard: session_token.drop_guard(),
        })
    }

    /// Wrap line channels produced elsewhere. The session reports `Streaming`.
    pub fn from_channels(
        id: impl Into<Arc<str>>,
        stdout: LineReceiver,
        stderr: LineReceiver,
    ) -> Self {
        let (_, state) = watch::channel(SessionState::Streaming);
        Self {
            id: id.into(),
            stdout,
            stderr,
            state,
            guard: CancellationToken::new().drop_guard(),
        }
    }

    /// Source identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn state_watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Primary line channel.
    pub fn stdout(&mut self) -> &mut LineReceiver {
        &mut self.stdout
    }

    /// Secondary line channel.
    pub fn stderr(&mut self) -> &mut LineReceiver {
        &mut self.stderr
    }

    pub(crate) fn into_parts(self) -> SessionParts {
        SessionParts {
            id: self.id,
            stdout: self.stdout,
            stderr: self.stderr,
            guard: self.guard,
        }
    }
}

impl std::fmt::Debug for SourceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSession")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

async fn pump<S>(
    id: Arc<str>,
    input: S,
    stdout: LineSink,
    stderr: LineSink,
    token: CancellationToken,
    state: watch::Sender<SessionState>,
) where
    S: Stream<Item = logweave_frame::Result<Frame>> + Unpin,
{
    let end = tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!(source = %id, "log stream cancelled");
            SessionState::Closed
        }
        copied = demux_frames(input, stdout, stderr) => match copied {
            Ok(stats) => {
                debug!(
                    source = %id,
                    primary_bytes = stats.primary_bytes,
                    secondary_bytes = stats.secondary_bytes,
                    discarded_bytes = stats.discarded_bytes,
                    "log stream ended"
                );
                SessionState::Closed
            }
            Err(source) => {
                let err = SessionError::Copy {
                    source_id: id.to_string(),
                    source,
                };
                warn!(source = %id, error = %err, "log stream copy failed");
                SessionState::Failed
            }
        },
    };
    state.send_replace(end);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use logweave_frame::StreamKind;

    use super::*;
    use crate::testutil::{collect, FakeProvider};

    async fn wait_for_state(session: &SourceSession, wanted: SessionState) {
        let mut watch = session.state_watch();
        tokio::time::timeout(Duration::from_secs(5), watch.wait_for(|s| *s == wanted))
            .await
            .expect("state transition should happen")
            .expect("state sender should be alive until terminal");
    }

    #[tokio::test]
    async fn splits_stream_into_tagged_line_channels() {
        let provider = FakeProvider::new().with_frames(
            "c1",
            &[
                (StreamKind::Stdout, "a\n"),
                (StreamKind::Stderr, "oops\n"),
                (StreamKind::Stdout, "b\n"),
            ],
        );
        let token = CancellationToken::new();

        let mut session = SourceSession::open(&provider, "c1", &LogsOptions::default(), &token)
            .await
            .expect("session should open");
        assert_eq!(session.id(), "c1");

        let stdout = collect(session.stdout()).await;
        let stderr = collect(session.stderr()).await;
        assert_eq!(stdout, vec!["c1:a", "c1:b"]);
        assert_eq!(stderr, vec!["c1:oops"]);
        wait_for_state(&session, SessionState::Closed).await;
    }

    #[tokio::test]
    async fn failed_open_is_a_connection_error() {
        let provider = FakeProvider::new().with_failure("gone");
        let token = CancellationToken::new();

        let err = SourceSession::open(&provider, "gone", &LogsOptions::default(), &token)
            .await
            .expect_err("open should fail");

        match err {
            SessionError::Connection { source_id, .. } => assert_eq!(source_id, "gone"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn copy_failure_fails_session_without_propagating() {
        let provider = FakeProvider::new().with_raw(
            "c1",
            {
                let mut wire = FakeProvider::encode(&[(StreamKind::Stdout, "kept\n")]);
                wire.extend_from_slice(&[9, 0, 0, 0, 0, 0, 0, 2, b'?', b'\n']);
                wire
            },
        );
        let token = CancellationToken::new();

        let mut session = SourceSession::open(&provider, "c1", &LogsOptions::default(), &token)
            .await
            .unwrap();

        assert_eq!(collect(session.stdout()).await, vec!["c1:kept"]);
        assert!(collect(session.stderr()).await.is_empty());
        wait_for_state(&session, SessionState::Failed).await;
    }

    #[tokio::test]
    async fn finished_stream_closes_session() {
        let provider = FakeProvider::new().with_endless("f1", &[(StreamKind::Stderr, "e\n")]);
        let token = CancellationToken::new();

        let mut session = SourceSession::open(&provider, "f1", &LogsOptions::default(), &token)
            .await
            .unwrap();
        provider.finish("f1").await;

        assert!(collect(session.stdout()).await.is_empty());
        assert_eq!(collect(session.stderr()).await, vec!["f1:e"]);
        wait_for_state(&session, SessionState::Closed).await;
    }

    #[tokio::test]
    async fn follow_session_streams_until_cancelled() {
        let provider = FakeProvider::new().with_endless("f1", &[(StreamKind::Stdout, "first\n")]);
        let token = CancellationToken::new();

        let mut session = SourceSession::open(&provider, "f1", &LogsOptions::default(), &token)
            .await
            .unwrap();

        let first = session.stdout().recv().await.unwrap();
        assert_eq!(first.to_string(), "f1:first");
        assert_eq!(session.state(), SessionState::Streaming);

        token.cancel();
        let closed = tokio::time::timeout(Duration::from_secs(5), session.stdout().recv())
            .await
            .expect("stdout should close after cancellation");
        assert!(closed.is_none());
        wait_for_state(&session, SessionState::Closed).await;
    }

    #[tokio::test]
    async fn dropping_session_releases_stream() {
        let provider = FakeProvider::new().with_endless("f1", &[]);
        let token = CancellationToken::new();

        let session = SourceSession::open(&provider, "f1", &LogsOptions::default(), &token)
            .await
            .unwrap();
        let mut watch = session.state_watch();
        drop(session);

        tokio::time::timeout(Duration::from_secs(5), watch.wait_for(|s| s.is_terminal()))
            .await
            .expect("pump should stop once the session is dropped")
            .unwrap();
        assert!(provider.released("f1").await);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn terminal_states() {
        assert!(!SessionState::Opening.is_terminal());
        assert!(!SessionState::Streaming.is_terminal());
        assert!(SessionState::Closed.is_terminal());
        assert!(SessionState::Failed.is_terminal());
    }
}
