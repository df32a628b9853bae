use std::sync::Arc;

use logweave_frame::{Line, LineReceiver, LineSender, StreamKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, trace};

use crate::barrier::{BarrierSignal, CompletionBarrier};
use crate::config::DEFAULT_GLOBAL_CAPACITY;
use crate::session::SourceSession;

/// The two merged output channels of a fan-in.
///
/// Both channels close once every forwarder has stopped; `closer` completes
/// at that moment.
#[derive(Debug)]
pub struct GlobalChannels {
    pub stdout: mpsc::Receiver<Line>,
    pub stderr: mpsc::Receiver<Line>,
    pub closer: JoinHandle<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Exhausted,
    Cancelled,
    Abandoned,
}

/// Merge every session's line channels into one global stdout and one global
/// stderr channel.
///
/// Spawns two forwarders per session plus one closer task. Line order is kept
/// per source and substream; interleaving across sources is unspecified.
/// Cancelling `token` makes forwarders drop whatever is still queued.
pub fn fan_in(sessions: Vec<SourceSession>, token: CancellationToken) -> GlobalChannels {
    fan_in_with_capacity(sessions, token, DEFAULT_GLOBAL_CAPACITY)
}

/// [`fan_in`] with an explicit global channel capacity.
pub fn fan_in_with_capacity(
    sessions: Vec<SourceSession>,
    token: CancellationToken,
    capacity: usize,
) -> GlobalChannels {
    let (stdout_tx, stdout) = mpsc::channel(capacity.max(1));
    let (stderr_tx, stderr) = mpsc::channel(capacity.max(1));
    let barrier = CompletionBarrier::new(2 * sessions.len());

    debug!(sources = sessions.len(), "starting fan-in");
    for session in sessions {
        let parts = session.into_parts();
        let guard = Arc::new(parts.guard);

        tokio::spawn(forward(
            Arc::clone(&parts.id),
            StreamKind::Stdout,
            parts.stdout,
            stdout_tx.clone(),
            token.clone(),
            barrier.signal(),
            Arc::clone(&guard),
        ));
        tokio::spawn(forward(
            parts.id,
            StreamKind::Stderr,
            parts.stderr,
            stderr_tx.clone(),
            token.clone(),
            barrier.signal(),
            guard,
        ));
    }

    let closer = tokio::spawn(close_when_done(barrier, stdout_tx, stderr_tx));

    GlobalChannels {
        stdout,
        stderr,
        closer,
    }
}

async fn forward(
    source: Arc<str>,
    stream: StreamKind,
    mut rx: LineReceiver,
    tx: LineSender,
    token: CancellationToken,
    signal: BarrierSignal,
    session: Arc<DropGuard>,
) {
    let mut relayed = 0u64;

    let exit = loop {
        let line = tokio::select! {
            biased;
            _ = token.cancelled() => break Exit::Cancelled,
            line = rx.recv() => line,
        };
        let Some(line) = line else {
            break Exit::Exhausted;
        };
        if token.is_cancelled() {
            break Exit::Cancelled;
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => break Exit::Cancelled,
            sent = tx.send(line) => {
                if sent.is_err() {
                    break Exit::Abandoned;
                }
            }
        }
        relayed += 1;
    };

    trace!(source = %source, stream = stream.name(), relayed, exit = ?exit, "forwarder stopped");
    drop(rx);
    drop(tx);
    drop(session);
    drop(signal);
}

async fn close_when_done(barrier: Arc<CompletionBarrier>, stdout: LineSender, stderr: LineSender) {
    barrier.wait().await;
    drop(stdout);
    drop(stderr);
    debug!("all forwarders stopped, global channels closed");
}
