use logweave_frame::LineReceiver;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter, Stderr, Stdout};
use tracing::{debug, error, warn};

use crate::error::{Result, SessionError};
use crate::fanin::GlobalChannels;

/// Outcome of draining both global channels.
#[derive(Debug)]
pub struct DrainReport {
    /// Records written to the primary device, or the error that stopped it.
    pub stdout: Result<u64>,
    /// Records written to the secondary device, or the error that stopped it.
    pub stderr: Result<u64>,
}

impl DrainReport {
    pub fn is_ok(&self) -> bool {
        self.stdout.is_ok() && self.stderr.is_ok()
    }
}

/// Writes merged lines to two output devices, one record per line.
#[derive(Debug)]
pub struct ConsoleSink<O, E> {
    stdout: O,
    stderr: E,
}

impl ConsoleSink<BufWriter<Stdout>, BufWriter<Stderr>> {
    /// Process stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(
            BufWriter::new(tokio::io::stdout()),
            BufWriter::new(tokio::io::stderr()),
        )
    }
}

impl<O, E> ConsoleSink<O, E>
where
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    pub fn new(stdout: O, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    /// Drain both global channels concurrently until they close.
    ///
    /// A write failure stops only the affected device's loop.
    pub async fn drain(&mut self, channels: GlobalChannels) -> DrainReport {
        let GlobalChannels {
            stdout,
            stderr,
            closer,
        } = channels;

        let (stdout_result, stderr_result) = tokio::join!(
            drain_lines("stdout", stdout, &mut self.stdout),
            drain_lines("stderr", stderr, &mut self.stderr),
        );

        for result in [&stdout_result, &stderr_result] {
            if let Err(err) = result {
                error!(error = %err, "output device failed");
            }
        }
        if let Err(err) = closer.await {
            warn!(error = %err, "fan-in closer task failed");
        }

        DrainReport {
            stdout: stdout_result,
            stderr: stderr_result,
        }
    }

    /// Give back the output devices.
    pub fn into_inner(self) -> (O, E) {
        (self.stdout, self.stderr)
    }
}

/// Write every line from `rx` to `writer` as `source:text\n`, flushing each.
///
/// Returns the number of records written once `rx` closes. `rx` is dropped on
/// return, so producers see the device go away after a failure.
pub async fn drain_lines<W>(
    device: &'static str,
    mut rx: LineReceiver,
    mut writer: W,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    while let Some(line) = rx.recv().await {
        let record = format!("{line}\n");
        writer
            .write_all(record.as_bytes())
            .await
            .map_err(|source| SessionError::Serialization { device, source })?;
        writer
            .flush()
            .await
            .map_err(|source| SessionError::Serialization { device, source })?;
        written += 1;
    }
    debug!(device, written, "output drained");
    Ok(written)
}
