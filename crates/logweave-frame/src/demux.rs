use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedRead;
use tracing::{debug, trace};

use crate::codec::{Frame, FrameConfig, MuxCodec};
use crate::error::{FrameError, Result};
use crate::stream::StreamKind;

/// Byte counts copied by a completed [`demux`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    /// Bytes written to the primary sink (stdin + stdout frames).
    pub primary_bytes: u64,
    /// Bytes written to the secondary sink (stderr frames).
    pub secondary_bytes: u64,
    /// Payload bytes dropped because their sink had stopped accepting writes.
    pub discarded_bytes: u64,
}

/// Split a multiplexed byte stream into its primary and secondary substreams.
///
/// See [`demux_frames`] for routing and shutdown behavior.
pub async fn demux<R, P, S>(input: R, primary: P, secondary: S) -> Result<DemuxStats>
where
    R: AsyncRead + Unpin,
    P: AsyncWrite + Unpin,
    S: AsyncWrite + Unpin,
{
    demux_with_config(input, primary, secondary, FrameConfig::default()).await
}

/// [`demux`] with explicit codec configuration.
pub async fn demux_with_config<R, P, S>(
    input: R,
    primary: P,
    secondary: S,
    config: FrameConfig,
) -> Result<DemuxStats>
where
    R: AsyncRead + Unpin,
    P: AsyncWrite + Unpin,
    S: AsyncWrite + Unpin,
{
    let frames = FramedRead::new(input, MuxCodec::with_config(config));
    demux_frames(frames, primary, secondary).await
}

/// Route already-decoded frames to the primary and secondary sinks.
///
/// Runs until `frames` is exhausted, a frame cannot be routed, or both sinks
/// have stopped accepting writes. A sink whose write fails is treated as
/// gone: later frames for it are consumed and discarded while the other sink
/// keeps receiving. Both sinks are shut down before returning, whatever the
/// outcome, so readers on the other side observe end-of-stream. `frames` is
/// dropped on return.
pub async fn demux_frames<F, P, S>(
    mut frames: F,
    mut primary: P,
    mut secondary: S,
) -> Result<DemuxStats>
where
    F: Stream<Item = Result<Frame>> + Unpin,
    P: AsyncWrite + Unpin,
    S: AsyncWrite + Unpin,
{
    let mut stats = DemuxStats::default();
    let mut primary_open = true;
    let mut secondary_open = true;

    let copied = async {
        while let Some(frame) = frames.next().await {
            let frame = frame?;
            let len = frame.payload.len() as u64;
            trace!(stream = frame.stream.name(), len, "routing frame");

            match frame.stream {
                StreamKind::SystemErr => {
                    return Err(FrameError::SystemError(
                        String::from_utf8_lossy(&frame.payload).into_owned(),
                    ));
                }
                kind if kind.is_primary() => {
                    if deliver(&mut primary, &mut primary_open, kind, &frame.payload).await {
                        stats.primary_bytes += len;
                    } else {
                        stats.discarded_bytes += len;
                    }
                }
                kind => {
                    if deliver(&mut secondary, &mut secondary_open, kind, &frame.payload).await {
                        stats.secondary_bytes += len;
                    } else {
                        stats.discarded_bytes += len;
                    }
                }
            }

            if !primary_open && !secondary_open {
                debug!("both substream sinks closed");
                break;
            }
        }
        Ok::<_, FrameError>(())
    }
    .await;

    drop(frames);
    let _ = primary.shutdown().await;
    let _ = secondary.shutdown().await;

    copied.map(|()| stats)
}

/// Write one payload to a sink that is still open. Returns false if the
/// payload was not delivered; a failed write closes the sink for good.
async fn deliver<W>(sink: &mut W, open: &mut bool, stream: StreamKind, payload: &[u8]) -> bool
where
    W: AsyncWrite + Unpin,
{
    if !*open {
        return false;
    }
    let written = async {
        sink.write_all(payload).await?;
        sink.flush().await
    }
    .await;
    if let Err(err) = written {
        debug!(stream = stream.name(), error = %err, "substream sink closed, discarding its frames");
        *open = false;
        return false;
    }
    true
}
