use std::future::Future;

use futures_util::Stream;
use logweave_frame::Frame;

use crate::error::Result;
use crate::options::LogsOptions;

/// Opens a live log stream for a source id.
///
/// The returned stream is exclusively owned by the caller; dropping it
/// releases the underlying connection.
pub trait LogStreamProvider: Send + Sync {
    /// Decoded frames from both substreams, in arrival order.
    type Stream: Stream<Item = logweave_frame::Result<Frame>> + Send + Unpin + 'static;

    /// Open the log stream for `source_id`.
    fn open(
        &self,
        source_id: &str,
        options: &LogsOptions,
    ) -> impl Future<Output = Result<Self::Stream>> + Send;
}
