//! In-memory log stream provider for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use logweave_frame::{encode_frame, LineReceiver, MuxCodec, StreamKind};
use logweave_transport::{LogStreamProvider, LogsOptions, TransportError};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::Mutex;
use tokio_util::codec::FramedRead;

const PIPE_CAPACITY: usize = 64 * 1024;

enum FakeSource {
    Finite(Vec<u8>),
    Endless(Vec<u8>),
    Fail,
}

type FakeStream = FramedRead<DuplexStream, MuxCodec>;

/// Serves canned multiplexed streams keyed by source id.
///
/// Unknown ids fail like a missing container. Endless sources keep their
/// writer half so the stream stays open until the reader goes away.
#[derive(Default)]
pub(crate) struct FakeProvider {
    sources: HashMap<String, FakeSource>,
    writers: Mutex<HashMap<String, DuplexStream>>,
    opened: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(frames: &[(StreamKind, &str)]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (stream, payload) in frames {
            encode_frame(*stream, payload.as_bytes(), &mut buf).expect("frame should encode");
        }
        buf.to_vec()
    }

    pub fn with_frames(self, id: &str, frames: &[(StreamKind, &str)]) -> Self {
        self.with_raw(id, Self::encode(frames))
    }

    pub fn with_raw(mut self, id: &str, wire: Vec<u8>) -> Self {
        self.sources.insert(id.to_string(), FakeSource::Finite(wire));
        self
    }

    pub fn with_endless(mut self, id: &str, frames: &[(StreamKind, &str)]) -> Self {
        self.sources
            .insert(id.to_string(), FakeSource::Endless(Self::encode(frames)));
        self
    }

    pub fn with_failure(mut self, id: &str) -> Self {
        self.sources.insert(id.to_string(), FakeSource::Fail);
        self
    }

    /// Number of `open` calls so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Push more frames into an endless source.
    pub async fn push(&self, id: &str, frames: &[(StreamKind, &str)]) {
        let mut writers = self.writers.lock().await;
        let writer = writers.get_mut(id).expect("source should be open and endless");
        writer
            .write_all(&Self::encode(frames))
            .await
            .expect("push should write");
    }

    /// End an endless source as if the engine had closed the stream.
    pub async fn finish(&self, id: &str) {
        let writer = self.writers.lock().await.remove(id);
        assert!(writer.is_some(), "source should be open and endless");
    }

    /// True once the reader side of an endless source has been dropped.
    pub async fn released(&self, id: &str) -> bool {
        let Some(mut writer) = self.writers.lock().await.remove(id) else {
            return false;
        };
        let empty_frame = Self::encode(&[(StreamKind::Stdout, "")]);
        let watch = async {
            loop {
                if writer.write_all(&empty_frame).await.is_err() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), watch)
            .await
            .is_ok()
    }
}

impl LogStreamProvider for FakeProvider {
    type Stream = FakeStream;

    async fn open(
        &self,
        source_id: &str,
        _options: &LogsOptions,
    ) -> Result<FakeStream, TransportError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        match self.sources.get(source_id) {
            Some(FakeSource::Finite(wire)) => {
                let (mut writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
                let wire = wire.clone();
                tokio::spawn(async move {
                    let _ = writer.write_all(&wire).await;
                });
                Ok(FramedRead::new(reader, MuxCodec::new()))
            }
            Some(FakeSource::Endless(wire)) => {
                let (mut writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
                writer
                    .write_all(wire)
                    .await
                    .expect("initial frames should fit the pipe");
                self.writers
                    .lock()
                    .await
                    .insert(source_id.to_string(), writer);
                Ok(FramedRead::new(reader, MuxCodec::new()))
            }
            Some(FakeSource::Fail) | None => Err(TransportError::Status {
                status: 404,
                message: format!("No such container: {source_id}"),
            }),
        }
    }
}

/// Receive until the channel closes, rendering each line as `source:text`.
pub(crate) async fn collect(rx: &mut LineReceiver) -> Vec<String> {
    let drain = async {
        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line.to_string());
        }
        lines
    };
    tokio::time::timeout(Duration::from_secs(5), drain)
        .await
        .expect("channel should close")
}
