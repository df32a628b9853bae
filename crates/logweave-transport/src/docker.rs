use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bollard::container::{InspectContainerOptions, LogOutput};
use bollard::{Docker, API_DEFAULT_VERSION};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use logweave_frame::{Frame, FrameError, StreamKind};
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::options::{LogsOptions, DEFAULT_DOCKER_HOST};
use crate::traits::LogStreamProvider;

/// Seconds to wait for the engine to answer a request.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Decoded log stream of one source. Dropping it closes the request.
pub type LogStream = BoxStream<'static, logweave_frame::Result<Frame>>;

/// Where the engine listens, parsed from a `DOCKER_HOST`-style URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `unix:///path/to/docker.sock`
    Unix(PathBuf),
    /// `tcp://host:port`, `http://host:port` or `https://host:port`.
    Tcp {
        addr: String,
        /// The scheme itself asks for TLS (`https://`).
        https: bool,
    },
}

impl Endpoint {
    pub fn parse(host: &str) -> Result<Self> {
        let unsupported = || TransportError::UnsupportedHost(host.to_string());
        if let Some(path) = host.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(unsupported());
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        for (scheme, https) in [("tcp://", false), ("http://", false), ("https://", true)] {
            if let Some(rest) = host.strip_prefix(scheme) {
                if rest.is_empty() {
                    return Err(unsupported());
                }
                return Ok(Self::Tcp {
                    addr: host.to_string(),
                    https,
                });
            }
        }
        Err(unsupported())
    }
}

/// Client certificate settings, read from `DOCKER_TLS_VERIFY` and
/// `DOCKER_CERT_PATH` the way the docker CLI reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSettings {
    /// Verify the engine and present a client certificate on TCP hosts.
    pub verify: bool,
    /// Directory holding `key.pem`, `cert.pem` and `ca.pem`.
    pub cert_dir: Option<PathBuf>,
}

impl TlsSettings {
    pub fn from_env() -> Self {
        let verify = std::env::var("DOCKER_TLS_VERIFY").ok();
        let cert_path = std::env::var("DOCKER_CERT_PATH").ok();
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self::from_vars(verify.as_deref(), cert_path.as_deref(), home.as_deref())
    }

    /// Any non-empty `DOCKER_TLS_VERIFY` turns verification on. The
    /// certificate directory falls back to `~/.docker`.
    pub fn from_vars(verify: Option<&str>, cert_path: Option<&str>, home: Option<&Path>) -> Self {
        let verify = verify.is_some_and(|v| !v.is_empty());
        let cert_dir = match cert_path {
            Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
            _ => home.map(|home| home.join(".docker")),
        };
        Self { verify, cert_dir }
    }
}

/// Docker Engine API client.
///
/// Cloning is cheap and clones share the underlying connection pool, so one
/// engine can serve any number of concurrent sources.
#[derive(Clone)]
pub struct DockerEngine {
    docker: Docker,
    host: String,
}

impl std::fmt::Debug for DockerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerEngine")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl DockerEngine {
    /// Client for the engine at `host`. No request is made yet.
    pub fn connect(host: &str, tls: &TlsSettings) -> Result<Self> {
        let docker = match Endpoint::parse(host)? {
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let path = path.to_string_lossy();
                Docker::connect_with_unix(&path, REQUEST_TIMEOUT_SECS, API_DEFAULT_VERSION)?
            }
            #[cfg(not(unix))]
            Endpoint::Unix(_) => return Err(TransportError::UnsupportedHost(host.to_string())),
            Endpoint::Tcp { addr, https } if https || tls.verify => {
                let dir = tls.cert_dir.as_deref().ok_or_else(|| {
                    TransportError::InvalidRequest(
                        "TLS requested but no certificate directory (set DOCKER_CERT_PATH)"
                            .to_string(),
                    )
                })?;
                Docker::connect_with_ssl(
                    &addr,
                    &dir.join("key.pem"),
                    &dir.join("cert.pem"),
                    &dir.join("ca.pem"),
                    REQUEST_TIMEOUT_SECS,
                    API_DEFAULT_VERSION,
                )?
            }
            Endpoint::Tcp { addr, .. } => {
                Docker::connect_with_http(&addr, REQUEST_TIMEOUT_SECS, API_DEFAULT_VERSION)?
            }
        };
        debug!(host, tls = tls.verify, "docker client configured");
        Ok(Self {
            docker,
            host: host.to_string(),
        })
    }

    /// Client for `DOCKER_HOST` (or the default socket) with TLS settings
    /// from the environment.
    pub fn from_env() -> Result<Self> {
        let host = match std::env::var("DOCKER_HOST") {
            Ok(host) if !host.is_empty() => host,
            _ => DEFAULT_DOCKER_HOST.to_string(),
        };
        Self::connect(&host, &TlsSettings::from_env())
    }

    /// Settle on the highest API version both sides speak. This is the
    /// first request sent, so it also proves the engine is reachable.
    pub async fn negotiate(self) -> Result<Self> {
        let docker = self.docker.negotiate_version().await?;
        debug!(host = %self.host, "negotiated engine API version");
        Ok(Self {
            docker,
            host: self.host,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl LogStreamProvider for DockerEngine {
    type Stream = LogStream;

    async fn open(&self, source_id: &str, options: &LogsOptions) -> Result<LogStream> {
        if source_id.is_empty() {
            return Err(TransportError::InvalidRequest("empty source id".to_string()));
        }
        let query = options.to_query(SystemTime::now())?;
        if options.details {
            warn!(
                source = source_id,
                "record details are not available from this engine client; ignoring"
            );
        }

        let info = self
            .docker
            .inspect_container(source_id, None::<InspectContainerOptions>)
            .await?;
        if info.config.and_then(|config| config.tty).unwrap_or(false) {
            warn!(
                source = source_id,
                "source uses a TTY; all of its output arrives on stdout"
            );
        }

        let stream = self
            .docker
            .logs(source_id, Some(query))
            .map(|item| {
                item.map(frame_from_output)
                    .map_err(|err| FrameError::Source(Box::new(TransportError::from(err))))
            })
            .boxed();
        debug!(source = source_id, "log stream opened");
        Ok(stream)
    }
}

fn frame_from_output(output: LogOutput) -> Frame {
    match output {
        LogOutput::StdIn { message } => Frame::new(StreamKind::Stdin, message),
        LogOutput::StdOut { message } | LogOutput::Console { message } => {
            Frame::new(StreamKind::Stdout, message)
        }
        LogOutput::StdErr { message } => Frame::new(StreamKind::Stderr, message),
    }
}
