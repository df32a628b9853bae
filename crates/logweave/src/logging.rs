use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// The engine client's HTTP stack is chatty below warn.
const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "hyper_util=warn", "rustls=warn"];

/// A non-empty, valid `RUST_LOG` wins over `--log-level`.
pub fn build_filter(rust_log: Option<&str>, level: LogLevel) -> EnvFilter {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        match EnvFilter::try_new(directives) {
            Ok(filter) => return filter,
            Err(err) => eprintln!("warning: ignoring invalid RUST_LOG {directives:?}: {err}"),
        }
    }

    let mut directives = vec![level.directive()];
    directives.extend_from_slice(QUIET_DEPENDENCIES);
    EnvFilter::new(directives.join(","))
}

/// Operational logs go to stderr, next to the merged secondary output.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(build_filter(rust_log.as_deref(), level))
        .with_ansi(false)
        .with_target(rust_log.is_some());

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
