use clap::{Args, Subcommand};

use logweave_transport::{LogsOptions, DEFAULT_DOCKER_HOST};

use crate::exit::CliResult;

pub mod logs;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Follow the logs of one or more containers.
    Logs(LogsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command) -> CliResult<i32> {
    match command {
        Command::Logs(args) => logs::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Container ids or names.
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<String>,
    /// Docker Engine endpoint: unix://, tcp://, http:// or https://.
    /// TLS follows DOCKER_TLS_VERIFY and DOCKER_CERT_PATH.
    #[arg(long, env = "DOCKER_HOST", default_value = DEFAULT_DOCKER_HOST)]
    pub host: String,
    /// Skip the stdout substream.
    #[arg(long)]
    pub no_stdout: bool,
    /// Skip the stderr substream.
    #[arg(long)]
    pub no_stderr: bool,
    /// Only show logs since this timestamp or relative duration.
    #[arg(long, value_name = "WHEN")]
    pub since: Option<String>,
    /// Only show logs before this timestamp or relative duration.
    #[arg(long, value_name = "WHEN")]
    pub until: Option<String>,
    /// Do not prefix lines with their daemon timestamp.
    #[arg(long)]
    pub no_timestamps: bool,
    /// Print what is already logged and exit.
    #[arg(long)]
    pub no_follow: bool,
    /// Number of lines to show from the end of each log, or "all".
    #[arg(long, default_value = "10")]
    pub tail: String,
    /// Ask for extra attributes attached to each line (not supported by the
    /// engine client; a warning is logged).
    #[arg(long)]
    pub details: bool,
}

impl LogsArgs {
    pub fn options(&self) -> LogsOptions {
        LogsOptions {
            show_stdout: !self.no_stdout,
            show_stderr: !self.no_stderr,
            since: self.since.clone().unwrap_or_default(),
            until: self.until.clone().unwrap_or_default(),
            timestamps: !self.no_timestamps,
            follow: !self.no_follow,
            tail: self.tail.clone(),
            details: self.details,
        }
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
