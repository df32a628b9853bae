use logweave_session::{stream_to_console, ConsoleSink, PipelineConfig, SessionError};
use logweave_transport::{DockerEngine, TlsSettings};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cmd::LogsArgs;
use crate::exit::{
    io_error, session_error, transport_error, CliResult, FAILURE, INTERRUPTED, SUCCESS,
};

pub fn run(args: LogsArgs) -> CliResult<i32> {
    let options = args.options();
    let config = PipelineConfig::default();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;

    runtime.block_on(async {
        let provider = DockerEngine::connect(&args.host, &TlsSettings::from_env())
            .map_err(|err| transport_error("cannot use docker host", err))?
            .negotiate()
            .await
            .map_err(|err| transport_error("cannot reach docker engine", err))?;

        let token = CancellationToken::new();
        let interrupt = tokio::spawn(cancel_on_interrupt(token.clone()));

        let mut sink = ConsoleSink::stdio();
        let result =
            stream_to_console(&provider, &args.ids, &options, &token, &mut sink, &config).await;
        interrupt.abort();

        match result {
            Ok(report) if report.is_ok() => Ok(SUCCESS),
            Ok(_) => Ok(FAILURE),
            Err(SessionError::Cancelled) => Ok(INTERRUPTED),
            Err(err) => Err(session_error("setup failed", err)),
        }
    })
}

async fn cancel_on_interrupt(token: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("interrupt received, shutting down");
            token.cancel();
        }
        Err(err) => warn!(error = %err, "signal handler setup failed"),
    }
}
