mod cli;
mod commands;
mod error;
mod metadata;
mod output;
mod telemetry;

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info_span, Instrument};

use crate::cli::Cli;
use crate::error::CliError;
use crate::metadata::RequestId;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.log_json);

    let request_id = RequestId::new_v4();
    let span = info_span!(
        "fxgate",
        request_id = %request_id,
        command = cli.command.name(),
        provider = %cli.provider
    );

    match run(&cli, request_id).instrument(span).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(request_id = %request_id, code = err.code(), "command failed: {err}");
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: &Cli, request_id: RequestId) -> Result<(), CliError> {
    let settings = commands::load_settings(cli)?;
    let envelope = commands::run(cli, &settings, request_id).await?;
    output::render(&envelope, cli.pretty)
}
