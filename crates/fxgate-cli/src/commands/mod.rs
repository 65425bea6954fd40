mod convert;
mod currencies;
mod history;
mod latest;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fxgate_core::{ProviderRegistry, RateProvider, Settings};
use serde_json::Value;
use tracing::info;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::{Envelope, Metadata, RequestId};

/// Settings from defaults, the config file, the environment, then flags.
pub fn load_settings(cli: &Cli) -> Result<Settings, CliError> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os("FXGATE_CONFIG").map(PathBuf::from));

    let mut settings = Settings::load(path.as_deref())?;
    if let Some(timeout_ms) = cli.timeout_ms {
        settings.upstream.timeout_ms = timeout_ms;
    }
    settings.validate().map_err(fxgate_core::CoreError::from)?;
    Ok(settings)
}

pub async fn run(
    cli: &Cli,
    settings: &Settings,
    request_id: RequestId,
) -> Result<Envelope<Value>, CliError> {
    let registry = ProviderRegistry::from_settings(settings)?;
    let provider = registry.resolve(&cli.provider)?;
    dispatch(cli, settings, provider, request_id).await
}

/// Run the selected command against an already resolved provider.
pub async fn dispatch(
    cli: &Cli,
    settings: &Settings,
    provider: Arc<dyn RateProvider>,
    request_id: RequestId,
) -> Result<Envelope<Value>, CliError> {
    let started = Instant::now();

    let data = match &cli.command {
        Command::Currencies => currencies::run(provider.as_ref()).await?,
        Command::Latest(args) => latest::run(args, provider.as_ref()).await?,
        Command::Convert(args) => convert::run(args, provider.as_ref()).await?,
        Command::History(args) => history::run(args, settings, provider.as_ref()).await?,
    };

    let latency_ms = started.elapsed().as_millis() as u64;
    info!(
        command = cli.command.name(),
        provider = %provider.id(),
        latency_ms,
        "command completed"
    );

    Ok(Envelope {
        meta: Metadata {
            request_id,
            provider: provider.id(),
            command: cli.command.name().to_owned(),
            latency_ms,
        },
        data,
    })
}
