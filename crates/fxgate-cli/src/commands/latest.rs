use fxgate_core::RateProvider;
use serde_json::Value;

use crate::cli::LatestArgs;
use crate::error::CliError;

pub async fn run(args: &LatestArgs, provider: &dyn RateProvider) -> Result<Value, CliError> {
    let snapshot = provider.latest_rates(&args.base).await?;
    Ok(serde_json::to_value(snapshot)?)
}
