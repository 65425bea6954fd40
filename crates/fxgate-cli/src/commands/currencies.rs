use fxgate_core::RateProvider;
use serde_json::Value;

use crate::error::CliError;

pub async fn run(provider: &dyn RateProvider) -> Result<Value, CliError> {
    let currencies = provider.list_currencies().await;
    Ok(serde_json::to_value(currencies)?)
}
