use fxgate_core::{HistoricalQuery, RateProvider, Settings};
use serde::Serialize;
use serde_json::Value;

use crate::cli::HistoryArgs;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct PageInfo {
    last_page: u32,
    has_next: bool,
}

pub async fn run(
    args: &HistoryArgs,
    settings: &Settings,
    provider: &dyn RateProvider,
) -> Result<Value, CliError> {
    let page_size = args
        .page_size
        .unwrap_or(settings.pagination.default_page_size);
    let query = HistoricalQuery::new(&args.base, &args.start, &args.end)
        .with_page(args.page, page_size);

    let page = provider.historical_rates(query).await?;
    let info = PageInfo {
        last_page: page.last_page(),
        has_next: page.page < page.last_page(),
    };

    let mut data = serde_json::to_value(&page)?;
    if let Value::Object(map) = &mut data {
        map.insert(String::from("pagination"), serde_json::to_value(info)?);
    }
    Ok(data)
}
