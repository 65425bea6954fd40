use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use time::Date;
use tracing::debug;

use super::{decode_mapping, decode_response, UpstreamError};
use crate::config::UpstreamSettings;
use crate::domain::{format_iso_date, parse_iso_date};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{CurrencyCode, HistoricalSeries, RateSnapshot, RateTable, ValidationError};

/// Client for the Frankfurter exchange-rate API.
///
/// | Method | Resource |
/// |--------|----------|
/// | [`currencies`](Self::currencies) | `GET {api_url}/currencies` |
/// | [`latest`](Self::latest) | `GET {api_url}/latest?base=` |
/// | [`latest_for`](Self::latest_for) | `GET {api_url}/latest?base=&symbols=` |
/// | [`historical`](Self::historical) | `GET {history_url}/{start}..{end}?base=` |
#[derive(Clone)]
pub struct FrankfurterClient {
    http: Arc<dyn HttpClient>,
    settings: UpstreamSettings,
}

impl FrankfurterClient {
    pub fn new(http: Arc<dyn HttpClient>, settings: UpstreamSettings) -> Self {
        Self { http, settings }
    }

    pub fn settings(&self) -> &UpstreamSettings {
        &self.settings
    }

    /// Currency code to display name.
    pub async fn currencies(&self) -> Result<BTreeMap<CurrencyCode, String>, UpstreamError> {
        let request = self.request(format!("{}/currencies", trim_base(&self.settings.api_url)));
        let raw: BTreeMap<String, String> = decode_mapping(self.http.execute(request).await)?;

        raw.into_iter()
            .map(|(code, name)| {
                CurrencyCode::parse(&code)
                    .map(|code| (code, name))
                    .map_err(malformed)
            })
            .collect()
    }

    pub async fn latest(&self, base: &CurrencyCode) -> Result<RateSnapshot, UpstreamError> {
        self.latest_for(base, &[]).await
    }

    /// Latest rates for `base`, restricted to `symbols` when non-empty.
    pub async fn latest_for(
        &self,
        base: &CurrencyCode,
        symbols: &[CurrencyCode],
    ) -> Result<RateSnapshot, UpstreamError> {
        let mut request = self
            .request(format!("{}/latest", trim_base(&self.settings.api_url)))
            .with_query("base", base.as_str());
        if !symbols.is_empty() {
            let joined = symbols
                .iter()
                .map(CurrencyCode::as_str)
                .collect::<Vec<_>>()
                .join(",");
            request = request.with_query("symbols", &joined);
        }

        let payload: LatestPayload = decode_response(self.http.execute(request).await)?;
        payload.into_snapshot(base)
    }

    /// Full daily series for `base` over `[start, end]`.
    pub async fn historical(
        &self,
        base: &CurrencyCode,
        start: Date,
        end: Date,
    ) -> Result<HistoricalSeries, UpstreamError> {
        let request = self
            .request(format!(
                "{}/{}..{}",
                trim_base(&self.settings.history_url),
                format_iso_date(start),
                format_iso_date(end)
            ))
            .with_query("base", base.as_str());

        let payload: SeriesPayload = decode_response(self.http.execute(request).await)?;
        let series = payload.into_series(base)?;
        debug!(
            base = %series.base,
            dates = series.date_count(),
            "decoded historical series"
        );
        Ok(series)
    }

    fn request(&self, url: String) -> HttpRequest {
        HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_timeout_ms(self.settings.timeout_ms)
    }
}

#[derive(Debug, Deserialize)]
struct LatestPayload {
    #[serde(default = "one")]
    amount: Decimal,
    base: String,
    date: String,
    rates: BTreeMap<String, Decimal>,
}

impl LatestPayload {
    fn into_snapshot(self, requested: &CurrencyCode) -> Result<RateSnapshot, UpstreamError> {
        let base = answered_base(&self.base, requested)?;
        let date = parse_iso_date(&self.date).map_err(malformed)?;
        let rates = rate_table(self.rates)?;
        RateSnapshot::new(self.amount, base, date, rates).map_err(malformed)
    }
}

#[derive(Debug, Deserialize)]
struct SeriesPayload {
    #[serde(default = "one")]
    amount: Decimal,
    base: String,
    start_date: String,
    end_date: String,
    rates: BTreeMap<String, BTreeMap<String, Decimal>>,
}

impl SeriesPayload {
    fn into_series(self, requested: &CurrencyCode) -> Result<HistoricalSeries, UpstreamError> {
        let base = answered_base(&self.base, requested)?;
        let start = parse_iso_date(&self.start_date).map_err(malformed)?;
        let end = parse_iso_date(&self.end_date).map_err(malformed)?;

        let mut days = BTreeMap::new();
        for (day, table) in self.rates {
            days.insert(day, rate_table(table)?);
        }

        HistoricalSeries::new(self.amount, base, start, end, days).map_err(malformed)
    }
}

/// The payload must be quoted against the base that was asked for.
fn answered_base(raw: &str, requested: &CurrencyCode) -> Result<CurrencyCode, UpstreamError> {
    let base = CurrencyCode::parse(raw).map_err(malformed)?;
    if base != *requested {
        return Err(UpstreamError::malformed(format!(
            "response quoted against {base}, expected {requested}"
        )));
    }
    Ok(base)
}

fn rate_table(raw: BTreeMap<String, Decimal>) -> Result<RateTable, UpstreamError> {
    raw.into_iter()
        .map(|(code, factor)| {
            CurrencyCode::parse(&code)
                .map(|code| (code, factor))
                .map_err(malformed)
        })
        .collect()
}

fn malformed(error: ValidationError) -> UpstreamError {
    UpstreamError::malformed(format!("response failed validation: {error}"))
}

fn one() -> Decimal {
    Decimal::ONE
}

fn trim_base(url: &str) -> &str {
    url.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, ScriptedHttpClient};
    use crate::upstream::UpstreamErrorKind;
    use rust_decimal_macros::dec;
    use time::macros::date;

    fn code(value: &str) -> CurrencyCode {
        CurrencyCode::parse(value).expect("valid code")
    }

    fn client_with(http: Arc<ScriptedHttpClient>) -> FrankfurterClient {
        let settings = UpstreamSettings {
            api_url: String::from("https://rates.test/v1/"),
            history_url: String::from("https://history.test"),
            timeout_ms: 1_500,
        };
        FrankfurterClient::new(http, settings)
    }

    #[tokio::test]
    async fn latest_builds_url_and_decodes_snapshot() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(
            r#"{"amount":1.0,"base":"EUR","date":"2024-01-03","rates":{"USD":1.0944,"GBP":0.8612}}"#,
        );
        let client = client_with(Arc::clone(&http));

        let snapshot = client
            .latest_for(&code("EUR"), &[code("USD"), code("GBP")])
            .await
            .expect("snapshot decodes");

        assert_eq!(snapshot.base, code("EUR"));
        assert_eq!(snapshot.date, date!(2024 - 01 - 03));
        assert_eq!(snapshot.rate(&code("USD")), Some(dec!(1.0944)));

        let requests = http.recorded_requests();
        assert_eq!(
            requests[0].url,
            "https://rates.test/v1/latest?base=EUR&symbols=USD%2CGBP"
        );
        assert_eq!(requests[0].timeout_ms, 1_500);
    }

    #[tokio::test]
    async fn response_keys_are_case_tolerant() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(r#"{"Amount":1,"BASE":"usd","Date":"2024-02-01","Rates":{"eur":0.92}}"#);
        let client = client_with(http);

        let snapshot = client.latest(&code("USD")).await.expect("decodes");
        assert_eq!(snapshot.base, code("USD"));
        assert_eq!(snapshot.rate(&code("EUR")), Some(dec!(0.92)));
    }

    #[tokio::test]
    async fn invalid_payloads_are_malformed() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(r#"{"base":"EUR","date":"yesterday","rates":{"USD":1.1}}"#)
            .push_json(r#"{"base":"EUR","date":"2024-01-03","rates":{"USD":-1}}"#)
            .push_json(r#"{"base":"EUR","date":"2024-01-03","rates":{"DOLLARS":1.1}}"#);
        let client = client_with(http);

        for _ in 0..3 {
            let error = client.latest(&code("EUR")).await.expect_err("must fail");
            assert_eq!(error.kind(), UpstreamErrorKind::Malformed);
        }
    }

    #[tokio::test]
    async fn historical_uses_history_host_and_range_path() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(
            r#"{"amount":1.0,"base":"EUR","start_date":"2024-01-01","end_date":"2024-01-03",
                "rates":{"2024-01-02":{"USD":1.12},"2024-01-03":{"USD":1.15}}}"#,
        );
        let client = client_with(Arc::clone(&http));

        let series = client
            .historical(&code("EUR"), date!(2024 - 01 - 01), date!(2024 - 01 - 03))
            .await
            .expect("series decodes");

        assert_eq!(series.date_count(), 2);
        assert_eq!(
            http.recorded_requests()[0].url,
            "https://history.test/2024-01-01..2024-01-03?base=EUR"
        );
    }

    #[tokio::test]
    async fn historical_rejects_bad_date_keys() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(
            r#"{"amount":1.0,"base":"EUR","start_date":"2024-01-01","end_date":"2024-01-03",
                "rates":{"01/02/2024":{"USD":1.12}}}"#,
        );
        let client = client_with(http);

        let error = client
            .historical(&code("EUR"), date!(2024 - 01 - 01), date!(2024 - 01 - 03))
            .await
            .expect_err("must fail");
        assert_eq!(error.kind(), UpstreamErrorKind::Malformed);
    }

    #[tokio::test]
    async fn currencies_normalize_codes() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(r#"{"EUR":"Euro","usd":"United States Dollar"}"#);
        let client = client_with(Arc::clone(&http));

        let currencies = client.currencies().await.expect("decodes");
        assert_eq!(currencies.len(), 2);
        assert_eq!(
            currencies.get(&code("USD")).map(String::as_str),
            Some("United States Dollar")
        );
        assert_eq!(http.recorded_requests()[0].url, "https://rates.test/v1/currencies");
    }

    #[tokio::test]
    async fn transport_and_status_failures_are_classified() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push(Err(HttpError::timeout("deadline elapsed")))
            .push_status(502)
            .push_status(404);
        let client = client_with(http);

        let kinds = [
            client.latest(&code("EUR")).await.expect_err("timeout").kind(),
            client.latest(&code("EUR")).await.expect_err("502").kind(),
            client.latest(&code("EUR")).await.expect_err("404").kind(),
        ];
        assert_eq!(
            kinds,
            [
                UpstreamErrorKind::Unavailable,
                UpstreamErrorKind::Unavailable,
                UpstreamErrorKind::Rejected
            ]
        );
    }

    #[tokio::test]
    async fn latest_without_rates_is_malformed_not_empty() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(r#"{"amount":1.0,"base":"EUR","date":"2024-01-03"}"#);
        let client = client_with(http);

        let error = client.latest(&code("EUR")).await.expect_err("must fail");
        assert_eq!(error.kind(), UpstreamErrorKind::Malformed);
    }

    #[tokio::test]
    async fn series_without_rates_is_malformed_not_empty() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(
            r#"{"amount":1.0,"base":"EUR","start_date":"2024-01-01","end_date":"2024-01-03"}"#,
        );
        let client = client_with(http);

        let error = client
            .historical(&code("EUR"), date!(2024 - 01 - 01), date!(2024 - 01 - 03))
            .await
            .expect_err("must fail");
        assert_eq!(error.kind(), UpstreamErrorKind::Malformed);
    }

    #[tokio::test]
    async fn answer_for_another_base_is_malformed() {
        let http = Arc::new(ScriptedHttpClient::new());
        http.push_json(r#"{"amount":1.0,"base":"USD","date":"2024-01-03","rates":{"EUR":0.91}}"#)
            .push_json(
                r#"{"amount":1.0,"base":"USD","start_date":"2024-01-01","end_date":"2024-01-02",
                    "rates":{"2024-01-02":{"EUR":0.91}}}"#,
            );
        let client = client_with(http);

        let latest = client.latest(&code("EUR")).await.expect_err("wrong base");
        assert_eq!(latest.kind(), UpstreamErrorKind::Malformed);
        let series = client
            .historical(&code("EUR"), date!(2024 - 01 - 01), date!(2024 - 01 - 02))
            .await
            .expect_err("wrong base");
        assert_eq!(series.kind(), UpstreamErrorKind::Malformed);
    }
}
