use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{cache_key, CacheStore};
use crate::config::{CacheSettings, Settings};
use crate::domain::{format_iso_date, parse_iso_date};
use crate::http_client::HttpClient;
use crate::pagination::{HistoricalPaginator, MAX_PAGE_SIZE};
use crate::rate_provider::{HistoricalQuery, RateError, RateFuture, RateProvider};
use crate::resilience::ResiliencePolicy;
use crate::upstream::{FrankfurterClient, UpstreamEndpoint};
use crate::{
    ConversionResult, CurrencyCode, ExclusionSet, HistoricalPage, HistoricalSeries, PageRequest,
    ProviderId, RateSnapshot, ValidationError,
};

/// Rate provider backed by the Frankfurter API.
///
/// Every operation normalizes and screens its currency inputs, then reads
/// through the cache and falls back to the upstream under the resilience
/// policy.
pub struct FrankfurterProvider {
    client: FrankfurterClient,
    policy: ResiliencePolicy,
    cache: CacheStore,
    ttl: CacheSettings,
    exclusions: ExclusionSet,
    max_page_size: u32,
}

impl FrankfurterProvider {
    pub fn new(client: FrankfurterClient, policy: ResiliencePolicy, cache: CacheStore) -> Self {
        Self {
            client,
            policy,
            cache,
            ttl: CacheSettings::default(),
            exclusions: ExclusionSet::default(),
            max_page_size: MAX_PAGE_SIZE,
        }
    }

    /// Wire a provider from validated settings over the given transport.
    pub fn from_settings(
        settings: &Settings,
        http: Arc<dyn HttpClient>,
    ) -> Result<Self, ValidationError> {
        settings.validate()?;
        let client = FrankfurterClient::new(http, settings.upstream.clone());
        let policy = ResiliencePolicy::new(
            settings.resilience.retry_config(),
            settings.resilience.breaker_config(),
        );

        Ok(Self::new(client, policy, CacheStore::new())
            .with_cache_settings(settings.cache)
            .with_exclusions(settings.exclusion_set()?)
            .with_max_page_size(settings.pagination.max_page_size))
    }

    pub fn with_cache_settings(mut self, ttl: CacheSettings) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionSet) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    pub fn policy(&self) -> &ResiliencePolicy {
        &self.policy
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    fn currency(&self, raw: &str) -> Result<CurrencyCode, RateError> {
        let code = CurrencyCode::parse(raw)?;
        if self.exclusions.contains(&code) {
            return Err(RateError::unsupported_currency(&code));
        }
        Ok(code)
    }

    async fn fetch_currencies(&self) -> BTreeMap<CurrencyCode, String> {
        let key = cache_key("currencies", &[]);
        let currencies = match self.cache.get::<BTreeMap<CurrencyCode, String>>(&key).await {
            Some(cached) => cached,
            None => {
                let fetched = self
                    .policy
                    .execute(UpstreamEndpoint::Currencies, || self.client.currencies())
                    .await;
                match fetched {
                    Ok(currencies) => {
                        self.cache
                            .set(&key, &currencies, self.ttl.currencies_ttl())
                            .await;
                        currencies
                    }
                    Err(error) => {
                        warn!(%error, "currency list unavailable, returning empty list");
                        return BTreeMap::new();
                    }
                }
            }
        };

        currencies
            .into_iter()
            .filter(|(code, _)| !self.exclusions.contains(code))
            .collect()
    }

    async fn fetch_latest(&self, base: &str) -> Result<RateSnapshot, RateError> {
        let base = self.currency(base)?;
        let key = cache_key("latest", &[base.as_str()]);
        if let Some(snapshot) = self.cache.get::<RateSnapshot>(&key).await {
            return Ok(snapshot);
        }

        let snapshot = self
            .policy
            .execute(UpstreamEndpoint::Latest, || self.client.latest(&base))
            .await?;
        self.cache.set(&key, &snapshot, self.ttl.latest_ttl()).await;
        Ok(snapshot)
    }

    /// Cached by base only; a cached snapshot without `target` counts as a
    /// miss and is replaced by the fresh answer.
    async fn fetch_conversion(
        &self,
        base: &str,
        target: &str,
    ) -> Result<ConversionResult, RateError> {
        let base = self.currency(base)?;
        let target = self.currency(target)?;
        let key = cache_key("convert", &[base.as_str()]);

        if let Some(snapshot) = self.cache.get::<RateSnapshot>(&key).await {
            if snapshot.rate(&target).is_some() {
                return ConversionResult::new(snapshot, target.clone())
                    .map_err(|_| RateError::conversion_invalid(&base, &target));
            }
            debug!(%base, %target, "cached conversion lacks target, refetching");
        }

        let symbols = [target.clone()];
        let snapshot = self
            .policy
            .execute(UpstreamEndpoint::Latest, || {
                self.client.latest_for(&base, &symbols)
            })
            .await?;

        let result = ConversionResult::new(snapshot, target.clone())
            .map_err(|_| RateError::conversion_invalid(&base, &target))?;
        self.cache
            .set(&key, &result.snapshot, self.ttl.convert_ttl())
            .await;
        Ok(result)
    }

    async fn fetch_historical(&self, query: HistoricalQuery) -> Result<HistoricalPage, RateError> {
        let base = self.currency(&query.base)?;
        let start = parse_iso_date(&query.start_date)?;
        let end = parse_iso_date(&query.end_date)?;
        if start > end {
            return Err(ValidationError::InvertedDateRange {
                start: format_iso_date(start),
                end: format_iso_date(end),
            }
            .into());
        }
        let request = PageRequest::new(query.page, query.page_size, self.max_page_size)?;

        let start_key = format_iso_date(start);
        let end_key = format_iso_date(end);
        let key = cache_key("historical", &[base.as_str(), &start_key, &end_key]);

        let series = match self.cache.get::<HistoricalSeries>(&key).await {
            Some(series) => series,
            None => {
                let series = self
                    .policy
                    .execute(UpstreamEndpoint::Historical, || {
                        self.client.historical(&base, start, end)
                    })
                    .await?;
                self.cache
                    .set(&key, &series, self.ttl.historical_ttl())
                    .await;
                series
            }
        };

        Ok(HistoricalPaginator::paginate(&series, request))
    }
}

impl RateProvider for FrankfurterProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Frankfurter
    }

    fn list_currencies<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = BTreeMap<CurrencyCode, String>> + Send + 'a>> {
        Box::pin(self.fetch_currencies())
    }

    fn latest_rates<'a>(&'a self, base: &'a str) -> RateFuture<'a, RateSnapshot> {
        Box::pin(self.fetch_latest(base))
    }

    fn convert<'a>(&'a self, base: &'a str, target: &'a str) -> RateFuture<'a, ConversionResult> {
        Box::pin(self.fetch_conversion(base, target))
    }

    fn historical_rates<'a>(&'a self, query: HistoricalQuery) -> RateFuture<'a, HistoricalPage> {
        Box::pin(self.fetch_historical(query))
    }
}
