//! # fxgate Core
//!
//! Exchange-rate retrieval with caching and resilience.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | In-memory TTL cache for decoded upstream payloads |
//! | [`circuit_breaker`] | Per-endpoint circuit breaker with injectable clock |
//! | [`config`] | Layered runtime settings |
//! | [`domain`] | Currency codes, rate snapshots, series and pages |
//! | [`error`] | Validation and core errors |
//! | [`http_client`] | Transport abstraction (reqwest and scripted) |
//! | [`pagination`] | Newest-first slicing of historical series |
//! | [`providers`] | Concrete rate providers |
//! | [`rate_provider`] | Provider contract and caller-facing errors |
//! | [`registry`] | Provider lookup by name |
//! | [`resilience`] | Retry composed with circuit breakers |
//! | [`retry`] | Retry and backoff configuration |
//! | [`upstream`] | Upstream API client and error taxonomy |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fxgate_core::{ProviderRegistry, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load(None)?;
//!     let registry = ProviderRegistry::from_settings(&settings)?;
//!     let provider = registry.resolve("frankfurter")?;
//!
//!     let snapshot = provider.latest_rates("eur").await?;
//!     println!("{} rates on {}", snapshot.rates.len(), snapshot.date);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ ProviderRegistry │
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │  RateProvider    │────▶│   CacheStore     │
//! └────────┬─────────┘     └──────────────────┘
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ ResiliencePolicy │────▶│ Circuit Breakers │
//! └────────┬─────────┘     └──────────────────┘
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ Upstream Client  │────▶│   HttpClient     │
//! └──────────────────┘     └──────────────────┘
//! ```

pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod pagination;
pub mod providers;
pub mod rate_provider;
pub mod registry;
pub mod resilience;
pub mod retry;
pub mod upstream;

pub use cache::{cache_key, CacheStore};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, Clock, ManualClock, SystemClock,
};
pub use config::{
    BackoffKind, CacheSettings, PaginationSettings, ResilienceSettings, Settings, UpstreamSettings,
};
pub use domain::*;
pub use error::{CoreError, ValidationError};
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient, ScriptedHttpClient,
};
pub use pagination::{HistoricalPaginator, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use providers::FrankfurterProvider;
pub use rate_provider::{
    ErrorCategory, HistoricalQuery, RateError, RateErrorKind, RateFuture, RateProvider,
};
pub use registry::{ProviderId, ProviderRegistry, ProviderRegistryBuilder};
pub use resilience::ResiliencePolicy;
pub use retry::{Backoff, RetryConfig};
pub use upstream::{
    FrankfurterClient, UpstreamEndpoint, UpstreamError, UpstreamErrorKind, TRANSIENT_STATUSES,
};
