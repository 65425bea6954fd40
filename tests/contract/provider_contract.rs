use std::sync::Arc;

use fxgate_core::{
    HistoricalQuery, ProviderId, ProviderRegistry, RateErrorKind, RateProvider,
    ScriptedHttpClient, Settings,
};

struct ProviderCase {
    id: ProviderId,
    http: Arc<ScriptedHttpClient>,
    provider: Arc<dyn RateProvider>,
}

fn fast_settings() -> Settings {
    let mut settings = Settings::default();
    settings.resilience.retry_delay_ms = 0;
    settings
}

fn provider_cases() -> Vec<ProviderCase> {
    ProviderId::ALL
        .into_iter()
        .map(|id| {
            let http = Arc::new(ScriptedHttpClient::new());
            let registry = ProviderRegistry::with_http_client(&fast_settings(), http.clone())
                .expect("default settings are valid");
            let provider = registry
                .resolve(id.as_str())
                .unwrap_or_else(|error| panic!("provider '{id}' must be registered: {error}"));
            ProviderCase { id, http, provider }
        })
        .collect()
}

#[test]
fn every_provider_id_resolves_to_a_provider_with_that_id() {
    for case in provider_cases() {
        assert_eq!(case.provider.id(), case.id, "provider '{}': id", case.id);
    }
}

#[test]
fn unknown_provider_names_are_rejected() {
    let registry = ProviderRegistry::with_http_client(
        &Settings::default(),
        Arc::new(ScriptedHttpClient::new()),
    )
    .expect("default settings are valid");

    for name in ["nope", "", "frankfurter2", "ecb"] {
        let error = registry.resolve(name).err().expect("unknown name must fail");
        assert_eq!(error.kind(), RateErrorKind::UnknownProvider, "name '{name}'");
    }
}

#[tokio::test]
async fn excluded_currencies_are_rejected_before_any_upstream_call() {
    for case in provider_cases() {
        for code in ["TRY", "pln", " thb ", "Mxn"] {
            let latest = case.provider.latest_rates(code).await.expect_err("excluded");
            assert_eq!(
                latest.kind(),
                RateErrorKind::UnsupportedCurrency,
                "provider '{}': latest {code}",
                case.id
            );

            let convert = case.provider.convert("EUR", code).await.expect_err("excluded");
            assert_eq!(
                convert.kind(),
                RateErrorKind::UnsupportedCurrency,
                "provider '{}': convert {code}",
                case.id
            );

            let history = case
                .provider
                .historical_rates(HistoricalQuery::new(code, "2024-01-01", "2024-01-05"))
                .await
                .expect_err("excluded");
            assert_eq!(
                history.kind(),
                RateErrorKind::UnsupportedCurrency,
                "provider '{}': history {code}",
                case.id
            );
        }

        assert_eq!(case.http.call_count(), 0, "provider '{}': upstream calls", case.id);
    }
}

#[tokio::test]
async fn malformed_currency_codes_are_invalid_requests() {
    for case in provider_cases() {
        for code in ["", "EU", "EURO", "12$"] {
            let error = case.provider.latest_rates(code).await.expect_err("malformed");
            assert_eq!(
                error.kind(),
                RateErrorKind::InvalidRequest,
                "provider '{}': code '{code}'",
                case.id
            );
        }
    }
}

#[tokio::test]
async fn currency_list_degrades_to_empty_when_upstream_is_down() {
    for case in provider_cases() {
        let currencies = case.provider.list_currencies().await;
        assert!(currencies.is_empty(), "provider '{}'", case.id);
    }
}
