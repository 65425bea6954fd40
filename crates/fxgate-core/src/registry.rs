//! Name-based lookup of rate providers.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Settings;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::providers::FrankfurterProvider;
use crate::rate_provider::{RateError, RateProvider};
use crate::{CoreError, ValidationError};

/// Closed set of rate sources this crate can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Frankfurter,
}

impl ProviderId {
    pub const ALL: [Self; 1] = [Self::Frankfurter];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Frankfurter => "frankfurter",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "frankfurter" => Ok(Self::Frankfurter),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}

/// Providers registered at startup, keyed by [`ProviderId`].
///
/// Lookups never fall back to another provider.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<ProviderId, Arc<dyn RateProvider>>,
}

impl ProviderRegistry {
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    /// Production registry over a reqwest transport.
    pub fn from_settings(settings: &Settings) -> Result<Self, CoreError> {
        Self::with_http_client(settings, Arc::new(ReqwestHttpClient::new()))
    }

    /// Registry whose providers share the given transport.
    pub fn with_http_client(
        settings: &Settings,
        http: Arc<dyn HttpClient>,
    ) -> Result<Self, CoreError> {
        let frankfurter = FrankfurterProvider::from_settings(settings, http)?;
        Ok(Self::builder().register(Arc::new(frankfurter)).build())
    }

    /// Find the provider registered under `name` (case-insensitive).
    ///
    /// # Errors
    ///
    /// `UnknownProvider` when the name is not a known id, or the id has no
    /// registered instance.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn RateProvider>, RateError> {
        let id = ProviderId::from_str(name).map_err(|_| RateError::unknown_provider(name))?;
        let provider = self
            .get(id)
            .ok_or_else(|| RateError::unknown_provider(name))?;
        debug!(provider = %id, "resolved rate provider");
        Ok(provider)
    }

    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn RateProvider>> {
        self.providers.get(&id).cloned()
    }

    pub fn ids(&self) -> Vec<ProviderId> {
        self.providers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[derive(Default)]
pub struct ProviderRegistryBuilder {
    providers: BTreeMap<ProviderId, Arc<dyn RateProvider>>,
}

impl ProviderRegistryBuilder {
    /// Register a provider under its own id, replacing any earlier one.
    pub fn register(mut self, provider: Arc<dyn RateProvider>) -> Self {
        self.providers.insert(provider.id(), provider);
        self
    }

    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry {
            providers: self.providers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::ScriptedHttpClient;
    use crate::rate_provider::RateErrorKind;

    #[test]
    fn provider_ids_parse_case_insensitively() {
        assert_eq!(
            ProviderId::from_str(" Frankfurter ").expect("known id"),
            ProviderId::Frankfurter
        );
        assert!(matches!(
            ProviderId::from_str("ecb"),
            Err(ValidationError::InvalidProvider { .. })
        ));
    }

    #[test]
    fn unknown_names_fail_instead_of_falling_back() {
        let registry =
            ProviderRegistry::with_http_client(&Settings::default(), Arc::new(ScriptedHttpClient::new()))
                .expect("default settings are valid");

        let error = registry.resolve("nope").err().expect("must fail");
        assert_eq!(error.kind(), RateErrorKind::UnknownProvider);
        assert!(error.message().contains("nope"));
    }

    #[test]
    fn known_id_without_instance_is_unknown() {
        let registry = ProviderRegistry::builder().build();

        let error = registry.resolve("frankfurter").err().expect("must fail");
        assert_eq!(error.kind(), RateErrorKind::UnknownProvider);
        assert!(registry.is_empty());
    }

    #[test]
    fn registered_provider_is_resolved_by_name() {
        let registry =
            ProviderRegistry::with_http_client(&Settings::default(), Arc::new(ScriptedHttpClient::new()))
                .expect("default settings are valid");

        let provider = registry.resolve("FRANKFURTER").expect("registered");
        assert_eq!(provider.id(), ProviderId::Frankfurter);
        assert_eq!(registry.ids(), vec![ProviderId::Frankfurter]);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut settings = Settings::default();
        settings.resilience.max_attempts = 0;

        let result = ProviderRegistry::with_http_client(&settings, Arc::new(ScriptedHttpClient::new()));
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }
}
