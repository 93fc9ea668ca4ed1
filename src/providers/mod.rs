//! Provider module for Lesson Forge
//!
//! This module contains the content provider abstraction, the DeepSeek,
//! Gemini and mock implementations, and the per-country router the
//! generation service uses to pick one for each request.

pub mod base;
pub mod deepseek;
pub mod gemini;
pub mod mock;

pub use base::ContentProvider;
pub use deepseek::DeepSeekProvider;
pub use gemini::GeminiProvider;
pub use mock::MockProvider;

use crate::config::GenerationConfig;
use crate::error::{ForgeError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Resolve `auto` to a concrete provider type
///
/// A DeepSeek key wins over a Gemini key; with neither the mock provider is
/// used so the service still answers.
///
/// # Examples
///
/// ```
/// use lesson_forge::config::GenerationConfig;
/// use lesson_forge::providers::resolve_provider_type;
///
/// let config = GenerationConfig::default();
/// assert_eq!(resolve_provider_type("auto", &config), "mock");
/// assert_eq!(resolve_provider_type("gemini", &config), "gemini");
/// ```
pub fn resolve_provider_type<'a>(provider_type: &'a str, config: &GenerationConfig) -> &'a str {
    if provider_type != "auto" {
        return provider_type;
    }
    let has_key = |key: &Option<String>| key.as_deref().is_some_and(|k| !k.trim().is_empty());
    if has_key(&config.deepseek.api_key) {
        "deepseek"
    } else if has_key(&config.gemini.api_key) {
        "gemini"
    } else {
        "mock"
    }
}

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `provider_type` - Type of provider ("auto", "mock", "deepseek" or "gemini")
/// * `config` - Generation configuration
///
/// # Returns
///
/// Returns a shared provider instance
///
/// # Errors
///
/// Returns error if provider type is invalid or its API key is missing
pub fn create_provider(
    provider_type: &str,
    config: &GenerationConfig,
) -> Result<Arc<dyn ContentProvider>> {
    match resolve_provider_type(provider_type, config) {
        "mock" => Ok(Arc::new(MockProvider::new())),
        "deepseek" => Ok(Arc::new(DeepSeekProvider::new(
            &config.deepseek,
            config.timeout_seconds,
        )?)),
        "gemini" => Ok(Arc::new(GeminiProvider::new(
            &config.gemini,
            config.timeout_seconds,
        )?)),
        other => Err(ForgeError::Provider(format!("Unknown provider type: {}", other)).into()),
    }
}

/// Picks a provider for each request
///
/// Requests carrying a country code listed in `country_routes` go to the
/// mapped provider; everything else uses the default.
#[derive(Clone)]
pub struct ProviderRouter {
    default: Arc<dyn ContentProvider>,
    by_country: HashMap<String, Arc<dyn ContentProvider>>,
}

impl std::fmt::Debug for ProviderRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut countries: Vec<_> = self.by_country.keys().collect();
        countries.sort();
        f.debug_struct("ProviderRouter")
            .field("default", &self.default.name())
            .field("countries", &countries)
            .finish()
    }
}

impl ProviderRouter {
    /// Build the router from configuration
    ///
    /// When the configured provider is `mock` the country routes are ignored,
    /// so `MOCK_AI=true` keeps every request offline.
    ///
    /// # Errors
    ///
    /// Returns error if the default provider or any routed provider cannot be
    /// created
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let default = create_provider(&config.provider, config)?;
        let mut by_country = HashMap::new();

        if default.name() == "mock" && config.provider == "mock" {
            if !config.country_routes.is_empty() {
                tracing::info!("Mock provider forced; ignoring country routes");
            }
        } else {
            for (country, provider_type) in &config.country_routes {
                let provider = create_provider(provider_type, config)?;
                tracing::debug!(
                    "Routing country {} to provider {}",
                    country,
                    provider.name()
                );
                by_country.insert(country.trim().to_ascii_uppercase(), provider);
            }
        }

        tracing::info!(
            "Content provider ready: default={}, routed countries={}",
            default.name(),
            by_country.len()
        );

        Ok(Self {
            default,
            by_country,
        })
    }

    /// Router that always answers with a single provider
    pub fn single(provider: Arc<dyn ContentProvider>) -> Self {
        Self {
            default: provider,
            by_country: HashMap::new(),
        }
    }

    /// Add or replace the provider for one country code
    pub fn with_route(mut self, country: &str, provider: Arc<dyn ContentProvider>) -> Self {
        self.by_country
            .insert(country.trim().to_ascii_uppercase(), provider);
        self
    }

    /// Provider for an optional ISO country code
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use lesson_forge::providers::{MockProvider, ProviderRouter};
    ///
    /// let router = ProviderRouter::single(Arc::new(MockProvider::new()));
    /// assert_eq!(router.for_country(Some("fr")).name(), "mock");
    /// assert_eq!(router.for_country(None).name(), "mock");
    /// ```
    pub fn for_country(&self, country: Option<&str>) -> Arc<dyn ContentProvider> {
        country
            .map(|c| c.trim().to_ascii_uppercase())
            .and_then(|c| self.by_country.get(&c).cloned())
            .unwrap_or_else(|| Arc::clone(&self.default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed_config() -> GenerationConfig {
        let mut config = GenerationConfig::default();
        config.deepseek.api_key = Some("sk-d".to_string());
        config.gemini.api_key = Some("g-k".to_string());
        config
    }

    #[test]
    fn test_auto_prefers_deepseek() {
        let config = keyed_config();
        assert_eq!(resolve_provider_type("auto", &config), "deepseek");
    }

    #[test]
    fn test_auto_falls_back_to_gemini() {
        let mut config = keyed_config();
        config.deepseek.api_key = None;
        assert_eq!(resolve_provider_type("auto", &config), "gemini");
    }

    #[test]
    fn test_auto_without_keys_is_mock() {
        let config = GenerationConfig::default();
        let provider = create_provider("auto", &config).unwrap();
        assert_eq!(provider.name(), "mock");
    }

    #[test]
    fn test_create_provider_unknown_type() {
        let config = GenerationConfig::default();
        assert!(create_provider("openai", &config).is_err());
    }

    #[test]
    fn test_create_provider_missing_key() {
        let config = GenerationConfig::default();
        assert!(create_provider("deepseek", &config).is_err());
    }

    #[test]
    fn test_router_uses_country_route() {
        let mut config = keyed_config();
        config.provider = "deepseek".to_string();
        config
            .country_routes
            .insert("cn".to_string(), "gemini".to_string());

        let router = ProviderRouter::from_config(&config).unwrap();
        assert_eq!(router.for_country(Some("CN")).name(), "gemini");
        assert_eq!(router.for_country(Some("us")).name(), "deepseek");
        assert_eq!(router.for_country(None).name(), "deepseek");
    }

    #[test]
    fn test_forced_mock_ignores_routes() {
        let mut config = keyed_config();
        config.provider = "mock".to_string();
        config
            .country_routes
            .insert("CN".to_string(), "gemini".to_string());

        let router = ProviderRouter::from_config(&config).unwrap();
        assert_eq!(router.for_country(Some("CN")).name(), "mock");
    }

    #[test]
    fn test_router_debug_lists_countries() {
        let router = ProviderRouter::single(Arc::new(MockProvider::new()))
            .with_route("de", Arc::new(MockProvider::new()));
        let debug = format!("{:?}", router);
        assert!(debug.contains("\"DE\""));
    }
}
