//! Configuration management for Lesson Forge
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ForgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Identity service URL used when none is configured
pub const PLACEHOLDER_IDENTITY_URL: &str = "https://placeholder-url.supabase.co";

/// Identity service key used when none is configured
pub const PLACEHOLDER_ANON_KEY: &str = "placeholder-key";

/// Provider types accepted by `generation.provider`
pub const PROVIDER_TYPES: [&str; 4] = ["auto", "mock", "deepseek", "gemini"];

/// Main configuration structure for Lesson Forge
///
/// Holds everything the server and the operator commands need: listener
/// settings, the identity service location, the ledger database, content
/// provider selection, object storage and credit pricing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Hosted identity service settings
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Credit ledger and history database
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Content generation settings
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Generated file storage
    #[serde(default)]
    pub storage: StorageConfig,
    /// Credit pricing
    #[serde(default)]
    pub credits: CreditsConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally visible base URL, used for redirect targets and local file links
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
            secure_cookies: false,
        }
    }
}

/// Identity service configuration
///
/// Empty `url` or `anon_key` is not an error: the client falls back to a
/// placeholder connection that rejects every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the identity service (e.g. `https://xyz.supabase.co`)
    #[serde(default)]
    pub url: String,

    /// Public (anon) API key sent as the `apikey` header
    #[serde(default)]
    pub anon_key: String,

    /// Service role key used for privileged calls such as storage uploads
    #[serde(default)]
    pub service_role_key: String,

    /// Request timeout for identity calls (seconds)
    #[serde(default = "default_identity_timeout")]
    pub timeout_seconds: u64,

    /// Offer the Google federated sign-in button
    #[serde(default = "default_google_enabled")]
    pub google_enabled: bool,
}

fn default_identity_timeout() -> u64 {
    10
}

fn default_google_enabled() -> bool {
    true
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            service_role_key: String::new(),
            timeout_seconds: default_identity_timeout(),
            google_enabled: default_google_enabled(),
        }
    }
}

impl IdentityConfig {
    /// Whether both the URL and the anon key were supplied
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }

    /// URL to use for identity calls, substituting the placeholder when unset
    pub fn effective_url(&self) -> &str {
        let url = self.url.trim();
        if url.is_empty() {
            PLACEHOLDER_IDENTITY_URL
        } else {
            url.trim_end_matches('/')
        }
    }

    /// Anon key to use for identity calls, substituting the placeholder when unset
    pub fn effective_anon_key(&self) -> &str {
        if self.anon_key.trim().is_empty() {
            PLACEHOLDER_ANON_KEY
        } else {
            self.anon_key.trim()
        }
    }
}

/// Ledger database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// SQLite file path; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Content generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Provider selection: auto, mock, deepseek or gemini
    #[serde(default = "default_provider")]
    pub provider: String,

    /// End-to-end timeout for one generation (seconds)
    #[serde(default = "default_generation_timeout")]
    pub timeout_seconds: u64,

    /// Maximum prompt length in characters
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    /// Request header carrying the caller's ISO country code
    #[serde(default = "default_country_header")]
    pub country_header: String,

    /// Country code to provider type routing (e.g. `CN: deepseek`)
    #[serde(default)]
    pub country_routes: HashMap<String, String>,

    /// DeepSeek provider settings
    #[serde(default)]
    pub deepseek: DeepSeekConfig,

    /// Gemini provider settings
    #[serde(default)]
    pub gemini: GeminiConfig,
}

fn default_provider() -> String {
    "auto".to_string()
}

fn default_generation_timeout() -> u64 {
    110
}

fn default_max_prompt_chars() -> usize {
    4_000
}

fn default_country_header() -> String {
    "x-vercel-ip-country".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            timeout_seconds: default_generation_timeout(),
            max_prompt_chars: default_max_prompt_chars(),
            country_header: default_country_header(),
            country_routes: HashMap::new(),
            deepseek: DeepSeekConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

/// DeepSeek provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepSeekConfig {
    /// API key; the provider is unavailable without one
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL (overridable for tests and proxies)
    #[serde(default = "default_deepseek_base")]
    pub api_base: String,

    /// Chat model name
    #[serde(default = "default_deepseek_model")]
    pub model: String,
}

fn default_deepseek_base() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_deepseek_model() -> String {
    "deepseek-chat".to_string()
}

impl Default for DeepSeekConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_deepseek_base(),
            model: default_deepseek_model(),
        }
    }
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; the provider is unavailable without one
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL (overridable for tests and proxies)
    #[serde(default = "default_gemini_base")]
    pub api_base: String,

    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

fn default_gemini_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash-lite-preview-02-05".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_gemini_base(),
            model: default_gemini_model(),
        }
    }
}

/// Generated file storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend: supabase or local
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Bucket name for the supabase backend
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Directory for the local backend
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,

    /// Upload timeout (seconds)
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_seconds: u64,
}

fn default_backend() -> String {
    "supabase".to_string()
}

fn default_bucket() -> String {
    "generated-files".to_string()
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_upload_timeout() -> u64 {
    30
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            bucket: default_bucket(),
            local_dir: default_local_dir(),
            upload_timeout_seconds: default_upload_timeout(),
        }
    }
}

/// Credit pricing configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreditsConfig {
    /// Cost of a lesson plan
    #[serde(default = "default_lesson_cost")]
    pub lesson_cost: u32,

    /// Cost of a presentation
    #[serde(default = "default_presentation_cost")]
    pub presentation_cost: u32,

    /// Extra cost when images are requested
    #[serde(default = "default_image_surcharge")]
    pub image_surcharge: u32,

    /// Balance given to an account the first time it is seen
    #[serde(default)]
    pub starting_balance: u32,
}

fn default_lesson_cost() -> u32 {
    1
}

fn default_presentation_cost() -> u32 {
    2
}

fn default_image_surcharge() -> u32 {
    1
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            lesson_cost: default_lesson_cost(),
            presentation_cost: default_presentation_cost(),
            image_surcharge: default_image_surcharge(),
            starting_balance: 0,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file {} not found, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    /// Load configuration from a YAML file
    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ForgeError::Config(format!("Failed to read {}: {}", path, e)))?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ForgeError::Yaml)?;
        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// The un-prefixed names match the variables the hosted deployment
    /// already exports (`SUPABASE_URL`, `DEEPSEEK_KEY`, `PORT`, ...).
    pub fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("SUPABASE_URL") {
            self.identity.url = url;
        }
        if let Ok(key) = std::env::var("SUPABASE_ANON_KEY") {
            self.identity.anon_key = key;
        }
        if let Ok(key) = std::env::var("SUPABASE_SERVICE_ROLE_KEY") {
            self.identity.service_role_key = key;
        }

        if let Ok(key) = std::env::var("DEEPSEEK_KEY") {
            if !key.is_empty() {
                self.generation.deepseek.api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var("GEMINI_KEY") {
            if !key.is_empty() {
                self.generation.gemini.api_key = Some(key);
            }
        }
        if let Ok(provider) = std::env::var("LESSON_FORGE_PROVIDER") {
            self.generation.provider = provider;
        }
        if std::env::var("MOCK_AI").map(|v| v == "true").unwrap_or(false) {
            self.generation.provider = "mock".to_string();
        }

        if let Ok(port) = std::env::var("PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Ok(host) = std::env::var("LESSON_FORGE_HOST") {
            self.server.host = host;
        }
        if let Ok(url) = std::env::var("LESSON_FORGE_PUBLIC_URL") {
            self.server.public_url = url;
        }
        if let Ok(path) = std::env::var("LESSON_FORGE_DB") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Ok(backend) = std::env::var("LESSON_FORGE_STORAGE_BACKEND") {
            self.storage.backend = backend;
        }
    }

    /// Apply CLI overrides
    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(db) = &cli.database {
            self.database.path = Some(db.clone());
        }
        if let crate::cli::Commands::Serve { host, port, .. } = &cli.command {
            if let Some(host) = host {
                self.server.host = host.clone();
            }
            if let Some(port) = port {
                self.server.port = *port;
            }
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if !PROVIDER_TYPES.contains(&self.generation.provider.as_str()) {
            return Err(ForgeError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.generation.provider,
                PROVIDER_TYPES.join(", ")
            ))
            .into());
        }

        for (country, provider) in &self.generation.country_routes {
            if !PROVIDER_TYPES.contains(&provider.as_str()) {
                return Err(ForgeError::Config(format!(
                    "Invalid provider type {} in country route for {}",
                    provider, country
                ))
                .into());
            }
        }

        if self.generation.timeout_seconds == 0 {
            return Err(ForgeError::Config(
                "generation.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.generation.max_prompt_chars == 0 {
            return Err(ForgeError::Config(
                "generation.max_prompt_chars must be greater than 0".to_string(),
            )
            .into());
        }

        let valid_backends = ["supabase", "local"];
        if !valid_backends.contains(&self.storage.backend.as_str()) {
            return Err(ForgeError::Config(format!(
                "Invalid storage backend: {}. Must be one of: {}",
                self.storage.backend,
                valid_backends.join(", ")
            ))
            .into());
        }

        if self.storage.backend == "supabase" && self.storage.bucket.trim().is_empty() {
            return Err(ForgeError::Config("storage.bucket cannot be empty".to_string()).into());
        }

        if self.storage.upload_timeout_seconds == 0 || self.identity.timeout_seconds == 0 {
            return Err(ForgeError::Config(
                "storage and identity timeouts must be greater than 0".to_string(),
            )
            .into());
        }

        if self.credits.lesson_cost == 0 || self.credits.presentation_cost == 0 {
            return Err(ForgeError::Config(
                "credits.lesson_cost and credits.presentation_cost must be greater than 0"
                    .to_string(),
            )
            .into());
        }

        url::Url::parse(&self.server.public_url).map_err(|e| {
            ForgeError::Config(format!("server.public_url is not a valid URL: {}", e))
        })?;

        Ok(())
    }
}
