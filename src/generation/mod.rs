//! Generation service
//!
//! Runs one generation end to end: validate the request, claim the user's
//! in-flight slot, reserve credits, ask a content provider for text, render
//! the document, upload it and append it to the user's history. Credits
//! reserved for a generation that fails are refunded before the error is
//! returned.

pub mod guard;
pub mod metrics;
pub mod request;

pub use guard::{InFlightGuard, InFlightRegistry};
pub use request::{ContentType, GenerationRequest};

use crate::config::{Config, CreditsConfig};
use crate::credits::{generation_cost, CreditBalance};
use crate::documents;
use crate::error::{ForgeError, Result};
use crate::files::{create_store, ObjectStore};
use crate::providers::ProviderRouter;
use crate::storage::{HistoryItem, SqliteStorage};
use self::metrics::GenerationMetrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Result of a successful generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationOutcome {
    /// Public download URL of the generated file
    pub file_url: String,
    /// History row appended for the generation
    pub item: HistoryItem,
    /// Balance after the charge
    pub balance: CreditBalance,
}

/// Orchestrates generations against the ledger, providers and file storage
pub struct GenerationService {
    storage: SqliteStorage,
    providers: ProviderRouter,
    files: Arc<dyn ObjectStore>,
    in_flight: InFlightRegistry,
    pricing: CreditsConfig,
    timeout: Duration,
    max_prompt_chars: usize,
}

impl std::fmt::Debug for GenerationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationService")
            .field("providers", &self.providers)
            .field("files", &self.files.name())
            .field("pricing", &self.pricing)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GenerationService {
    /// Create a service from explicit parts
    pub fn new(
        storage: SqliteStorage,
        providers: ProviderRouter,
        files: Arc<dyn ObjectStore>,
        config: &Config,
    ) -> Self {
        Self {
            storage,
            providers,
            files,
            in_flight: InFlightRegistry::new(),
            pricing: config.credits,
            timeout: Duration::from_secs(config.generation.timeout_seconds),
            max_prompt_chars: config.generation.max_prompt_chars,
        }
    }

    /// Create a service with the providers and file store named by `config`
    ///
    /// # Errors
    ///
    /// Returns error if a configured provider or the storage backend cannot
    /// be created
    pub fn from_config(config: &Config, storage: SqliteStorage) -> Result<Self> {
        let providers = ProviderRouter::from_config(&config.generation)?;
        let files = create_store(config)?;
        tracing::info!("Generated files go to the {} backend", files.name());
        Ok(Self::new(storage, providers, files, config))
    }

    /// Override the provider/render/upload deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ledger and history storage
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Credit pricing in effect
    pub fn pricing(&self) -> &CreditsConfig {
        &self.pricing
    }

    /// Maximum accepted prompt length in characters
    pub fn max_prompt_chars(&self) -> usize {
        self.max_prompt_chars
    }

    /// Credits a request would cost
    pub fn quote(&self, request: &GenerationRequest) -> u32 {
        generation_cost(request.content_type, request.include_images, &self.pricing)
    }

    /// Whether a generation is currently running for `user_id`
    pub fn is_generating(&self, user_id: &str) -> bool {
        self.in_flight.is_active(user_id)
    }

    /// Make sure a ledger account exists for a signed-in user
    pub async fn open_account(&self, user_id: &str, email: Option<&str>) -> Result<()> {
        let uid = user_id.to_string();
        let email = email.map(str::to_string);
        let starting_balance = self.pricing.starting_balance;
        self.blocking(move |storage| storage.ensure_account(&uid, email.as_deref(), starting_balance))
            .await
    }

    /// Current balance of `user_id`
    pub async fn balance(&self, user_id: &str) -> Result<CreditBalance> {
        let uid = user_id.to_string();
        self.blocking(move |storage| storage.balance(&uid)).await
    }

    /// History of `user_id`, newest first
    pub async fn history(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<HistoryItem>> {
        let uid = user_id.to_string();
        self.blocking(move |storage| storage.list_history(&uid, limit)).await
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(SqliteStorage) -> Result<T> + Send + 'static,
    {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || op(storage))
            .await
            .map_err(|e| ForgeError::Storage(format!("Ledger task failed: {}", e)))?
    }

    /// Run one generation for `user_id`
    ///
    /// # Arguments
    ///
    /// * `user_id` - Account to charge
    /// * `request` - What to generate
    /// * `country` - Optional ISO country code used for provider routing
    ///
    /// # Returns
    ///
    /// The download URL, the new history row and the remaining balance
    ///
    /// # Errors
    ///
    /// - `ForgeError::Validation` for an empty or oversized prompt
    /// - `ForgeError::GenerationInProgress` if the user already has one running
    /// - `ForgeError::InsufficientCredits` if the balance does not cover the cost
    /// - `ForgeError::Timeout`, `Provider`, `Document` or `Upload` if producing
    ///   the file fails; the reserved credits are refunded first
    pub async fn generate(
        &self,
        user_id: &str,
        request: &GenerationRequest,
        country: Option<&str>,
    ) -> Result<GenerationOutcome> {
        request.validate(self.max_prompt_chars)?;
        let _slot = self.in_flight.try_acquire(user_id)?;

        let cost = self.quote(request);
        let starting_balance = self.pricing.starting_balance;
        let uid = user_id.to_string();
        self.blocking(move |storage| {
            storage.ensure_account(&uid, None, starting_balance)?;
            storage.reserve(&uid, cost)
        })
        .await?;

        let provider = self.providers.for_country(country);
        let metrics = GenerationMetrics::new(request.content_type.as_str(), provider.name());
        tracing::info!(
            user_id,
            content_type = request.content_type.as_str(),
            provider = provider.name(),
            cost,
            "Starting generation"
        );

        match self.produce(user_id, request, provider).await {
            Ok(outcome) => {
                metrics.record_success(cost);
                tracing::info!(user_id, file = %outcome.file_url, "Generation completed");
                Ok(outcome)
            }
            Err(err) => {
                metrics.record_failure(error_kind(&err));
                tracing::warn!(user_id, "Generation failed, refunding {} credit(s): {:#}", cost, err);
                let uid = user_id.to_string();
                if let Err(refund_err) = self.blocking(move |storage| storage.refund(&uid, cost)).await {
                    tracing::error!(user_id, "Refund of {} credit(s) failed: {:#}", cost, refund_err);
                }
                Err(err)
            }
        }
    }

    async fn produce(
        &self,
        user_id: &str,
        request: &GenerationRequest,
        provider: Arc<dyn crate::providers::ContentProvider>,
    ) -> Result<GenerationOutcome> {
        let content_type = request.content_type;
        let prompt = request.provider_prompt();
        let owner = user_id.to_string();
        let files = Arc::clone(&self.files);

        let work = async move {
            let text = provider.generate(&prompt).await?;
            let document = tokio::task::spawn_blocking(move || {
                documents::render(content_type, &text, &owner)
            })
            .await
            .map_err(|e| ForgeError::Document(format!("Render task failed: {}", e)))??;
            files.put(&document).await
        };

        let file_url = tokio::time::timeout(self.timeout, work)
            .await
            .map_err(|_| ForgeError::Timeout(self.timeout.as_secs()))??;

        let uid = user_id.to_string();
        let prompt = request.prompt.trim().to_string();
        let url = file_url.clone();
        let (item, balance) = self
            .blocking(move |storage| {
                let item = storage.record_generation(&uid, &prompt, content_type, &url)?;
                let balance = storage.balance(&uid)?;
                Ok((item, balance))
            })
            .await?;

        Ok(GenerationOutcome {
            file_url,
            item,
            balance,
        })
    }
}

/// Short label for a failure, used as a metrics label
fn error_kind(err: &anyhow::Error) -> &'static str {
    match err.chain().find_map(|e| e.downcast_ref::<ForgeError>()) {
        Some(ForgeError::Timeout(_)) => "timeout",
        Some(ForgeError::Provider(_)) | Some(ForgeError::Http(_)) => "provider",
        Some(ForgeError::Document(_)) => "document",
        Some(ForgeError::Upload(_)) => "upload",
        Some(ForgeError::Storage(_)) | Some(ForgeError::Database(_)) => "storage",
        _ => "other",
    }
}
