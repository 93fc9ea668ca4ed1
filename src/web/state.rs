//! Shared application state

use super::templates::Templates;
use crate::auth::{IdentityClient, SessionStore};
use crate::config::Config;
use crate::error::Result;
use crate::generation::GenerationService;
use crate::storage::SqliteStorage;
use std::sync::Arc;

/// State shared by every handler
#[derive(Debug)]
pub struct AppState {
    /// Validated configuration
    pub config: Config,
    /// Identity service client
    pub identity: IdentityClient,
    /// Browser sessions keyed by cookie id
    pub sessions: SessionStore,
    /// Generation service, which also fronts the ledger
    pub generation: Arc<GenerationService>,
    /// Page templates
    pub templates: Templates,
}

/// Handle passed to axum
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Assemble state from already-built parts
    ///
    /// # Errors
    ///
    /// Returns error if the page templates fail to compile
    pub fn new(config: Config, identity: IdentityClient, generation: GenerationService) -> Result<Self> {
        Ok(Self {
            config,
            identity,
            sessions: SessionStore::new(),
            generation: Arc::new(generation),
            templates: Templates::new()?,
        })
    }

    /// Build everything the server needs from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the ledger, providers, file store or identity client
    /// cannot be created
    pub fn from_config(config: Config) -> Result<Self> {
        let storage = SqliteStorage::from_config(&config.database)?;
        tracing::info!("Ledger database: {}", storage.db_path().display());
        let generation = GenerationService::from_config(&config, storage)?;
        let identity = IdentityClient::new(&config.identity)?;
        Self::new(config, identity, generation)
    }

    /// Whether session cookies get the `Secure` attribute
    pub fn secure_cookies(&self) -> bool {
        self.config.server.secure_cookies
    }
}
