use crate::config::Config;
use crate::error::Result;
use crate::web;

/// Run the HTTP server until Ctrl+C
pub async fn run_serve(config: Config) -> Result<()> {
    tracing::info!(
        provider = %config.generation.provider,
        storage = %config.storage.backend,
        "Starting Lesson Forge server"
    );
    web::start_server(config).await
}
