//! HTTP server for Lesson Forge
//!
//! Serves the dashboard, login and auth callback pages and the JSON API
//! using `axum` on the tokio runtime.
//!
//! Routes:
//! - GET  /                 - Dashboard (prompt form, history, purchase panel)
//! - GET  /login            - Login / registration form
//! - POST /login            - Password sign-in or registration
//! - GET  /auth/google      - Start federated sign-in
//! - GET  /auth/callback    - Finish federated sign-in
//! - POST /logout           - Sign out
//! - POST /generate         - Dashboard form submission
//! - GET  /api/health       - Liveness
//! - GET  /api/bundles      - Credit bundles
//! - POST /api/generate     - Generate a document (Bearer)
//! - GET  /api/user/credits - Current balance (Bearer)
//! - GET  /api/history      - Generation history, newest first (Bearer)
//! - GET  /files/*          - Generated files, when stored locally

pub mod handlers;
pub mod middleware;
pub mod pages;
pub mod state;
pub mod templates;

pub use state::{AppState, SharedState};

use crate::config::Config;
use crate::error::{ForgeError, Result};
use crate::files::LOCAL_FILES_ROUTE;
use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// How often expired browser sessions are dropped
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

/// Build the application router
///
/// # Examples
///
/// ```no_run
/// use lesson_forge::config::Config;
/// use lesson_forge::web::{router, AppState};
/// use std::sync::Arc;
///
/// let state = Arc::new(AppState::from_config(Config::default()).unwrap());
/// let app = router(state);
/// ```
pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("apikey"),
        ]);

    let api = Router::new()
        .route("/api/generate", post(handlers::generate))
        .route("/api/user/credits", get(handlers::credits))
        .route("/api/history", get(handlers::history))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_bearer,
        ));

    let mut app = Router::new()
        .route("/", get(pages::home))
        .route("/login", get(pages::login_page).post(pages::login_submit))
        .route("/auth/google", get(pages::google_sign_in))
        .route("/auth/callback", get(pages::auth_callback))
        .route("/logout", post(pages::logout))
        .route("/generate", post(pages::generate_submit))
        .route("/api/health", get(handlers::health))
        .route("/api/bundles", get(handlers::bundles))
        .merge(api);

    if state.config.storage.backend == "local" {
        app = app.nest_service(
            LOCAL_FILES_ROUTE,
            ServeDir::new(&state.config.storage.local_dir),
        );
    }

    app.fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server and run until Ctrl+C
///
/// # Errors
///
/// Returns error if the state cannot be built or the address cannot be bound
pub async fn start_server(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::from_config(config)?);

    if state.identity.is_placeholder() {
        tracing::warn!("Serving without an identity service; sign-in is disabled");
    }

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sessions.purge_expired().await;
            if removed > 0 {
                tracing::debug!("Purged {} expired browser session(s)", removed);
            }
        }
    });

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ForgeError::Config(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!("Lesson Forge listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C)
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
