//! Server-rendered pages: dashboard, login and the federated callback
//!
//! A browser is tracked by the `lf_session` cookie. Its [`BrowserSession`]
//! (auth flow plus any pending PKCE verifier) lives in the server-side
//! [`SessionStore`](crate::auth::SessionStore); every page render reads the
//! signed-in session from there and re-reads balance and history.

use super::handlers::request_country;
use super::state::{AppState, SharedState};
use crate::auth::pkce::{random_token, PkceChallenge};
use crate::auth::{
    AuthFlow, AuthState, AuthUser, BrowserSession, Session, SignUpOutcome, CONFIRMATION_NOTICE,
    SESSION_COOKIE,
};
use crate::config::CreditsConfig;
use crate::credits::CreditBalance;
use crate::error::{status_for, user_message, Result};
use crate::generation::{ContentType, GenerationRequest};
use crate::views::{
    CreditView, DisabledReason, HistoryView, LoginForm, LoginMode, PromptForm, PurchasePanel,
    EMPTY_HISTORY_MESSAGE, EMPTY_HISTORY_TITLE, PROMPT_PLACEHOLDER,
};
use axum::extract::{Form, Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

/// Federated provider offered on the login page
pub const GOOGLE_PROVIDER: &str = "google";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error returned by page handlers, rendered as a short HTML page
#[derive(Debug)]
pub struct PageError(anyhow::Error);

impl<E> From<E> for PageError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        tracing::error!("Page failed ({}): {:#}", status, self.0);
        let body = format!(
            "<!doctype html><title>Lesson Forge</title><h1>Something went wrong</h1><p>{}</p><p><a href=\"/\">Back to Home</a></p>",
            minijinja::HtmlEscape(&user_message(&self.0))
        );
        (status, Html(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Cookies and browser sessions
// ---------------------------------------------------------------------------

/// Cookie that binds a browser to session `id`
pub(crate) fn session_cookie(id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie matching the session cookie's path, for removal from a jar
fn session_removal() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

struct Browser {
    id: Option<String>,
    state: BrowserSession,
}

impl Browser {
    fn user(&self) -> Option<&AuthUser> {
        self.state.active_session().map(|s| &s.user)
    }

    /// Drops a flow that was left mid-way, e.g. an abandoned Google redirect
    fn reset_stale_flow(&mut self) {
        if !matches!(
            self.state.flow.state(),
            AuthState::Anonymous | AuthState::Error(_)
        ) {
            tracing::debug!(state = self.state.flow.state().name(), "Resetting stale auth flow");
            self.state = BrowserSession::default();
        }
    }
}

async fn load_browser(state: &AppState, jar: &CookieJar) -> Browser {
    if let Some(id) = jar.get(SESSION_COOKIE).map(|c| c.value()) {
        if let Some(browser) = state.sessions.get(id).await {
            return Browser {
                id: Some(id.to_string()),
                state: browser,
            };
        }
    }
    Browser {
        id: None,
        state: BrowserSession::default(),
    }
}

/// Persist browser state; a new browser gets its session cookie added to `jar`
async fn save_browser(state: &AppState, jar: CookieJar, browser: Browser) -> CookieJar {
    match browser.id {
        Some(id) => {
            state.sessions.put(&id, browser.state).await;
            jar
        }
        None => {
            let id = state.sessions.create(browser.state).await;
            jar.add(session_cookie(id, state.secure_cookies()))
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ContentTypeOption {
    value: &'static str,
    label: &'static str,
}

#[derive(Serialize)]
struct HomeContext<'a> {
    user_email: Option<&'a str>,
    credit: CreditView,
    form: &'a PromptForm,
    cost: u32,
    disabled_reason: Option<DisabledReason>,
    disabled_message: Option<&'static str>,
    pricing: &'a CreditsConfig,
    content_types: Vec<ContentTypeOption>,
    placeholder: &'static str,
    history: HistoryView,
    empty_title: &'static str,
    empty_message: &'static str,
    panel: PurchasePanel,
    error: Option<String>,
    file_url: Option<String>,
}

/// What the dashboard shows besides stored state
#[derive(Default)]
struct Dashboard {
    prompt: String,
    content_type: ContentType,
    include_images: bool,
    error: Option<String>,
    file_url: Option<String>,
}

async fn render_dashboard(state: &AppState, user: Option<&AuthUser>, dashboard: Dashboard) -> Result<Html<String>> {
    let (credit, history, balance, pending) = match user {
        Some(user) => {
            state
                .generation
                .open_account(&user.id, user.email.as_deref())
                .await?;
            let balance = state.generation.balance(&user.id).await?;
            let items = state.generation.history(&user.id, None).await?;
            let pending = state.generation.is_generating(&user.id);
            (
                CreditView::signed_in(balance),
                HistoryView::for_render(&items, pending),
                balance,
                pending,
            )
        }
        None => (
            CreditView::anonymous(),
            HistoryView::Empty,
            CreditBalance::default(),
            false,
        ),
    };

    let mut form = PromptForm::new(user.is_some(), balance);
    form.is_loading = pending;
    form.prompt = dashboard.prompt;
    form.content_type = dashboard.content_type;
    form.include_images = dashboard.include_images;

    let pricing = state.generation.pricing();
    let reason = form.disabled_reason(pricing);
    let context = HomeContext {
        user_email: user.and_then(|u| u.email.as_deref()),
        credit,
        form: &form,
        cost: form.cost(pricing),
        disabled_reason: reason,
        disabled_message: reason.map(|r| r.message()),
        pricing,
        content_types: [ContentType::Lesson, ContentType::Presentation]
            .iter()
            .map(|ct| ContentTypeOption {
                value: ct.as_str(),
                label: ct.label(),
            })
            .collect(),
        placeholder: PROMPT_PLACEHOLDER,
        history,
        empty_title: EMPTY_HISTORY_TITLE,
        empty_message: EMPTY_HISTORY_MESSAGE,
        panel: PurchasePanel::default(),
        error: dashboard.error,
        file_url: dashboard.file_url,
    };
    Ok(Html(state.templates.render("home.html", &context)?))
}

/// GET /
pub async fn home(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> std::result::Result<Response, PageError> {
    let browser = load_browser(&state, &jar).await;
    let page = render_dashboard(&state, browser.user(), Dashboard::default()).await?;
    Ok(page.into_response())
}

/// Fields of the dashboard form
#[derive(Debug, Deserialize)]
pub struct GenerateSubmission {
    /// Prompt text
    #[serde(default)]
    pub prompt: String,
    /// Content type
    #[serde(default)]
    pub content_type: ContentType,
    /// Present when the image checkbox is ticked
    #[serde(default)]
    pub include_images: Option<String>,
}

/// POST /generate
pub async fn generate_submit(
    State(state): State<SharedState>,
    jar: CookieJar,
    headers: HeaderMap,
    Form(input): Form<GenerateSubmission>,
) -> std::result::Result<Response, PageError> {
    let browser = load_browser(&state, &jar).await;
    let user = match browser.user() {
        Some(user) => user.clone(),
        None => return Ok(Redirect::to("/login").into_response()),
    };

    state
        .generation
        .open_account(&user.id, user.email.as_deref())
        .await?;
    let balance = state.generation.balance(&user.id).await?;

    let mut form = PromptForm::new(true, balance);
    form.prompt = input.prompt;
    form.content_type = input.content_type;
    form.include_images = input.include_images.is_some();

    let pricing = *state.generation.pricing();
    let mut dashboard = Dashboard {
        prompt: form.prompt.clone(),
        content_type: form.content_type,
        include_images: form.include_images,
        ..Dashboard::default()
    };

    if form.begin_submit(&pricing) {
        let request = GenerationRequest::new(form.prompt.clone(), form.content_type, form.include_images);
        let country = request_country(&state, &headers);
        match state.generation.generate(&user.id, &request, country).await {
            Ok(outcome) => {
                dashboard.file_url = Some(outcome.file_url);
                dashboard.prompt.clear();
            }
            Err(err) => {
                tracing::warn!(user_id = %user.id, "Dashboard generation failed: {:#}", err);
                dashboard.error = Some(user_message(&err));
            }
        }
        form.settle();
    } else {
        dashboard.error = form.disabled_reason(&pricing).map(|r| r.message().to_string());
    }

    let page = render_dashboard(&state, Some(&user), dashboard).await?;
    Ok(page.into_response())
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct LoginContext<'a> {
    form: &'a LoginForm,
    title: &'static str,
    mode: &'static str,
    submit_label: &'static str,
    toggle_prompt: &'static str,
    toggle_label: &'static str,
    toggle_mode: &'static str,
}

fn render_login(state: &AppState, form: &LoginForm) -> Result<Html<String>> {
    let context = LoginContext {
        form,
        title: form.mode.title(),
        mode: form.mode.as_str(),
        submit_label: form.mode.submit_label(),
        toggle_prompt: form.mode.toggle_prompt(),
        toggle_label: form.mode.toggle_label(),
        toggle_mode: form.mode.toggled().as_str(),
    };
    Ok(Html(state.templates.render("login.html", &context)?))
}

/// Query parameters of `GET /login`
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    /// `sign_in` or `register`
    #[serde(default)]
    pub mode: LoginMode,
}

/// GET /login
pub async fn login_page(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> std::result::Result<Response, PageError> {
    let browser = load_browser(&state, &jar).await;
    if browser.user().is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let form = LoginForm::from_flow(
        &browser.state.flow,
        query.mode,
        state.config.identity.google_enabled,
    );
    Ok(render_login(&state, &form)?.into_response())
}

/// Fields of the login form
#[derive(Debug, Deserialize)]
pub struct LoginSubmission {
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Password
    #[serde(default)]
    pub password: String,
    /// `sign_in` or `register`
    #[serde(default)]
    pub mode: LoginMode,
}

/// POST /login
pub async fn login_submit(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(input): Form<LoginSubmission>,
) -> std::result::Result<Response, PageError> {
    let mut browser = load_browser(&state, &jar).await;
    if browser.user().is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    browser.reset_stale_flow();
    browser.state.flow.begin_sign_in(&input.email)?;

    let email = input.email.trim();
    let outcome = if email.is_empty() || input.password.is_empty() {
        Err("Email and password are required".to_string())
    } else {
        let result = match input.mode {
            LoginMode::SignIn => state
                .identity
                .sign_in_with_password(email, &input.password)
                .await
                .map(SignUpOutcome::SignedIn),
            LoginMode::Register => state.identity.sign_up(email, &input.password).await,
        };
        result.map_err(|e| user_message(&e))
    };

    let mut mode = input.mode;
    let signed_in = match outcome {
        Ok(SignUpOutcome::SignedIn(session)) => {
            browser.state.flow.succeed(session)?;
            true
        }
        Ok(SignUpOutcome::ConfirmationRequired) => {
            browser.state.flow.confirmation_sent(CONFIRMATION_NOTICE)?;
            mode = LoginMode::SignIn;
            false
        }
        Err(message) => {
            tracing::info!(mode = mode.as_str(), "Sign-in attempt failed: {}", message);
            browser.state.flow.fail(message)?;
            false
        }
    };

    let form = LoginForm::from_flow(
        &browser.state.flow,
        mode,
        state.config.identity.google_enabled,
    );
    let jar = save_browser(&state, jar, browser).await;

    if signed_in {
        Ok((jar, Redirect::to("/")).into_response())
    } else {
        Ok((jar, render_login(&state, &form)?).into_response())
    }
}

// ---------------------------------------------------------------------------
// Federated sign-in
// ---------------------------------------------------------------------------

/// GET /auth/google
pub async fn google_sign_in(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> std::result::Result<Response, PageError> {
    if !state.config.identity.google_enabled {
        return Ok(Redirect::to("/login").into_response());
    }

    let mut browser = load_browser(&state, &jar).await;
    if browser.user().is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    browser.reset_stale_flow();

    let pkce = PkceChallenge::generate();
    let anti_forgery = random_token(16);
    let redirect_to = format!(
        "{}/auth/callback?state={}",
        state.config.server.public_url.trim_end_matches('/'),
        anti_forgery
    );
    let authorize_url = state
        .identity
        .authorize_url(GOOGLE_PROVIDER, &redirect_to, &pkce.challenge)?;

    browser
        .state
        .flow
        .begin_federated(GOOGLE_PROVIDER, &anti_forgery)?;
    browser.state.pkce_verifier = Some(pkce.verifier);
    let jar = save_browser(&state, jar, browser).await;

    tracing::info!("Redirecting to {} sign-in", GOOGLE_PROVIDER);
    Ok((jar, Redirect::to(&authorize_url)).into_response())
}

/// Query parameters of `GET /auth/callback`
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange
    pub code: Option<String>,
    /// Anti-forgery value echoed back
    pub state: Option<String>,
    /// Error reported by the provider instead of a code
    pub error_description: Option<String>,
}

/// GET /auth/callback
pub async fn auth_callback(
    State(app): State<SharedState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> std::result::Result<Response, PageError> {
    let mut browser = load_browser(&app, &jar).await;
    let pending = matches!(browser.state.flow.state(), AuthState::AwaitingRedirect { .. });
    if browser.id.is_none() || !pending {
        tracing::warn!("Auth callback without a pending sign-in");
        return Ok(Redirect::to("/login").into_response());
    }

    if !browser.state.flow.receive_callback(query.state.as_deref())? {
        browser.state.pkce_verifier = None;
        let jar = save_browser(&app, jar, browser).await;
        return Ok((jar, Redirect::to("/login")).into_response());
    }

    let verifier = browser.state.pkce_verifier.take();
    let exchanged: std::result::Result<Session, String> = match (query.code.as_deref(), verifier) {
        (Some(code), Some(verifier)) => app
            .identity
            .exchange_code(code, &verifier)
            .await
            .map_err(|e| user_message(&e)),
        _ => Err(query
            .error_description
            .unwrap_or_else(|| "Sign-in was cancelled".to_string())),
    };

    match exchanged {
        Ok(session) => {
            browser.state.flow.succeed(session)?;
            let jar = save_browser(&app, jar, browser).await;
            let page = app
                .templates
                .render("callback.html", minijinja::context! {})?;
            Ok((jar, Html(page)).into_response())
        }
        Err(message) => {
            tracing::warn!("Federated sign-in failed: {}", message);
            browser.state.flow.fail(message)?;
            let jar = save_browser(&app, jar, browser).await;
            Ok((jar, Redirect::to("/login")).into_response())
        }
    }
}

/// POST /logout
pub async fn logout(State(state): State<SharedState>, jar: CookieJar) -> Response {
    if let Some(id) = jar.get(SESSION_COOKIE).map(|c| c.value()) {
        if let Some(browser) = state.sessions.remove(id).await {
            let mut flow: AuthFlow = browser.flow;
            if let Some(session) = flow.session().cloned() {
                state.identity.sign_out(&session.access_token).await;
                if flow.sign_out().is_ok() {
                    tracing::info!(user_id = %session.user.id, "Signed out");
                }
            }
        }
    }
    (jar.remove(session_removal()), Redirect::to("/")).into_response()
}
