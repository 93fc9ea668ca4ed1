//! Hosted identity service client
//!
//! Talks to a GoTrue-compatible REST API (`/auth/v1/...`). Every request
//! carries the public `apikey` header; user-scoped calls add the user's
//! bearer token.

use super::session::{AuthUser, Session};
use crate::config::IdentityConfig;
use crate::error::{ForgeError, Result};
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Notice shown after registering when the address must be confirmed
pub const CONFIRMATION_NOTICE: &str =
    "Registration successful! Check your email to confirm your account, then sign in.";

/// Result of a registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Account created and signed in
    SignedIn(Session),
    /// Account created; a confirmation email was sent
    ConfirmationRequired,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for AuthUser {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<UserResponse>,
}

impl TokenResponse {
    fn into_session(self) -> Option<Session> {
        let access_token = self.access_token?;
        let user = self.user?;
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => Utc.timestamp_opt(at, 0).single(),
            (None, Some(secs)) => Some(Utc::now() + chrono::Duration::seconds(secs)),
            (None, None) => None,
        };
        Some(Session {
            access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: user.into(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}

/// Identity service client
#[derive(Debug, Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    placeholder: bool,
}

impl IdentityClient {
    /// Create a client from configuration
    ///
    /// Missing settings fall back to a placeholder connection. The client is
    /// still created, but every call fails with an authentication error.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::Config` if the HTTP client cannot be built
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        let placeholder = !config.is_configured();
        if placeholder {
            tracing::warn!(
                "Identity service URL or key missing; using placeholder connection. \
                 Sign-in will not work until SUPABASE_URL and SUPABASE_ANON_KEY are set."
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ForgeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.effective_url().to_string(),
            anon_key: config.effective_anon_key().to_string(),
            placeholder,
        })
    }

    /// Whether this client points at the placeholder connection
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.placeholder {
            return Err(ForgeError::Authentication(
                "Authentication service is not configured".to_string(),
            )
            .into());
        }
        Ok(())
    }

    async fn failure(response: reqwest::Response, fallback: &str) -> anyhow::Error {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(ErrorBody::message)
            .unwrap_or_else(|| fallback.to_string());
        tracing::debug!("Identity service returned {}: {}", status, text);
        ForgeError::Authentication(message).into()
    }

    async fn token_request(&self, grant_type: &str, body: serde_json::Value) -> Result<Session> {
        self.ensure_configured()?;

        let response = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Identity token request failed: {}", e);
                ForgeError::Authentication(format!("Could not reach the sign-in service: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(Self::failure(response, "Sign-in failed").await);
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ForgeError::Authentication(format!("Unexpected sign-in response: {}", e))
        })?;
        token
            .into_session()
            .ok_or_else(|| ForgeError::Authentication("Sign-in response had no session".to_string()).into())
    }

    /// Sign in with email and password
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::Authentication` carrying the identity service's
    /// message, e.g. `Invalid login credentials`
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.token_request(
            "password",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Register a new account
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::Authentication` if the identity service refuses
    /// the registration
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        self.ensure_configured()?;

        let response = self
            .client
            .post(self.endpoint("signup"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| {
                ForgeError::Authentication(format!("Could not reach the sign-in service: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(Self::failure(response, "Registration failed").await);
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ForgeError::Authentication(format!("Unexpected registration response: {}", e))
        })?;
        Ok(match token.into_session() {
            Some(session) => SignUpOutcome::SignedIn(session),
            None => SignUpOutcome::ConfirmationRequired,
        })
    }

    /// Resolve a bearer token to its user
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::Unauthorized` if the token is rejected
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser> {
        if self.placeholder {
            return Err(ForgeError::Unauthorized(
                "Authentication service is not configured".to_string(),
            )
            .into());
        }

        let response = self
            .client
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Identity user lookup failed: {}", e);
                ForgeError::Unauthorized(format!("Could not verify token: {}", e))
            })?;

        if !response.status().is_success() {
            tracing::debug!("Token rejected with status {}", response.status());
            return Err(ForgeError::Unauthorized("Invalid token".to_string()).into());
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| ForgeError::Unauthorized(format!("Unexpected user response: {}", e)))?;
        Ok(user.into())
    }

    /// URL that starts a federated sign-in
    ///
    /// # Arguments
    ///
    /// * `provider` - External provider, e.g. `google`
    /// * `redirect_to` - Callback URL the identity service sends the code to
    /// * `code_challenge` - PKCE S256 challenge
    ///
    /// # Examples
    ///
    /// ```
    /// use lesson_forge::auth::IdentityClient;
    /// use lesson_forge::config::IdentityConfig;
    ///
    /// let config = IdentityConfig {
    ///     url: "https://proj.supabase.co".to_string(),
    ///     anon_key: "anon".to_string(),
    ///     ..IdentityConfig::default()
    /// };
    /// let client = IdentityClient::new(&config).unwrap();
    /// let url = client
    ///     .authorize_url("google", "http://localhost:8080/auth/callback?state=x", "abc")
    ///     .unwrap();
    /// assert!(url.starts_with("https://proj.supabase.co/auth/v1/authorize?provider=google"));
    /// assert!(url.contains("code_challenge_method=s256"));
    /// ```
    pub fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> Result<String> {
        let mut url = url::Url::parse(&self.endpoint("authorize"))
            .map_err(|e| ForgeError::Config(format!("Invalid identity service URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", super::pkce::CHALLENGE_METHOD);
        Ok(url.into())
    }

    /// Exchange a federated sign-in code for a session
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<Session> {
        self.token_request(
            "pkce",
            serde_json::json!({ "auth_code": code, "code_verifier": code_verifier }),
        )
        .await
    }

    /// Revoke a session
    ///
    /// Failures are logged and ignored; the local session is dropped either way.
    pub async fn sign_out(&self, access_token: &str) {
        if self.placeholder {
            return;
        }
        let result = self
            .client
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => tracing::warn!("Sign-out returned status {}", response.status()),
            Err(e) => tracing::warn!("Sign-out request failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> IdentityClient {
        IdentityClient::new(&IdentityConfig {
            url: server.uri(),
            anon_key: "anon".to_string(),
            ..IdentityConfig::default()
        })
        .unwrap()
    }

    fn session_body() -> serde_json::Value {
        serde_json::json!({
            "access_token": "jwt-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh",
            "user": {"id": "user-1", "email": "teacher@example.com"}
        })
    }

    #[tokio::test]
    async fn test_password_sign_in_returns_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon"))
            .and(body_json(serde_json::json!({
                "email": "teacher@example.com",
                "password": "correct-horse"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        let session = client_for(&server)
            .sign_in_with_password("teacher@example.com", "correct-horse")
            .await
            .unwrap();
        assert_eq!(session.access_token, "jwt-token");
        assert_eq!(session.user.id, "user-1");
        assert!(!session.is_expired());
    }

    #[tokio::test]
    async fn test_wrong_password_surfaces_service_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .sign_in_with_password("teacher@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(crate::error::user_message(&err), "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_sign_up_without_session_needs_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "user-2",
                "email": "new@example.com",
                "confirmation_sent_at": "2024-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .sign_up("new@example.com", "secret123")
            .await
            .unwrap();
        assert_eq!(outcome, SignUpOutcome::ConfirmationRequired);
    }

    #[tokio::test]
    async fn test_sign_up_autoconfirm_signs_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .sign_up("teacher@example.com", "secret123")
            .await
            .unwrap();
        assert!(matches!(outcome, SignUpOutcome::SignedIn(_)));
    }

    #[tokio::test]
    async fn test_sign_up_error_uses_msg_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "code": 422,
                "msg": "User already registered"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .sign_up("teacher@example.com", "secret123")
            .await
            .unwrap_err();
        assert_eq!(crate::error::user_message(&err), "User already registered");
    }

    #[tokio::test]
    async fn test_get_user_with_valid_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("authorization", "Bearer jwt-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "user-1",
                "email": "teacher@example.com"
            })))
            .mount(&server)
            .await;

        let user = client_for(&server).get_user("jwt-token").await.unwrap();
        assert_eq!(user.id, "user-1");
    }

    #[tokio::test]
    async fn test_get_user_rejected_token_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server).get_user("bad").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ForgeError>(),
            Some(ForgeError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_exchange_code_sends_pkce_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "pkce"))
            .and(body_json(serde_json::json!({
                "auth_code": "code-1",
                "code_verifier": "verifier-1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        let session = client_for(&server)
            .exchange_code("code-1", "verifier-1")
            .await
            .unwrap();
        assert_eq!(session.user.email.as_deref(), Some("teacher@example.com"));
    }

    #[tokio::test]
    async fn test_placeholder_client_fails_without_network() {
        let client = IdentityClient::new(&IdentityConfig::default()).unwrap();
        assert!(client.is_placeholder());
        let err = client
            .sign_in_with_password("teacher@example.com", "x")
            .await
            .unwrap_err();
        assert_eq!(
            crate::error::user_message(&err),
            "Authentication service is not configured"
        );
        assert!(client.get_user("t").await.is_err());
    }

    #[test]
    fn test_authorize_url_encodes_redirect() {
        let client = IdentityClient::new(&IdentityConfig {
            url: "https://proj.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
            ..IdentityConfig::default()
        })
        .unwrap();
        let url = client
            .authorize_url("google", "http://localhost:8080/auth/callback?state=s1", "chal")
            .unwrap();
        let parsed = url::Url::parse(&url).unwrap();
        let pairs: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs["provider"], "google");
        assert_eq!(pairs["redirect_to"], "http://localhost:8080/auth/callback?state=s1");
        assert_eq!(pairs["code_challenge"], "chal");
        assert_eq!(parsed.path(), "/auth/v1/authorize");
    }
}
