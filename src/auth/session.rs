//! Sessions and the server-side browser session store
//!
//! A browser is identified by a random cookie id. Each id maps to the state
//! of its auth flow, which holds the identity service session once the user
//! has signed in, plus the PKCE verifier of a pending federated sign-in.

use super::flow::AuthFlow;
use super::pkce::random_token;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Name of the browser session cookie
pub const SESSION_COOKIE: &str = "lf_session";

/// Seconds before `expires_at` at which a session is already treated as expired
const EXPIRY_BUFFER_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Identity of a signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Identity service user id
    pub id: String,
    /// Email address, when the identity service returns one
    #[serde(default)]
    pub email: Option<String>,
}

/// Session issued by the identity service
///
/// # Examples
///
/// ```
/// use lesson_forge::auth::{AuthUser, Session};
///
/// let session = Session {
///     access_token: "jwt".to_string(),
///     refresh_token: None,
///     expires_at: None,
///     user: AuthUser { id: "u1".to_string(), email: None },
/// };
///
/// // A session with no expiry is never considered expired.
/// assert!(!session.is_expired());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for API calls
    pub access_token: String,
    /// Token used to renew the session
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// When the access token stops being accepted
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// The signed-in user
    pub user: AuthUser,
}

impl Session {
    /// Whether the access token is expired or about to expire
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the access token is expired or about to expire at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map(|at| at - Duration::seconds(EXPIRY_BUFFER_SECS) <= now)
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Per-browser state kept on the server
#[derive(Debug, Clone, Default)]
pub struct BrowserSession {
    /// Auth flow of this browser
    pub flow: AuthFlow,
    /// PKCE verifier of a pending federated sign-in
    pub pkce_verifier: Option<String>,
}

impl BrowserSession {
    /// The signed-in session, if it is still valid
    pub fn active_session(&self) -> Option<&Session> {
        self.flow.session().filter(|s| !s.is_expired())
    }
}

/// In-memory map from cookie id to browser state
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, BrowserSession>>>,
}

impl SessionStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores browser state under a fresh cookie id and returns the id
    pub async fn create(&self, state: BrowserSession) -> String {
        let id = random_token(24);
        self.inner.write().await.insert(id.clone(), state);
        id
    }

    /// Copy of the browser state for a cookie id
    pub async fn get(&self, id: &str) -> Option<BrowserSession> {
        self.inner.read().await.get(id).cloned()
    }

    /// Replaces the browser state for a cookie id
    pub async fn put(&self, id: &str, state: BrowserSession) {
        self.inner.write().await.insert(id.to_string(), state);
    }

    /// Forgets a cookie id
    pub async fn remove(&self, id: &str) -> Option<BrowserSession> {
        self.inner.write().await.remove(id)
    }

    /// The valid signed-in session for a cookie id
    pub async fn active_session(&self, id: &str) -> Option<Session> {
        self.inner
            .read()
            .await
            .get(id)
            .and_then(|b| b.active_session().cloned())
    }

    /// Drops browsers whose signed-in session has expired
    ///
    /// Returns the number of entries removed.
    pub async fn purge_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.len();
        inner.retain(|_, b| b.flow.session().map(|s| !s.is_expired()).unwrap_or(true));
        before - inner.len()
    }

    /// Number of tracked browsers
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether no browsers are tracked
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
