//! Authentication for Lesson Forge
//!
//! Sign-in goes through a hosted identity service. This module provides:
//!
//! - [`IdentityClient`]: password sign-in, registration, token verification,
//!   federated authorize URLs and PKCE code exchange
//! - [`AuthFlow`]: the per-browser sign-in state machine
//! - [`SessionStore`]: cookie id to browser state map kept by the server
//! - [`pkce`]: S256 verifier/challenge pairs and random tokens

pub mod client;
pub mod flow;
pub mod pkce;
pub mod session;

pub use client::{IdentityClient, SignUpOutcome, CONFIRMATION_NOTICE};
pub use flow::{AuthFlow, AuthState};
pub use session::{AuthUser, BrowserSession, Session, SessionStore, SESSION_COOKIE};

/// Extract the token from an `Authorization: Bearer <token>` header value
///
/// # Examples
///
/// ```
/// use lesson_forge::auth::bearer_token;
///
/// assert_eq!(bearer_token("Bearer abc"), Some("abc"));
/// assert_eq!(bearer_token("bearer abc "), Some("abc"));
/// assert_eq!(bearer_token("Basic abc"), None);
/// assert_eq!(bearer_token("Bearer "), None);
/// ```
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
