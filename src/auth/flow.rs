//! Sign-in state machine
//!
//! Every browser walks the same small machine whether it signs in with a
//! password, registers, or goes through the federated redirect:
//!
//! ```text
//! Anonymous | Error --begin_sign_in-------> Authenticating
//! Anonymous | Error --begin_federated-----> AwaitingRedirect
//! AwaitingRedirect  --receive_callback----> Authenticating | Error
//! Authenticating    --succeed-------------> Authenticated
//! Authenticating    --fail----------------> Error
//! Authenticating    --confirmation_sent---> Anonymous (with notice)
//! Authenticated     --sign_out------------> Anonymous
//! ```
//!
//! Any other event returns `ForgeError::InvalidTransition` and leaves the
//! state untouched.

use super::session::Session;
use crate::error::{ForgeError, Result};

/// Message shown when a callback does not match the pending redirect
pub const STATE_MISMATCH_MESSAGE: &str = "Sign-in link is invalid or has expired. Please try again.";

/// Current state of a browser's sign-in
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Not signed in
    #[default]
    Anonymous,
    /// Credentials submitted, waiting for the identity service
    Authenticating,
    /// Sent to an external provider, waiting for the callback
    AwaitingRedirect {
        /// External provider name, e.g. `google`
        provider: String,
        /// Anti-forgery value the callback must echo
        state: String,
    },
    /// Signed in
    Authenticated(Session),
    /// Last attempt failed; the form stays editable
    Error(String),
}

impl AuthState {
    /// Stable name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Authenticating => "authenticating",
            Self::AwaitingRedirect { .. } => "awaiting_redirect",
            Self::Authenticated(_) => "authenticated",
            Self::Error(_) => "error",
        }
    }
}

/// Sign-in state plus the form values and notices shown alongside it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthFlow {
    state: AuthState,
    email: String,
    notice: Option<String>,
}

impl AuthFlow {
    /// Creates a flow in the `Anonymous` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Email entered on the last submission, kept for re-display
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Informational message, e.g. "check your email"
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// True only while the identity service is being asked
    pub fn is_loading(&self) -> bool {
        matches!(self.state, AuthState::Authenticating)
    }

    /// Error message of a failed attempt
    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            AuthState::Error(msg) => Some(msg),
            _ => None,
        }
    }

    /// Signed-in session
    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    fn reject(&self, event: &str) -> anyhow::Error {
        ForgeError::InvalidTransition {
            state: self.state.name().to_string(),
            event: event.to_string(),
        }
        .into()
    }

    fn can_start(&self) -> bool {
        matches!(self.state, AuthState::Anonymous | AuthState::Error(_))
    }

    /// Credentials were submitted
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::InvalidTransition` unless the flow is
    /// `Anonymous` or `Error`
    ///
    /// # Examples
    ///
    /// ```
    /// use lesson_forge::auth::AuthFlow;
    ///
    /// let mut flow = AuthFlow::new();
    /// flow.begin_sign_in("teacher@example.com").unwrap();
    /// assert!(flow.is_loading());
    /// assert!(flow.begin_sign_in("teacher@example.com").is_err());
    /// ```
    pub fn begin_sign_in(&mut self, email: &str) -> Result<()> {
        if !self.can_start() {
            return Err(self.reject("submit"));
        }
        self.email = email.trim().to_string();
        self.notice = None;
        self.state = AuthState::Authenticating;
        Ok(())
    }

    /// The user chose an external provider
    pub fn begin_federated(&mut self, provider: &str, state: &str) -> Result<()> {
        if !self.can_start() {
            return Err(self.reject("begin_federated"));
        }
        self.notice = None;
        self.state = AuthState::AwaitingRedirect {
            provider: provider.to_string(),
            state: state.to_string(),
        };
        Ok(())
    }

    /// The provider redirected back with `returned_state`
    ///
    /// # Returns
    ///
    /// `true` if the state matched and the code should now be exchanged
    /// (the flow is `Authenticating`); `false` if it did not match (the flow
    /// is `Error`)
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::InvalidTransition` unless the flow is
    /// `AwaitingRedirect`
    pub fn receive_callback(&mut self, returned_state: Option<&str>) -> Result<bool> {
        let expected = match &self.state {
            AuthState::AwaitingRedirect { state, .. } => state.clone(),
            _ => return Err(self.reject("callback")),
        };

        if returned_state == Some(expected.as_str()) {
            self.state = AuthState::Authenticating;
            Ok(true)
        } else {
            tracing::warn!("Auth callback state mismatch");
            self.state = AuthState::Error(STATE_MISMATCH_MESSAGE.to_string());
            Ok(false)
        }
    }

    /// The identity service accepted the credentials
    pub fn succeed(&mut self, session: Session) -> Result<()> {
        if !self.is_loading() {
            return Err(self.reject("success"));
        }
        tracing::info!(user_id = %session.user.id, "Signed in");
        self.state = AuthState::Authenticated(session);
        Ok(())
    }

    /// The identity service rejected the attempt
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        if !self.is_loading() {
            return Err(self.reject("failure"));
        }
        self.state = AuthState::Error(message.into());
        Ok(())
    }

    /// Registration succeeded but the email address must be confirmed first
    pub fn confirmation_sent(&mut self, notice: impl Into<String>) -> Result<()> {
        if !self.is_loading() {
            return Err(self.reject("confirmation_sent"));
        }
        self.notice = Some(notice.into());
        self.state = AuthState::Anonymous;
        Ok(())
    }

    /// Sign out
    pub fn sign_out(&mut self) -> Result<()> {
        if self.session().is_none() {
            return Err(self.reject("sign_out"));
        }
        self.state = AuthState::Anonymous;
        self.notice = None;
        Ok(())
    }
}
