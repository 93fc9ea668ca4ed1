//! Base provider trait and shared response helpers
//!
//! A content provider turns a fully formatted prompt into markdown-ish text
//! that the document renderers understand.

use crate::error::{ForgeError, Result};
use async_trait::async_trait;

/// Content provider trait
///
/// All content providers must implement this trait so the generation service
/// can call them without knowing which vendor sits behind them.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use lesson_forge::providers::ContentProvider;
/// use lesson_forge::error::Result;
///
/// struct Echo;
///
/// #[async_trait]
/// impl ContentProvider for Echo {
///     fn name(&self) -> &'static str {
///         "echo"
///     }
///
///     async fn generate(&self, prompt: &str) -> Result<String> {
///         Ok(prompt.to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Short provider name used in logs and metrics labels
    fn name(&self) -> &'static str;

    /// Generate content for a prompt
    ///
    /// # Arguments
    ///
    /// * `prompt` - Prompt text including formatting instructions
    ///
    /// # Returns
    ///
    /// Returns the generated text
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::Provider` if the upstream call fails or the
    /// response contains no text
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Reject blank provider output
///
/// Upstream APIs occasionally answer 200 with an empty candidate list or an
/// empty message; treat that the same as a failed call.
pub(crate) fn non_empty(provider: &str, text: Option<String>) -> Result<String> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ForgeError::Provider(format!("{} returned no content", provider)).into()),
    }
}

/// Build the shared HTTP client used by remote providers
pub(crate) fn http_client(timeout_seconds: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent(concat!("lesson-forge/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ForgeError::Provider(format!("Failed to create HTTP client: {}", e)).into())
}
