//! Offline provider used for local development and tests

use super::base::ContentProvider;
use crate::error::Result;
use async_trait::async_trait;

/// Provider that answers immediately without any network access
#[derive(Debug, Clone, Default)]
pub struct MockProvider;

impl MockProvider {
    /// Creates a new mock provider
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!("Mock provider answering {} byte prompt", prompt.len());
        Ok(format!("# Mock Content\nGenerated for: {}", prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_output_echoes_prompt() {
        let provider = MockProvider::new();
        let text = provider.generate("Colours for beginners").await.unwrap();
        assert_eq!(text, "# Mock Content\nGenerated for: Colours for beginners");
        assert_eq!(provider.name(), "mock");
    }
}
